//! # Keel Core Worker
//!
//! A long-running loop that handles one unit of work per cycle. Every cycle is
//! framed by [`WorkerEvent::BeforeWorkerStart`] and
//! [`WorkerEvent::AfterWorkerCycle`]; listeners subscribed to the former (the
//! config reload listener among them) run before the cycle handler.
use std::time::Duration;

use log::{debug, info};

use crate::event::WorkerEvent;
use crate::kernel::bootstrap::Application;
use crate::kernel::error::{Error, KernelLifecyclePhase, Result};

/// Default pause between cycles
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// Shortest pause between cycles; shorter intervals are raised to it
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone)]
pub struct Worker {
    cycle: u64,
    interval: Duration,
    max_cycles: Option<u64>,
}

impl Default for Worker {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVAL)
    }
}

impl Worker {
    pub fn new(interval: Duration) -> Self {
        if interval < MIN_INTERVAL {
            debug!("Worker interval {:?} raised to {:?}", interval, MIN_INTERVAL);
        }
        Self {
            cycle: 0,
            interval: interval.max(MIN_INTERVAL),
            max_cycles: None,
        }
    }

    /// Stop after `cycles` cycles instead of running until cancelled
    pub fn with_max_cycles(mut self, cycles: u64) -> Self {
        self.max_cycles = Some(cycles);
        self
    }

    /// Cycles completed so far
    pub fn cycles(&self) -> u64 {
        self.cycle
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run one cycle: announce it, run `handler`, announce its end.
    pub fn run_cycle<F>(&mut self, app: &mut Application, handler: &mut F) -> Result<()>
    where
        F: FnMut(&mut Application, u64) -> Result<()>,
    {
        let cycle = self.cycle + 1;
        app.dispatch(&WorkerEvent::BeforeWorkerStart { cycle })?;

        handler(app, cycle).map_err(|e| Error::KernelLifecycleError {
            phase: KernelLifecyclePhase::WorkerCycle,
            component_name: None,
            message: format!("Worker cycle {} failed: {}", cycle, e),
            source: Some(Box::new(e)),
        })?;

        app.dispatch(&WorkerEvent::AfterWorkerCycle { cycle })?;
        self.cycle = cycle;
        debug!("Worker cycle {} complete", cycle);
        Ok(())
    }

    /// Run cycles on a fixed interval until the cycle limit is reached or the
    /// future is dropped. A failing cycle stops the loop.
    pub async fn run<F>(&mut self, app: &mut Application, mut handler: F) -> Result<()>
    where
        F: FnMut(&mut Application, u64) -> Result<()>,
    {
        info!("Worker started (interval {:?})", self.interval);
        let mut interval = tokio::time::interval(self.interval);
        loop {
            if self.max_cycles.is_some_and(|max| self.cycle >= max) {
                break;
            }
            interval.tick().await;
            self.run_cycle(app, &mut handler)?;
        }
        info!("Worker stopped after {} cycle(s)", self.cycle);
        Ok(())
    }
}
