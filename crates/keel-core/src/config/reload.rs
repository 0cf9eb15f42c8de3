use std::sync::{Arc, Mutex};

use log::{debug, info, warn};
use serde_json::Value;

use crate::config::{AfterSettingCallback, ConfigError, Repository};
use crate::container::{Container, Service};
use crate::event::{Event, Listener, WorkerEvent};
use crate::kernel::bootstrap::Application;
use crate::kernel::constants::CONFIG;
use crate::kernel::error::Result;

/// Configuration writes made by application code since the worker started.
///
/// Keys keep the position of their first write and the value of their last.
#[derive(Debug, Default)]
pub struct MutationLog {
    entries: Vec<(String, Value)>,
    replaying: bool,
    captures: usize,
}

impl MutationLog {
    pub fn record(&mut self, entries: &[(String, Value)]) {
        self.captures += 1;
        for (key, value) in entries {
            match self.entries.iter_mut().find(|(k, _)| k == key) {
                Some(slot) => slot.1 = value.clone(),
                None => self.entries.push((key.clone(), value.clone())),
            }
        }
    }

    pub fn entries(&self) -> &[(String, Value)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of times the capture callback accepted a write
    pub fn captures(&self) -> usize {
        self.captures
    }

    pub fn is_replaying(&self) -> bool {
        self.replaying
    }
}

/// Re-reads `.env` and rebuilds the configuration at the start of every worker
/// cycle, replaying runtime overrides on top of the fresh values.
#[derive(Debug, Default)]
pub struct ReloadDotenvAndConfig {
    log: Arc<Mutex<MutationLog>>,
}

impl ReloadDotenvAndConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wire the listener into `app`.
    ///
    /// Nothing is resolved here: the configuration may not be loadable until
    /// the environment bootstrapper has run. Every configuration instance built
    /// afterwards gets the capture callback and the replayed log; an instance
    /// that is already cached gets the capture callback now.
    pub fn install(app: &mut Application) -> Result<Arc<Self>> {
        let listener = Arc::new(Self::new());

        if app.container().is_resolved(CONFIG) {
            app.config()?
                .after_setting_callback(capture(listener.log.clone()))?;
        }

        let log = listener.log.clone();
        app.container_mut().after_resolving(
            CONFIG,
            Arc::new(move |service: &Service, _: &Container| {
                let Some(config) = service.downcast_ref::<Repository>() else {
                    return Ok(());
                };
                config.after_setting_callback(capture(log.clone()))?;
                replay(&log, config)
            }),
        );

        app.add_listener(listener.clone());
        debug!("Config reload listener installed");
        Ok(listener)
    }

    pub fn mutation_log(&self) -> Arc<Mutex<MutationLog>> {
        self.log.clone()
    }

    fn reload_dotenv(&self, app: &Application) -> Result<()> {
        let base_path = app.base_path("");
        if !base_path.exists() {
            return Ok(());
        }
        app.env().reload(&[base_path])?;
        Ok(())
    }

    fn reload_config(&self, app: &Application) -> Result<()> {
        app.container().forget_instance(CONFIG)?;
        Ok(())
    }
}

impl Listener for ReloadDotenvAndConfig {
    fn listen(&self) -> Vec<&'static str> {
        vec![WorkerEvent::BEFORE_WORKER_START]
    }

    fn process(&self, app: &mut Application, event: &dyn Event) -> Result<()> {
        if let Some(WorkerEvent::BeforeWorkerStart { cycle }) =
            event.as_any().downcast_ref::<WorkerEvent>()
        {
            info!("Reloading environment and config before cycle {}", cycle);
        }
        self.reload_dotenv(app)?;
        self.reload_config(app)
    }
}

fn capture(log: Arc<Mutex<MutationLog>>) -> AfterSettingCallback {
    Arc::new(move |entries: &[(String, Value)]| match log.lock() {
        Ok(mut log) if !log.replaying => log.record(entries),
        Ok(_) => {}
        Err(_) => warn!("Config mutation log poisoned; write not captured"),
    })
}

fn replay(log: &Mutex<MutationLog>, config: &Repository) -> Result<()> {
    let entries = {
        let mut guard = log
            .lock()
            .map_err(|_| ConfigError::Poisoned { what: "mutation log" })?;
        if guard.replaying {
            return Ok(());
        }
        guard.replaying = true;
        guard.entries.clone()
    };

    debug!("Replaying {} config override(s)", entries.len());
    let result = if entries.is_empty() {
        Ok(())
    } else {
        config.set_many(entries)
    };

    if let Ok(mut guard) = log.lock() {
        guard.replaying = false;
    }
    result
}
