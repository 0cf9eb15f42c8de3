use std::any::Any;

use crate::event::Event;

/// Whether a bootstrapper is about to run or has finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapPhase {
    Bootstrapping,
    Bootstrapped,
}

/// Emitted around every bootstrapper run by
/// [`Application::bootstrap_with`](crate::kernel::Application::bootstrap_with).
///
/// The event name embeds the bootstrapper, e.g. `bootstrapping: LoadEnvironmentVariables`,
/// so observers can subscribe to a single step.
#[derive(Debug, Clone)]
pub struct BootstrapEvent {
    pub phase: BootstrapPhase,
    pub bootstrapper: String,
    name: String,
}

impl BootstrapEvent {
    pub fn new(phase: BootstrapPhase, bootstrapper: &str) -> Self {
        Self {
            phase,
            bootstrapper: bootstrapper.to_string(),
            name: Self::event_name(phase, bootstrapper),
        }
    }

    pub fn event_name(phase: BootstrapPhase, bootstrapper: &str) -> String {
        match phase {
            BootstrapPhase::Bootstrapping => format!("bootstrapping: {}", bootstrapper),
            BootstrapPhase::Bootstrapped => format!("bootstrapped: {}", bootstrapper),
        }
    }
}

impl Event for BootstrapEvent {
    fn name(&self) -> &str {
        &self.name
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// The application locale changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleUpdated {
    pub locale: String,
}

impl LocaleUpdated {
    pub const NAME: &'static str = "locale.updated";
}

impl Event for LocaleUpdated {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Worker cycle boundaries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerEvent {
    BeforeWorkerStart { cycle: u64 },
    AfterWorkerCycle { cycle: u64 },
}

impl WorkerEvent {
    pub const BEFORE_WORKER_START: &'static str = "worker.before_start";
    pub const AFTER_WORKER_CYCLE: &'static str = "worker.after_cycle";
}

impl Event for WorkerEvent {
    fn name(&self) -> &str {
        match self {
            WorkerEvent::BeforeWorkerStart { .. } => Self::BEFORE_WORKER_START,
            WorkerEvent::AfterWorkerCycle { .. } => Self::AFTER_WORKER_CYCLE,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// System events triggered by the application runtime
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SystemEvent {
    /// A provider's register hook completed
    ProviderRegistered { provider: String },
    /// A provider's boot sequence completed
    ProviderBooted { provider: String },
    /// Every registered provider has been booted
    ApplicationBooted,
}

impl Event for SystemEvent {
    fn name(&self) -> &str {
        match self {
            SystemEvent::ProviderRegistered { .. } => "provider.registered",
            SystemEvent::ProviderBooted { .. } => "provider.booted",
            SystemEvent::ApplicationBooted => "application.booted",
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
