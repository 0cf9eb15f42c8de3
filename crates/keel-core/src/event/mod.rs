pub mod dispatcher;
pub mod types;

use std::any::Any;
use std::fmt;

use crate::kernel::bootstrap::Application;
use crate::kernel::error::Result;

/// Handle returned when an observer is registered
pub type EventId = u64;

/// Whether dispatch moves on to the next observer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResult {
    Continue,
    /// Skip the remaining observers and listeners
    Stop,
}

/// Something the runtime announces to observers, keyed by name.
pub trait Event: Any + fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    fn as_any(&self) -> &dyn Any;
}

/// Observer signature for name-keyed handlers
pub type EventHandler = Box<dyn Fn(&dyn Event) -> EventResult + Send + Sync>;

/// A lifecycle listener with access to the running application.
///
/// Listeners are invoked after the dispatcher's observers, for every event
/// whose name appears in [`listen`](Listener::listen).
pub trait Listener: Send + Sync {
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Event names this listener reacts to
    fn listen(&self) -> Vec<&'static str>;

    fn process(&self, app: &mut Application, event: &dyn Event) -> Result<()>;
}

pub use dispatcher::{EventDispatcher, sync_typed_handler};
pub use types::{BootstrapEvent, BootstrapPhase, LocaleUpdated, SystemEvent, WorkerEvent};

#[cfg(test)]
mod tests;
