//! # Keel Core
//!
//! Process lifecycle core for Keel applications: the ordered bootstrap of a
//! long-lived process, the register/boot protocol for service providers, the
//! alias table in front of the service container, console command discovery
//! and the per-cycle environment/config reload used by worker processes.
pub mod config;
pub mod console;
pub mod container;
pub mod env;
pub mod event;
pub mod kernel;
pub mod provider_system;
pub mod providers;
pub mod utils;
pub mod worker;

pub use config::Repository;
pub use console::{Command, ConsoleApplication, Kernel as ConsoleKernel};
pub use container::Container;
pub use env::EnvRepository;
pub use event::{Event, EventDispatcher, Listener};
pub use kernel::Application;
pub use kernel::error::{Error, Result};
pub use provider_system::{BootProvider, ServiceProvider};
pub use providers::FoundationServiceProvider;
pub use worker::Worker;
