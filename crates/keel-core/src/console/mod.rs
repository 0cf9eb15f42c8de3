//! # Keel Core Console
//!
//! The command line surface of an application. The [`Kernel`] bootstraps the
//! [`Application`](crate::kernel::Application), gathers command identities
//! from every discovery source and registers them on a [`ConsoleApplication`]
//! in a fixed order: framework commands first, then everything else. Because a
//! later command replaces an earlier one with the same name, application
//! commands override framework defaults.
//!
//! Commands are either types implementing [`Command`] (registered in the
//! [`TypeCatalog`](crate::kernel::catalog::TypeCatalog) or the compile-time
//! [`COMMANDS`] index) or closures defined from a signature string with
//! [`Kernel::command`].
pub mod application;
pub mod command;
pub mod commands;
pub mod error;
pub mod kernel;

pub use application::{ConsoleApplication, DEFAULT_COMMAND};
pub use command::{ClosureCommand, Command, CommandContext, Parameter, parse_signature};
pub use commands::{AboutCommand, COMMANDS, CommandEntry, ListCommand};
pub use error::ConsoleError;
pub use kernel::{Kernel, order_commands};

#[cfg(test)]
mod tests;
