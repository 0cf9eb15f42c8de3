//! # Keel Core Kernel Errors
//!
//! Defines the error types surfaced by the Keel kernel.
//!
//! [`Error`] is the umbrella enum returned from every lifecycle operation. Each
//! subsystem keeps its own typed error ([`ContainerError`], [`ProviderSystemError`],
//! [`ConfigError`], [`ConsoleError`]) and converts into it through `#[from]`, so
//! provider hooks, bootstrappers and console commands can all use `?` against
//! the kernel [`Result`].
use std::path::PathBuf;
use std::result::Result as StdResult;

use thiserror::Error as ThisError;

use crate::config::error::ConfigError;
use crate::console::error::ConsoleError;
use crate::container::error::ContainerError;
use crate::provider_system::error::ProviderSystemError;

/// Custom error type for the Keel runtime
#[derive(Debug, ThisError)]
pub enum Error {
    /// Specific, typed provider system error
    #[error("Provider system error: {0}")]
    ProviderSystem(#[from] ProviderSystemError),

    /// Service container error (missing binding, type mismatch, poisoned lock)
    #[error("Container error: {0}")]
    Container(#[from] ContainerError),

    /// Configuration repository error
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Console application error
    #[error("Console error: {0}")]
    Console(#[from] ConsoleError),

    /// The installation itself is misconfigured (missing base path, unresolvable namespace).
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        path: Option<PathBuf>,
    },

    /// Error occurring during a specific kernel lifecycle phase.
    #[error("Kernel lifecycle error during {phase}: {message}")]
    KernelLifecycleError {
        phase: KernelLifecyclePhase,
        component_name: Option<String>,
        message: String,
        #[source]
        source: Option<Box<Error>>,
    },

    /// Raised through [`Application::abort`](crate::kernel::Application::abort).
    #[error("HTTP error {status}: {message}")]
    Http { status: u16, message: String },

    /// `abort(404)`
    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("I/O error during operation '{operation}' on path '{path}': {source}")]
    Io {
        #[source]
        source: std::io::Error,
        path: PathBuf,
        operation: String,
    },

    /// Generic error with message
    #[error("Error: {0}")]
    Other(String),
}

/// Represents a specific phase in the kernel's lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum KernelLifecyclePhase {
    #[error("Bootstrap")]
    Bootstrap,
    #[error("Register")]
    Register,
    #[error("Boot")]
    Boot,
    #[error("WorkerCycle")]
    WorkerCycle,
}

/// Shorthand for Result with our Error type
pub type Result<T> = StdResult<T, Error>;

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl Error {
    pub fn io(source: std::io::Error, operation: impl Into<String>, path: PathBuf) -> Self {
        Error::Io {
            source,
            operation: operation.into(),
            path,
        }
    }

    pub fn configuration(message: impl Into<String>, path: Option<PathBuf>) -> Self {
        Error::Configuration {
            message: message.into(),
            path,
        }
    }
}
