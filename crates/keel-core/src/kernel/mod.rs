//! # Keel Core Kernel
//!
//! The `kernel` module is the composition root of a Keel process.
//!
//! ## Key Responsibilities & Components:
//!
//! - **Application Runtime**: [`Application`](bootstrap::Application) owns the
//!   base path, the service container, the provider registry and the event
//!   dispatcher, and drives the register/boot state machine.
//! - **Bootstrapper Pipeline**: the [`Bootstrapper`](bootstrappers::Bootstrapper)
//!   steps run once per process by `bootstrap_with`, in the fixed order given by
//!   [`standard_bootstrappers`](bootstrappers::standard_bootstrappers).
//! - **Type Catalog**: [`TypeCatalog`](catalog::TypeCatalog) resolves provider and
//!   command identities named in manifests, config and scanned directories.
//! - **Core Constants**: identifiers and file names in `constants`.
//! - **Error Handling**: [`Error`](error::Error) and the kernel `Result` alias.
pub mod bootstrap;
pub mod bootstrappers;
pub mod catalog;
pub mod constants;
pub mod error;
pub mod translator;

pub use bootstrap::{AppCallback, Application};
pub use bootstrappers::{
    BootProviders, Bootstrapper, LoadEnvironmentVariables, RegisterAliases, RegisterProviders,
    standard_bootstrappers,
};
pub use catalog::{TypeCatalog, TypeEntry, TypeKind};
pub use error::{Error, KernelLifecyclePhase, Result};
pub use translator::Translator;

// Test module declaration
#[cfg(test)]
mod tests;
