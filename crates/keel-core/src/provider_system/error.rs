//! # Keel Core Provider System Errors
//!
//! [`ProviderSystemError`] covers failures of the provider registry itself:
//! identities that cannot be resolved to a provider and unreadable package
//! manifests. Failures raised *inside* a provider's `register` or `boot` hook
//! are not wrapped here; they propagate unchanged to the bootstrap caller.
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ProviderSystemError {
    #[error("Unknown service provider '{identity}'")]
    UnknownProvider { identity: String },

    #[error("'{identity}' is registered in the type catalog but is not a service provider")]
    NotAProvider { identity: String },

    #[error("Package manifest error for '{path}': {message}")]
    ManifestError {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}
