use thiserror::Error;

/// Errors raised while binding or resolving services
#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("No binding registered for '{id}'")]
    NotBound { id: String },

    #[error("Service '{id}' is not of the requested type '{expected}'")]
    TypeMismatch { id: String, expected: &'static str },

    #[error("'{name}' cannot be aliased to itself")]
    SelfAlias { name: String },

    #[error("Container lock poisoned while accessing {what}")]
    Poisoned { what: &'static str },
}
