use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or writing configuration and environment values
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {format} config file '{path}': {message}")]
    Parse {
        path: PathBuf,
        format: &'static str,
        message: String,
    },

    #[error("Failed to load environment file '{path}': {message}")]
    Dotenv { path: PathBuf, message: String },

    #[error("Failed to serialize value for config key '{key}': {message}")]
    Serialize { key: String, message: String },

    #[error("Config lock poisoned while accessing {what}")]
    Poisoned { what: &'static str },
}
