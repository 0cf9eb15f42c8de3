use thiserror::Error;

/// Errors raised by the console layer
#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("Command \"{name}\" is not defined")]
    CommandNotFound { name: String },

    #[error("Invalid command signature '{signature}': {message}")]
    InvalidSignature { signature: String, message: String },

    #[error("Failed to write command output: {0}")]
    Output(#[from] std::io::Error),
}
