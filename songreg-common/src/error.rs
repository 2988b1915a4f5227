//! Common error types for the song registry

use thiserror::Error;

/// Common result type for song registry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the song registry crates
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
