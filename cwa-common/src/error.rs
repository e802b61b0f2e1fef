//! Common error types for the annotator

use thiserror::Error;

/// Common result type for annotator operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the annotator crates
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}
