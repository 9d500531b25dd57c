use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid id {input:?}: {reason}")]
    InvalidId { input: String, reason: String },
}
