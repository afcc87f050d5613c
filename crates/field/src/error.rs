//! Field errors.

use crate::checkpoint::CheckpointToken;

#[derive(Debug, thiserror::Error)]
pub enum FieldError {
    #[error("zone radius must be positive and finite, got {0}")]
    InvalidRadius(f64),

    #[error("duplicate checkpoint token: {0}")]
    DuplicateToken(CheckpointToken),
}

pub type Result<T> = std::result::Result<T, FieldError>;
