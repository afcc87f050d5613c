//! Game error taxonomy.
//!
//! Everything here is recovered locally by the session: public
//! operations translate these into outcome enums or warning events
//! rather than letting them escape to presentation.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GameError {
    #[error("inventory full ({len}/{capacity})")]
    CapacityExceeded { len: usize, capacity: usize },

    #[error("inventory is empty")]
    EmptyInventory,

    #[error("persistence failure: {0}")]
    Persistence(String),

    #[error("sync failure: {0}")]
    Sync(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Field(#[from] spook_hunt_field::FieldError),
}

impl From<rusqlite::Error> for GameError {
    fn from(err: rusqlite::Error) -> Self {
        GameError::Persistence(err.to_string())
    }
}

impl From<serde_json::Error> for GameError {
    fn from(err: serde_json::Error) -> Self {
        GameError::Persistence(err.to_string())
    }
}

impl From<reqwest::Error> for GameError {
    fn from(err: reqwest::Error) -> Self {
        GameError::Sync(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GameError>;
