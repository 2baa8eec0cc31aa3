use thiserror::Error;

use homequote_core::stores::StoreError;

pub mod lead;
pub mod memory;
pub mod session;

pub use lead::SqlLeadStore;
pub use memory::{InMemoryLeadStore, InMemoryServiceCatalog, InMemorySessionStore};
pub use session::SqlSessionStore;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<serde_json::Error> for RepositoryError {
    fn from(value: serde_json::Error) -> Self {
        Self::Decode(value.to_string())
    }
}

impl From<RepositoryError> for StoreError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Database(error) => Self::Backend(error.to_string()),
            RepositoryError::Decode(message) => Self::Decode(message),
        }
    }
}
