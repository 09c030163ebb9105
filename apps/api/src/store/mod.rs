//! Analysis Record Store — append-only persistence keyed by a generated id.
//!
//! `save` never overwrites and `get` never fabricates: an unknown id is
//! `StoreError::NotFound`, not an empty record. There is no update or delete.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::analysis::{AnalysisRecord, NewAnalysisRecord};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryAnalysisStore;
pub use postgres::PgAnalysisStore;

/// Fresh identifiers to try before giving up on a save.
pub(crate) const MAX_ID_ATTEMPTS: u32 = 3;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("could not encode analysis: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("could not allocate a unique file id after {0} attempts")]
    IdExhausted(u32),
}

/// 128-bit random identifier rendered as text.
pub fn generate_file_id() -> String {
    Uuid::new_v4().to_string()
}

#[async_trait]
pub trait AnalysisStore: Send + Sync {
    /// Persists the record under a freshly generated id and returns that id.
    async fn save(&self, record: NewAnalysisRecord) -> Result<String, StoreError>;

    /// Exact-match lookup.
    async fn get(&self, file_id: &str) -> Result<AnalysisRecord, StoreError>;
}
