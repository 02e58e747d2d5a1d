use std::time::Duration;

use async_trait::async_trait;

use crate::walk_record::WalkRecord;

pub type StoredId = i64;

/// Failure to hand a record over to storage. Fatal for the attempt only.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PersistError {
    #[error("storage did not answer within {0:?}")]
    Timeout(Duration),
    #[error("record could not be encoded: {0}")]
    Encoding(String),
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// The single write boundary for finished walks.
///
/// Implementations bound their own call time and report an elapsed bound as
/// [`PersistError::Timeout`]. They never retry on their own.
#[async_trait]
pub trait WalkRecordsStore: Send + Sync {
    async fn create(&self, record: &WalkRecord) -> Result<StoredId, PersistError>;
}
