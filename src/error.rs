//! Error taxonomy / 错误分类
//!
//! Every variant here is recoverable. The engines log them and degrade to an
//! empty or NotFound outcome; none of them reach the UI layer as a failure.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LookupError {
    /// Stored record could not be parsed; the record is dropped and treated as a miss
    #[error("corrupted cache record for key {key}: {reason}")]
    CacheCorruption { key: String, reason: String },

    /// Transport or protocol failure on one remote endpoint
    #[error("remote endpoint {endpoint} failed: {reason}")]
    RemoteFailure { endpoint: String, reason: String },

    /// Attempt exceeded its per-attempt budget
    #[error("remote endpoint {endpoint} timed out after {timeout_ms}ms")]
    Timeout { endpoint: String, timeout_ms: u64 },

    #[error("translation failed: {0}")]
    TranslationFailure(String),

    #[error("storage error: {0}")]
    Storage(String),

    /// Bundled dictionary dataset missing or malformed
    #[error("dataset error: {0}")]
    Dataset(String),

    #[error("empty or invalid query")]
    InvalidQuery,
}

impl From<sqlx::Error> for LookupError {
    fn from(e: sqlx::Error) -> Self {
        LookupError::Storage(e.to_string())
    }
}

impl From<std::io::Error> for LookupError {
    fn from(e: std::io::Error) -> Self {
        LookupError::Dataset(e.to_string())
    }
}

pub type LookupResult<T> = Result<T, LookupError>;
