//! Unified error type for store operations

use thiserror::Error;

/// Failure while executing a query against the analytical store.
///
/// The `Display` text of `Database` is the store's own message, unmodified.
#[derive(Error, Debug)]
pub enum StoreError {
    /// ClickHouse reported an error or was unreachable
    #[error("{0}")]
    Database(#[from] clickhouse::error::Error),

    /// The store answered with something that is not a valid result stream
    #[error("Malformed response from {backend}: {message}")]
    Protocol {
        backend: &'static str,
        message: String,
    },

    /// Connection or client setup failure
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query exceeded its deadline
    #[error("Query timeout after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// Caller cancelled the query (shutdown or disconnect)
    #[error("Query cancelled")]
    Cancelled,
}

impl StoreError {
    pub fn protocol(backend: &'static str, message: impl Into<String>) -> Self {
        Self::Protocol {
            backend,
            message: message.into(),
        }
    }

    pub fn timeout(timeout_secs: u64) -> Self {
        Self::Timeout { timeout_secs }
    }

    /// Whether the failure came from the caller giving up rather than the store
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Timeout { .. })
    }
}

/// Convert from the backend-specific ClickhouseError type
impl From<crate::data::clickhouse::ClickhouseError> for StoreError {
    fn from(e: crate::data::clickhouse::ClickhouseError) -> Self {
        match e {
            crate::data::clickhouse::ClickhouseError::Database(e) => Self::Database(e),
            crate::data::clickhouse::ClickhouseError::Format(message) => {
                Self::protocol("clickhouse", message)
            }
            crate::data::clickhouse::ClickhouseError::Connection(msg) => Self::Connection(msg),
        }
    }
}
