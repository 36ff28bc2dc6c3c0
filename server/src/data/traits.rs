//! Store trait for the query core
//!
//! The core never owns a connection. It is handed an already-initialized
//! `Arc<dyn FactStore>` and only executes built queries through it.

use async_trait::async_trait;

use super::error::StoreError;
use super::types::{BuiltQuery, ResultSet};

#[async_trait]
pub trait FactStore: Send + Sync {
    /// Execute a built query and return its column descriptors and raw rows.
    ///
    /// Dropping the returned future aborts the in-flight query.
    async fn query(&self, query: &BuiltQuery) -> Result<ResultSet, StoreError>;

    /// Single reachability probe
    async fn ping(&self) -> Result<(), StoreError>;

    /// Backend name for logs
    fn backend_name(&self) -> &'static str;
}
