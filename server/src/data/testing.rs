//! In-memory store fake for unit and router tests

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::error::StoreError;
use super::traits::FactStore;
use super::types::{BuiltQuery, ColumnTypeDescriptor, ResultSet};

/// Returns a canned result (or error) and records every query it receives
pub(crate) struct FakeStore {
    response: Mutex<Option<Result<ResultSet, String>>>,
    delay: Option<Duration>,
    healthy: bool,
    calls: AtomicUsize,
    last_query: Mutex<Option<BuiltQuery>>,
}

impl FakeStore {
    pub(crate) fn with_result(columns: &[(&str, &str)], rows: Vec<Vec<serde_json::Value>>) -> Self {
        let result = ResultSet {
            columns: columns
                .iter()
                .map(|(name, ty)| ColumnTypeDescriptor::new(*name, *ty))
                .collect(),
            rows,
        };
        Self {
            response: Mutex::new(Some(Ok(result))),
            delay: None,
            healthy: true,
            calls: AtomicUsize::new(0),
            last_query: Mutex::new(None),
        }
    }

    pub(crate) fn empty() -> Self {
        Self::with_result(&[], Vec::new())
    }

    /// Fails every query with a connection error carrying `message`
    pub(crate) fn failing(message: &str) -> Self {
        let store = Self::empty();
        *store.response.lock().unwrap() = Some(Err(message.to_string()));
        Self {
            healthy: false,
            ..store
        }
    }

    /// Holds every query open for `delay` before answering
    pub(crate) fn slow(self, delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..self
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn last_query(&self) -> Option<BuiltQuery> {
        self.last_query.lock().unwrap().clone()
    }
}

#[async_trait]
impl FactStore for FakeStore {
    async fn query(&self, query: &BuiltQuery) -> Result<ResultSet, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_query.lock().unwrap() = Some(query.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let response = self.response.lock().unwrap().clone();
        match response {
            Some(Ok(result)) => Ok(result),
            Some(Err(message)) => Err(StoreError::Connection(message)),
            None => Ok(ResultSet::default()),
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        if self.healthy {
            Ok(())
        } else {
            Err(StoreError::Connection("connection refused".to_string()))
        }
    }

    fn backend_name(&self) -> &'static str {
        "fake"
    }
}
