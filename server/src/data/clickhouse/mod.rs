//! ClickHouse fact store
//!
//! Executes built queries over the ClickHouse HTTP interface and reads the
//! results back as `JSONCompactEachRowWithNamesAndTypes`, so column names and
//! types are known only once the query has run.

pub mod error;
pub mod format;

pub use error::ClickhouseError;

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use clickhouse::Client;
use clickhouse::query::Query;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use self::format::{CompactRowReader, RESULT_FORMAT};
use crate::core::config::ClickhouseConfig;
use crate::core::constants::HEALTH_CHECK_INTERVAL_SECS;
use crate::data::error::StoreError;
use crate::data::traits::FactStore;
use crate::data::types::{BuiltQuery, QueryArg, ResultSet};

/// Settings sent with every query.
///
/// Dropping the response stream stops the query on the server too, and
/// zone-less `DateTime` values are rendered in UTC whatever the server zone.
const SESSION_SETTINGS: [(&str, &str); 2] = [
    ("cancel_http_readonly_queries_on_client_close", "1"),
    ("session_timezone", "UTC"),
];

/// ClickHouse-backed [`FactStore`]
///
/// The crate's `Client` pools HTTP connections internally (keep-alive), so a
/// single service is shared by every request without extra locking.
pub struct ClickhouseService {
    client: Client,
}

impl ClickhouseService {
    /// Build the client from configuration. Does not contact the server.
    pub fn new(config: &ClickhouseConfig) -> Result<Self, ClickhouseError> {
        if config.url.trim().is_empty() {
            return Err(ClickhouseError::Connection(
                "ClickHouse URL must not be empty".to_string(),
            ));
        }

        let mut client = Client::default()
            .with_url(&config.url)
            .with_database(&config.database);

        if let Some(ref user) = config.user {
            client = client.with_user(user);
        }
        if let Some(ref password) = config.password {
            client = client.with_password(password);
        }
        if config.compression {
            client = client.with_compression(clickhouse::Compression::Lz4);
        }

        // Server-side cap; the client-side deadline lives in FactsService.
        client = client.with_option(
            "max_execution_time",
            config.max_execution_time_secs.to_string(),
        );
        for (name, value) in SESSION_SETTINGS {
            client = client.with_option(name, value);
        }

        tracing::debug!(
            url = %config.url,
            database = %config.database,
            compression = %config.compression,
            max_execution_time_secs = config.max_execution_time_secs,
            "ClickhouseService initialized"
        );

        Ok(Self { client })
    }

    /// Periodically ping the store and log failures until shutdown
    pub fn start_health_check_task(self: &Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_secs(HEALTH_CHECK_INTERVAL_SECS));
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => {
                        tracing::debug!("ClickHouse health check task shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        if let Err(e) = service.ping().await {
                            tracing::warn!("ClickHouse health check failed: {}", e);
                        }
                    }
                }
            }
        })
    }
}

/// Bind all arguments to a query in placeholder order
fn bind_args(mut query: Query, args: &[QueryArg]) -> Query {
    for arg in args {
        query = match arg {
            QueryArg::Text(s) => query.bind(s.as_str()),
            QueryArg::UInt(v) => query.bind(*v),
        };
    }
    query
}

#[async_trait]
impl FactStore for ClickhouseService {
    async fn query(&self, query: &BuiltQuery) -> Result<ResultSet, StoreError> {
        let started = Instant::now();
        let mut cursor =
            bind_args(self.client.query(&query.sql), &query.args).fetch_bytes(RESULT_FORMAT)?;

        let mut reader = CompactRowReader::new();
        while let Some(chunk) = cursor.next().await? {
            reader.push(&chunk)?;
        }
        let result = reader.finish()?;

        tracing::debug!(
            columns = result.columns.len(),
            rows = result.rows.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "ClickHouse query completed"
        );
        Ok(result)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.client
            .query("SELECT 1")
            .execute()
            .await
            .map_err(StoreError::from)
    }

    fn backend_name(&self) -> &'static str {
        "clickhouse"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: &str) -> ClickhouseConfig {
        ClickhouseConfig {
            url: url.to_string(),
            database: "default".to_string(),
            user: Some("default".to_string()),
            password: None,
            timeout_secs: 60,
            max_execution_time_secs: 60,
            compression: true,
        }
    }

    #[test]
    fn test_new_rejects_empty_url() {
        let err = ClickhouseService::new(&config("  ")).err().unwrap();
        assert!(matches!(err, ClickhouseError::Connection(_)));
    }

    #[test]
    fn test_new_does_not_connect() {
        let service = ClickhouseService::new(&config("http://127.0.0.1:1")).unwrap();
        assert_eq!(service.backend_name(), "clickhouse");
    }

    #[test]
    fn test_session_renders_datetimes_in_utc() {
        assert!(SESSION_SETTINGS.contains(&("session_timezone", "UTC")));
        assert!(SESSION_SETTINGS.contains(&("cancel_http_readonly_queries_on_client_close", "1")));
    }
}
