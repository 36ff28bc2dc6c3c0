//! ClickHouse error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClickhouseError {
    #[error("Database error: {0}")]
    Database(#[from] clickhouse::error::Error),

    #[error("Invalid result stream: {0}")]
    Format(String),

    #[error("Connection error: {0}")]
    Connection(String),
}
