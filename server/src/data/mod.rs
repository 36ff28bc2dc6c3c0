//! Data storage layer
//!
//! - `clickhouse` - ClickHouse implementation of [`FactStore`]
//! - `traits` - Store trait consumed by the query core
//! - `types` - Built queries and raw result sets
//! - `error` - Store error type

pub mod clickhouse;
pub mod error;
pub mod traits;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use clickhouse::ClickhouseService;
pub use error::StoreError;
pub use traits::FactStore;
pub use types::{BuiltQuery, ColumnTypeDescriptor, QueryArg, ResultSet};
