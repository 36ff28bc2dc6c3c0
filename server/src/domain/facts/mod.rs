//! Analytics queries over the facts table
//!
//! - `request` - Client requests and whitelist validation
//! - `builder` - Parameterized SQL for raw, aggregate and time-series queries
//! - `dispatch` - Column type resolution and per-cell scan slots
//! - `materialize` - Ordered records from raw result sets
//! - `rows` - Fixed-shape rows for the raw and time-series queries
//! - `service` - Execution with cancellation and deadlines

pub mod builder;
pub mod dispatch;
pub mod materialize;
pub mod request;
pub mod rows;
pub mod service;

pub use dispatch::{ColumnKind, DecodeError, ScanSlot};
pub use materialize::{MaterializedRecord, Value};
pub use request::{
    GroupColumn, Metric, QueryRequest, RawQueryRequest, TimeseriesRequest, ValidationError,
};
pub use rows::{AggregateResult, FactRow, TimeseriesPoint};
pub use service::{FactsError, FactsService};
