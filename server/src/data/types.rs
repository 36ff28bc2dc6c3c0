//! Types shared between the query core and store backends

/// A bound argument for a `?` placeholder in [`BuiltQuery::sql`].
///
/// All client-controlled values travel as one of these, never as SQL text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryArg {
    Text(String),
    UInt(u64),
}

/// Query text with positional placeholders plus its ordered arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltQuery {
    pub sql: String,
    pub args: Vec<QueryArg>,
}

/// A result column as reported by the store for one execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnTypeDescriptor {
    pub name: String,
    /// Type name exactly as the store reported it, e.g. `LowCardinality(String)`
    pub type_name: String,
}

impl ColumnTypeDescriptor {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// Raw result of one query execution.
///
/// Cells are the store's wire values, not yet decoded. Every row has one cell
/// per entry in `columns`, in the same order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<ColumnTypeDescriptor>,
    pub rows: Vec<Vec<serde_json::Value>>,
}
