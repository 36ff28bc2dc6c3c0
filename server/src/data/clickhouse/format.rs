//! Incremental decoder for the `JSONCompactEachRowWithNamesAndTypes` format
//!
//! The stream is newline-delimited JSON arrays: the first line holds column
//! names, the second the ClickHouse type names, then one array per row. This
//! is what lets the core learn the result shape at execution time.

use super::error::ClickhouseError;
use crate::data::types::{ColumnTypeDescriptor, ResultSet};

/// Output format requested from ClickHouse for every core query
pub const RESULT_FORMAT: &str = "JSONCompactEachRowWithNamesAndTypes";

#[derive(Debug, Default)]
pub struct CompactRowReader {
    pending: Vec<u8>,
    names: Option<Vec<String>>,
    columns: Option<Vec<ColumnTypeDescriptor>>,
    rows: Vec<Vec<serde_json::Value>>,
}

impl CompactRowReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next chunk of the response body. Chunks may split lines anywhere.
    pub fn push(&mut self, chunk: &[u8]) -> Result<(), ClickhouseError> {
        self.pending.extend_from_slice(chunk);
        let buf = std::mem::take(&mut self.pending);

        let mut start = 0;
        while let Some(pos) = buf[start..].iter().position(|&b| b == b'\n') {
            let end = start + pos;
            self.accept_line(&buf[start..end])?;
            start = end + 1;
        }
        self.pending = buf[start..].to_vec();
        Ok(())
    }

    /// Consume the reader once the body is exhausted
    pub fn finish(mut self) -> Result<ResultSet, ClickhouseError> {
        let rest = std::mem::take(&mut self.pending);
        self.accept_line(&rest)?;

        match (self.names, self.columns) {
            (None, _) => Ok(ResultSet::default()),
            (Some(_), None) => Err(ClickhouseError::Format(
                "missing column types header".to_string(),
            )),
            (Some(_), Some(columns)) => Ok(ResultSet {
                columns,
                rows: self.rows,
            }),
        }
    }

    fn accept_line(&mut self, line: &[u8]) -> Result<(), ClickhouseError> {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if line.iter().all(u8::is_ascii_whitespace) {
            return Ok(());
        }

        if self.names.is_none() {
            let names: Vec<String> = serde_json::from_slice(line)
                .map_err(|e| ClickhouseError::Format(format!("invalid names header: {}", e)))?;
            self.names = Some(names);
            return Ok(());
        }

        if self.columns.is_none() {
            let types: Vec<String> = serde_json::from_slice(line)
                .map_err(|e| ClickhouseError::Format(format!("invalid types header: {}", e)))?;
            let names = self.names.as_deref().unwrap_or_default();
            if names.len() != types.len() {
                return Err(ClickhouseError::Format(format!(
                    "{} column names but {} column types",
                    names.len(),
                    types.len()
                )));
            }
            let columns = names
                .iter()
                .zip(types)
                .map(|(name, type_name)| ColumnTypeDescriptor::new(name.clone(), type_name))
                .collect();
            self.columns = Some(columns);
            return Ok(());
        }

        let row: Vec<serde_json::Value> = serde_json::from_slice(line).map_err(|e| {
            ClickhouseError::Format(format!("invalid row {}: {}", self.rows.len() + 1, e))
        })?;
        self.rows.push(row);
        Ok(())
    }
}
