//! Column-oriented row batches handed to bulk-transfer sinks.

use std::time::Duration;

use crate::identifiers::TableName;
use crate::types::SemanticType;
use crate::value::Value;

/// One destination column in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchColumn {
    pub name: String,
    pub semantic_type: SemanticType,
    pub nullable: bool,
}

/// An ordered set of rows sharing one column list.
///
/// Every row has exactly one value per column, in column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnBatch {
    columns: Vec<BatchColumn>,
    rows: Vec<Vec<Value>>,
}

impl ColumnBatch {
    /// Create an empty batch with the given columns.
    #[must_use]
    pub fn new(columns: Vec<BatchColumn>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Create an empty batch with room for `rows` rows.
    #[must_use]
    pub fn with_capacity(columns: Vec<BatchColumn>, rows: usize) -> Self {
        Self {
            columns,
            rows: Vec::with_capacity(rows),
        }
    }

    /// Append a row.
    ///
    /// # Panics
    ///
    /// Panics if the row width does not match the column count.
    pub fn push_row(&mut self, row: Vec<Value>) {
        assert_eq!(
            row.len(),
            self.columns.len(),
            "row width does not match column count"
        );
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[BatchColumn] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Remove all rows, keeping the column list.
    pub fn clear(&mut self) {
        self.rows.clear();
    }
}

/// A single bulk-transfer call: one batch into one table.
#[derive(Debug, Clone, Copy)]
pub struct BulkRequest<'a> {
    pub table: &'a TableName,
    pub batch: &'a ColumnBatch,
    /// Rows per transfer round trip the sink should aim for.
    pub batch_size: usize,
    /// Upper bound for this transfer; zero means no limit.
    pub timeout: Duration,
    /// Send rows as they are produced instead of buffering the whole batch.
    pub streaming: bool,
}
