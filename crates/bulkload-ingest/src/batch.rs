//! Byte-bounded batching of rows into REPLACE statements
//!
//! Pure data transformation: rows in, statement strings out. REPLACE
//! semantics (insert-or-overwrite by primary key) keep retried statements
//! idempotent. The size threshold is advisory and measured in serialized
//! characters; callers size it with headroom against the endpoint's real
//! byte limit.

use crate::extract::Row;

/// Accumulates rendered rows into statements no longer than a threshold.
///
/// A statement is flushed before appending a row that would push it over
/// the threshold, so only a single row whose rendered literal alone exceeds
/// the threshold can produce an oversized statement.
pub struct StatementBatcher {
    prefix: String,
    threshold: usize,
    buffer: String,
    rows_in_buffer: usize,
    statements: Vec<String>,
}

impl StatementBatcher {
    /// Create a batcher targeting `schema`.`table` with the given flush
    /// threshold in bytes
    pub fn new(schema: &str, table: &str, threshold: usize) -> Self {
        Self {
            prefix: format!("REPLACE INTO `{}`.`{}` VALUES ", schema, table),
            threshold,
            buffer: String::new(),
            rows_in_buffer: 0,
            statements: Vec::new(),
        }
    }

    /// Append one row, flushing the current statement first if the row
    /// would push it past the threshold
    pub fn push(&mut self, row: &Row) {
        let tuple = row.to_sql_tuple();

        if self.rows_in_buffer > 0 {
            // +1 comma separator, +1 closing semicolon
            let projected = self.buffer.len() + 1 + tuple.len() + 1;
            if projected > self.threshold {
                self.flush();
            }
        }

        if self.rows_in_buffer == 0 {
            self.buffer.push_str(&self.prefix);
        } else {
            self.buffer.push(',');
        }
        self.buffer.push_str(&tuple);
        self.rows_in_buffer += 1;
    }

    /// Close off the current statement, if any, and add it to the output
    fn flush(&mut self) {
        if self.rows_in_buffer == 0 {
            return;
        }
        self.buffer.push(';');
        self.statements.push(std::mem::take(&mut self.buffer));
        self.rows_in_buffer = 0;
    }

    /// Finish batching, emitting any unflushed rows as a final statement
    pub fn finish(mut self) -> Vec<String> {
        self.flush();
        self.statements
    }
}

/// Batch a slice of rows into statements under the given threshold
pub fn batch_rows(rows: &[Row], schema: &str, table: &str, threshold: usize) -> Vec<String> {
    let mut batcher = StatementBatcher::new(schema, table, threshold);
    for row in rows {
        batcher.push(row);
    }
    batcher.finish()
}
