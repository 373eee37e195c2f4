//! Typed row extraction from delimited text files
//!
//! Streams a CSV file one record at a time, coercing each field to its
//! column's declared type. Empty fields in typed columns become a typed
//! NULL sentinel, never a zero/false default; empty text fields stay empty
//! string literals. The first record supplies column names unless the
//! configuration already provides them, and also drives generation of the
//! CREATE TABLE statement for the run.

use bulkload_common::{LoadError, Result};
use csv::StringRecord;
use std::fs::File;
use std::path::Path;
use tracing::debug;

/// How often extraction progress is logged, in records
pub const PROGRESS_LOG_INTERVAL: u64 = 100_000;

/// Declared column type, reduced to its coercion behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// Any declared type containing "INT"
    Integer,
    /// DOUBLE or FLOAT
    Double,
    /// BOOL or BOOLEAN
    Bool,
    /// Everything else passes through as a quoted string literal
    Text,
}

impl ColumnType {
    /// Map a declared SQL type string to its coercion behavior
    pub fn from_declared(declared: &str) -> Self {
        let upper = declared.trim().to_ascii_uppercase();
        if upper.contains("INT") {
            ColumnType::Integer
        } else if upper == "DOUBLE" || upper == "FLOAT" {
            ColumnType::Double
        } else if upper == "BOOL" || upper == "BOOLEAN" {
            ColumnType::Bool
        } else {
            ColumnType::Text
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Double => "DOUBLE",
            ColumnType::Bool => "BOOL",
            ColumnType::Text => "TEXT",
        }
    }
}

/// A typed scalar value, one per column position
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Double(f64),
    Bool(bool),
    Text(String),
    /// Typed NULL sentinel for an absent/empty input field
    Null,
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Append this value as a SQL literal. NULL renders unquoted; text is
    /// single-quoted with embedded quotes doubled.
    pub fn write_sql(&self, out: &mut String) {
        match self {
            Value::Integer(v) => out.push_str(&v.to_string()),
            Value::Double(v) => out.push_str(&v.to_string()),
            Value::Bool(true) => out.push_str("TRUE"),
            Value::Bool(false) => out.push_str("FALSE"),
            Value::Text(s) => {
                out.push('\'');
                for c in s.chars() {
                    if c == '\'' {
                        out.push('\'');
                    }
                    out.push(c);
                }
                out.push('\'');
            },
            Value::Null => out.push_str("NULL"),
        }
    }
}

/// A fixed-arity ordered tuple of typed values, positionally aligned with
/// the column schema
#[derive(Debug, Clone, PartialEq)]
pub struct Row(pub Vec<Value>);

impl Row {
    /// Render as a parenthesized, comma-joined SQL literal tuple
    pub fn to_sql_tuple(&self) -> String {
        let mut out = String::with_capacity(self.0.len() * 8);
        out.push('(');
        for (i, value) in self.0.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            value.write_sql(&mut out);
        }
        out.push(')');
        out
    }
}

/// Coerce one raw field to its column's declared type.
///
/// Empty input in a typed (integer, double, bool) column is the typed NULL
/// sentinel, never a zero/false default; empty text stays an empty string
/// literal. Returns None when a non-empty field cannot be parsed as the
/// declared type; non-finite doubles (NaN, infinities) have no SQL literal
/// and are rejected too.
pub fn coerce_field(raw: &str, column_type: ColumnType) -> Option<Value> {
    if raw.is_empty() && column_type != ColumnType::Text {
        return Some(Value::Null);
    }
    match column_type {
        ColumnType::Integer => raw.parse::<i64>().ok().map(Value::Integer),
        ColumnType::Double => raw
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Value::Double),
        ColumnType::Bool => parse_bool_token(raw).map(Value::Bool),
        ColumnType::Text => Some(Value::Text(raw.to_string())),
    }
}

/// Recognized boolean token set. Anything outside it is a coercion error
/// rather than silently truthy.
fn parse_bool_token(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "yes" => Some(true),
        "false" | "f" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// Ordered column typing shared by every input file in a run
#[derive(Debug, Clone)]
pub struct ColumnSchema {
    names: Option<Vec<String>>,
    declared: Vec<String>,
    types: Vec<ColumnType>,
}

impl ColumnSchema {
    /// Build a schema from declared type strings and optional configured
    /// column names (which must match the type list in arity)
    pub fn new(names: Option<Vec<String>>, declared: Vec<String>) -> Result<Self> {
        if declared.is_empty() {
            return Err(LoadError::config("column type list must not be empty"));
        }
        if let Some(ref names) = names {
            if names.len() != declared.len() {
                return Err(LoadError::config(format!(
                    "{} column names for {} column types",
                    names.len(),
                    declared.len()
                )));
            }
        }
        let types = declared
            .iter()
            .map(|d| ColumnType::from_declared(d))
            .collect();
        Ok(Self {
            names,
            declared,
            types,
        })
    }

    pub fn arity(&self) -> usize {
        self.types.len()
    }

    pub fn declared(&self) -> &[String] {
        &self.declared
    }

    pub fn types(&self) -> &[ColumnType] {
        &self.types
    }

    /// Column names supplied by configuration, if any
    pub fn configured_names(&self) -> Option<&[String]> {
        self.names.as_deref()
    }
}

/// One-pass streaming reader yielding typed rows from a CSV file.
///
/// Not restartable; open the file again to rescan. When the schema carries
/// no configured names, the first record is consumed as the header and never
/// emitted as data.
pub struct RowReader {
    reader: csv::Reader<File>,
    schema: ColumnSchema,
    column_names: Vec<String>,
    file: String,
    record: StringRecord,
    rows_read: u64,
}

impl RowReader {
    /// Open a file for extraction under the given schema
    pub fn open(path: impl AsRef<Path>, schema: &ColumnSchema) -> Result<Self> {
        let path = path.as_ref();
        let file = path.display().to_string();
        let has_header = schema.configured_names().is_none();

        // flexible: arity is checked here so mismatches carry file/record
        // context instead of surfacing as a csv-level error
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(has_header)
            .flexible(true)
            .from_path(path)?;

        let column_names: Vec<String> = match schema.configured_names() {
            Some(names) => names.to_vec(),
            None => reader.headers()?.iter().map(str::to_string).collect(),
        };

        if column_names.len() != schema.arity() {
            return Err(LoadError::SchemaMismatch {
                file,
                record: 0,
                expected: schema.arity(),
                actual: column_names.len(),
            });
        }

        Ok(Self {
            reader,
            schema: schema.clone(),
            column_names,
            file,
            record: StringRecord::new(),
            rows_read: 0,
        })
    }

    /// Column names in schema order (from the header or configuration)
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Records yielded so far
    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }

    fn coerce_record(&self) -> Result<Row> {
        if self.record.len() != self.schema.arity() {
            return Err(LoadError::SchemaMismatch {
                file: self.file.clone(),
                record: self.rows_read,
                expected: self.schema.arity(),
                actual: self.record.len(),
            });
        }

        let mut values = Vec::with_capacity(self.schema.arity());
        for (i, raw) in self.record.iter().enumerate() {
            let column_type = self.schema.types()[i];
            match coerce_field(raw, column_type) {
                Some(value) => values.push(value),
                None => {
                    return Err(LoadError::Coercion {
                        file: self.file.clone(),
                        record: self.rows_read,
                        column: self.column_names[i].clone(),
                        column_type: column_type.name().to_string(),
                        value: raw.to_string(),
                    })
                },
            }
        }
        Ok(Row(values))
    }
}

impl Iterator for RowReader {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.reader.read_record(&mut self.record) {
            Ok(false) => None,
            Err(e) => Some(Err(e.into())),
            Ok(true) => {
                self.rows_read += 1;
                if self.rows_read % PROGRESS_LOG_INTERVAL == 0 {
                    debug!(file = %self.file, rows = self.rows_read, "Extraction progress");
                }
                Some(self.coerce_record())
            },
        }
    }
}

/// Generate the CREATE TABLE statement for a run from the column names,
/// declared types, and primary key
pub fn create_table_statement(
    schema_name: &str,
    table_name: &str,
    column_names: &[String],
    declared_types: &[String],
    primary_key: &str,
) -> String {
    let columns = column_names
        .iter()
        .zip(declared_types)
        .map(|(name, declared)| format!("{} {}", name, declared))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "CREATE TABLE IF NOT EXISTS `{}`.`{}` ({}, PRIMARY KEY ({}));",
        schema_name, table_name, columns, primary_key
    )
}
