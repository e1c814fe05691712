//! Query results in their transport-facing textual form.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Marker rendered for SQL NULL.
pub const NULL_MARKER: &str = "NULL";

/// Separator placed between values of a rendered row.
pub const CELL_SEPARATOR: &str = " | ";

/// A single value fetched from the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    /// Blob contents are not rendered, only their length.
    Blob(usize),
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => f.write_str(NULL_MARKER),
            CellValue::Integer(n) => write!(f, "{n}"),
            // Keep a fractional part on integral reals so 3.0 stays distinct from 3
            CellValue::Real(x) if x.is_finite() && x.fract() == 0.0 => write!(f, "{x:.1}"),
            CellValue::Real(x) => write!(f, "{x}"),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Blob(len) => write!(f, "<blob {len} bytes>"),
        }
    }
}

/// Rows returned by a read-only statement, already stringified.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Set when the row or byte cap stopped rendering early.
    pub truncated: bool,
}

impl QueryResult {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// One line per row, values joined by [`CELL_SEPARATOR`].
    pub fn lines(&self) -> impl Iterator<Item = String> + '_ {
        self.rows.iter().map(|row| row.join(CELL_SEPARATOR))
    }
}
