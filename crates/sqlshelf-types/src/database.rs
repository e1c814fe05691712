//! Stored database files and their derived schema views.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// File extensions accepted for uploads, compared case-insensitively.
pub const RECOGNIZED_EXTENSIONS: &[&str] = &["db", "sqlite"];

/// Whether `name` ends in one of [`RECOGNIZED_EXTENSIONS`].
pub fn has_recognized_extension(name: &str) -> bool {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => RECOGNIZED_EXTENSIONS
            .iter()
            .any(|known| known.eq_ignore_ascii_case(ext)),
        _ => false,
    }
}

/// An uploaded database file owned by a single user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseFile {
    /// File name exactly as uploaded.
    pub name: String,
    /// Absolute storage path.
    pub path: PathBuf,
    /// Size on disk in bytes.
    pub size: u64,
    /// Last modification time reported by the filesystem.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
}

impl DatabaseFile {
    /// Size in mebibytes, for human-facing listings.
    pub fn size_mb(&self) -> f64 {
        self.size as f64 / (1024.0 * 1024.0)
    }
}

/// A column as declared in the table schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    /// Declared type, empty when the column has none.
    pub declared_type: String,
}

/// One table of an inspected database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    /// Columns in declaration order. Empty when none could be discovered.
    pub columns: Vec<ColumnSchema>,
    /// Exact row count, absent when counting failed.
    pub row_count: Option<u64>,
    /// Engine error raised while describing or counting this table.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Derived, never cached view of a database's catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaInfo {
    pub tables: Vec<TableSchema>,
}

impl SchemaInfo {
    /// Apply exact-match table and column filters.
    ///
    /// A filter that matches nothing yields an empty view rather than an error.
    pub fn filtered(&self, table: Option<&str>, column: Option<&str>) -> SchemaInfo {
        let tables = self
            .tables
            .iter()
            .filter(|t| table.is_none_or(|wanted| t.name == wanted))
            .map(|t| TableSchema {
                columns: t
                    .columns
                    .iter()
                    .filter(|c| column.is_none_or(|wanted| c.name == wanted))
                    .cloned()
                    .collect(),
                ..t.clone()
            })
            .collect();
        SchemaInfo { tables }
    }

    pub fn table(&self, name: &str) -> Option<&TableSchema> {
        self.tables.iter().find(|t| t.name == name)
    }
}

/// A table-scoped failure captured during aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableNote {
    pub table: String,
    pub message: String,
}

/// Aggregate counts used by the listing report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSummary {
    pub table_count: usize,
    /// Sum of row counts over every table that could be counted.
    pub total_rows: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_tables: Vec<TableNote>,
}

/// One line of the `/list` report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseOverview {
    pub file: DatabaseFile,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<DatabaseSummary>,
    /// Set instead of `summary` when the file could not be opened.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One database section of the `/info` report.
///
/// Holds the whole catalog; table and column filters are applied when the
/// report is rendered so an empty catalog stays distinguishable from an
/// empty match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaReport {
    pub file: DatabaseFile,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
