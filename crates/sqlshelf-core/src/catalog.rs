//! Read-only schema and row-count inspection of a single database file.
//!
//! Failures are scoped per table: a table that cannot be described or
//! counted carries a note and the remaining tables are still reported.

use crate::{CoreError, Result};
use rusqlite::{Connection, OpenFlags};
use sqlshelf_types::{ColumnSchema, DatabaseSummary, SchemaInfo, TableNote, TableSchema};
use std::path::Path;
use tracing::{debug, warn};

/// Extracts tables, columns and row counts from the SQLite catalog.
pub struct CatalogInspector;

impl CatalogInspector {
    /// Full schema of every table, with exact row counts.
    pub fn inspect(path: &Path) -> Result<SchemaInfo> {
        let conn = open_read_only(path)?;
        let names = table_names(&conn, path)?;
        let info = inspect_tables(&conn, names);
        debug!(
            target: "sqlshelf::catalog",
            "Inspected {:?}: {} table(s)", path, info.tables.len()
        );
        Ok(info)
    }

    /// Table count and total rows, for listings.
    pub fn summarize(path: &Path) -> Result<DatabaseSummary> {
        let conn = open_read_only(path)?;
        let names = table_names(&conn, path)?;

        let mut summary = DatabaseSummary {
            table_count: names.len(),
            ..DatabaseSummary::default()
        };
        for name in names {
            match count_rows(&conn, &name) {
                Ok(rows) => summary.total_rows += rows,
                Err(e) => {
                    warn!(target: "sqlshelf::catalog", "Counting {} in {:?} failed: {}", name, path, e);
                    summary.failed_tables.push(TableNote {
                        table: name,
                        message: e.to_string(),
                    });
                }
            }
        }
        Ok(summary)
    }
}

/// Open an existing database without write or create permission.
pub(crate) fn open_read_only(path: &Path) -> Result<Connection> {
    Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| open_error(path, e))
}

fn open_error(path: &Path, e: rusqlite::Error) -> CoreError {
    CoreError::Open {
        name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string()),
        message: e.to_string(),
    }
}

/// Tables in catalog order. This is the first read of the file, so a bad
/// header surfaces here as [`CoreError::Open`].
fn table_names(conn: &Connection, path: &Path) -> Result<Vec<String>> {
    let read = || -> rusqlite::Result<Vec<String>> {
        let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table'")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(names)
    };
    read().map_err(|e| open_error(path, e))
}

fn inspect_tables(conn: &Connection, names: Vec<String>) -> SchemaInfo {
    let tables = names
        .into_iter()
        .map(|name| {
            let mut errors = Vec::new();
            let columns = table_columns(conn, &name).unwrap_or_else(|e| {
                errors.push(e.to_string());
                Vec::new()
            });
            let row_count = match count_rows(conn, &name) {
                Ok(rows) => Some(rows),
                Err(e) => {
                    errors.push(e.to_string());
                    None
                }
            };
            if !errors.is_empty() {
                warn!(target: "sqlshelf::catalog", "Table {} partially inspected: {:?}", name, errors);
            }
            TableSchema {
                name,
                columns,
                row_count,
                error: (!errors.is_empty()).then(|| errors.join("; ")),
            }
        })
        .collect();
    SchemaInfo { tables }
}

fn table_columns(conn: &Connection, table: &str) -> rusqlite::Result<Vec<ColumnSchema>> {
    let mut stmt = conn.prepare("SELECT name, type FROM pragma_table_info(?1) ORDER BY cid")?;
    let columns = stmt
        .query_map([table], |row| {
            Ok(ColumnSchema {
                name: row.get(0)?,
                declared_type: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(columns)
}

fn count_rows(conn: &Connection, table: &str) -> rusqlite::Result<u64> {
    let sql = format!("SELECT COUNT(*) FROM {}", quote_identifier(table));
    let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
    Ok(count.max(0) as u64)
}

/// Quote an identifier for direct interpolation into SQL.
pub(crate) fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
