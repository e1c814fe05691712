//! Validation and execution of ad-hoc read-only statements.

use crate::catalog::open_read_only;
use crate::{CoreError, Result, SessionRegistry};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, ErrorCode};
use sqlshelf_types::{CellValue, QueryResult, UserId, CELL_SEPARATOR};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// The only statement keyword accepted by the executor.
pub const READ_ONLY_KEYWORD: &str = "select";

/// Appended to a cell cut short by the output budget.
pub const CLIPPED_MARKER: &str = "...";

/// Bounds applied to every executed statement.
#[derive(Debug, Clone)]
pub struct QueryLimits {
    /// Wall-clock budget for executing and fetching.
    pub timeout: Duration,
    /// Rows rendered before the result is cut off.
    pub max_rows: usize,
    /// Rendered bytes (cells plus separators) before the result is cut off.
    pub max_output_bytes: usize,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            max_rows: 200,
            max_output_bytes: 3500,
        }
    }
}

/// Runs user statements against their selected database.
pub struct QueryExecutor {
    sessions: Arc<SessionRegistry>,
    limits: QueryLimits,
}

impl QueryExecutor {
    pub fn new(sessions: Arc<SessionRegistry>, limits: QueryLimits) -> Self {
        Self { sessions, limits }
    }

    /// Validate and run `raw` against the user's selected database.
    ///
    /// The statement is checked before the selection is consulted, so a
    /// non-read-only statement is rejected even when nothing is selected.
    pub async fn execute(&self, user: &UserId, raw: &str) -> Result<QueryResult> {
        let statement = validate_read_only(raw)?.to_string();
        let file = self.sessions.current(user)?;

        let conn = open_read_only(&file.path).map_err(|e| CoreError::Query(e.to_string()))?;
        let interrupt = conn.get_interrupt_handle();
        let limits = self.limits.clone();
        let deadline = Instant::now() + limits.timeout;

        debug!(target: "sqlshelf::query", "User {} querying {}: {}", user, file.name, statement);
        let started = Instant::now();
        let task = tokio::task::spawn_blocking(move || {
            run_statement(&conn, &statement, &limits, deadline)
        });

        match tokio::time::timeout(self.limits.timeout, task).await {
            Ok(Ok(result)) => {
                if let Ok(result) = &result {
                    info!(
                        target: "sqlshelf::query",
                        "User {} query on {} returned {} row(s) in {:?}",
                        user, file.name, result.rows.len(), started.elapsed()
                    );
                }
                result
            }
            Ok(Err(e)) => Err(CoreError::Query(format!("query task failed: {e}"))),
            Err(_) => {
                interrupt.interrupt();
                warn!(
                    target: "sqlshelf::query",
                    "User {} query on {} interrupted after {:?}", user, file.name, self.limits.timeout
                );
                Err(timed_out(self.limits.timeout))
            }
        }
    }
}

/// Accept only a single statement whose first keyword is `SELECT`.
///
/// This is a heuristic gate rather than a parser: the keyword is compared
/// case-insensitively after trimming, one trailing `;` is allowed, and any
/// further statement is rejected. Quoted text and comments are skipped while
/// looking for statement separators. Returns the statement without its
/// terminator.
pub fn validate_read_only(raw: &str) -> Result<&str> {
    let statement = raw.trim();
    let keyword_len = statement
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(statement.len());

    if !statement[..keyword_len].eq_ignore_ascii_case(READ_ONLY_KEYWORD) {
        return Err(CoreError::Rejected(
            "only SELECT statements are allowed".to_string(),
        ));
    }

    match find_terminator(statement) {
        None => Ok(statement),
        Some(end) if only_trailing_noise(&statement[end..]) => Ok(statement[..end].trim_end()),
        Some(_) => Err(CoreError::Rejected(
            "multiple statements are not allowed".to_string(),
        )),
    }
}

/// Byte offset of the first `;` outside quotes and comments.
fn find_terminator(sql: &str) -> Option<usize> {
    let bytes = sql.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' | b'"' | b'`' => i = skip_until(bytes, i + 1, bytes[i]),
            b'[' => i = skip_until(bytes, i + 1, b']'),
            b'-' if bytes.get(i + 1) == Some(&b'-') => i = skip_line_comment(bytes, i),
            b'/' if bytes.get(i + 1) == Some(&b'*') => i = skip_block_comment(bytes, i),
            b';' => return Some(i),
            _ => i += 1,
        }
    }
    None
}

/// Whether `rest` holds nothing but separators, whitespace and comments.
fn only_trailing_noise(rest: &str) -> bool {
    let bytes = rest.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b';' => i += 1,
            b if b.is_ascii_whitespace() => i += 1,
            b'-' if bytes.get(i + 1) == Some(&b'-') => i = skip_line_comment(bytes, i),
            b'/' if bytes.get(i + 1) == Some(&b'*') => i = skip_block_comment(bytes, i),
            _ => return false,
        }
    }
    true
}

/// Index just past the closing `close`; a doubled delimiter is an escape.
fn skip_until(bytes: &[u8], mut i: usize, close: u8) -> usize {
    while i < bytes.len() {
        if bytes[i] == close {
            if close != b']' && bytes.get(i + 1) == Some(&close) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    bytes.len()
}

fn skip_line_comment(bytes: &[u8], start: usize) -> usize {
    bytes[start..]
        .iter()
        .position(|&b| b == b'\n')
        .map_or(bytes.len(), |p| start + p + 1)
}

fn skip_block_comment(bytes: &[u8], start: usize) -> usize {
    bytes[start + 2..]
        .windows(2)
        .position(|w| w == b"*/")
        .map_or(bytes.len(), |p| start + 2 + p + 2)
}

fn run_statement(
    conn: &Connection,
    sql: &str,
    limits: &QueryLimits,
    deadline: Instant,
) -> Result<QueryResult> {
    // The blocking pool may start us after the budget is already spent
    if Instant::now() > deadline {
        return Err(timed_out(limits.timeout));
    }

    let mut stmt = conn.prepare(sql).map_err(|e| query_error(e, limits))?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let column_count = columns.len();

    let mut result = QueryResult {
        columns,
        rows: Vec::new(),
        truncated: false,
    };
    let mut rendered_bytes = 0;

    let mut rows = stmt.query([]).map_err(|e| query_error(e, limits))?;
    while let Some(row) = rows.next().map_err(|e| query_error(e, limits))? {
        if Instant::now() > deadline {
            return Err(timed_out(limits.timeout));
        }
        if result.rows.len() >= limits.max_rows {
            result.truncated = true;
            break;
        }

        let cells: Vec<String> = (0..column_count)
            .map(|i| cell_value(row.get_ref(i)).to_string())
            .collect();
        let row_bytes = cells.iter().map(String::len).sum::<usize>()
            + CELL_SEPARATOR.len() * column_count.saturating_sub(1);
        if rendered_bytes + row_bytes > limits.max_output_bytes {
            if result.rows.is_empty() {
                result.rows.push(clip_row(cells, limits.max_output_bytes));
            }
            result.truncated = true;
            break;
        }

        rendered_bytes += row_bytes;
        result.rows.push(cells);
    }

    Ok(result)
}

/// Shorten a row that alone exceeds `budget`, marking every cut cell.
fn clip_row(cells: Vec<String>, budget: usize) -> Vec<String> {
    let mut remaining = budget;
    let mut clipped = Vec::with_capacity(cells.len());
    for (i, cell) in cells.into_iter().enumerate() {
        if i > 0 {
            remaining = remaining.saturating_sub(CELL_SEPARATOR.len());
        }
        if cell.len() <= remaining {
            remaining -= cell.len();
            clipped.push(cell);
            continue;
        }
        let mut end = remaining;
        while !cell.is_char_boundary(end) {
            end -= 1;
        }
        remaining = 0;
        clipped.push(format!("{}{CLIPPED_MARKER}", &cell[..end]));
    }
    clipped
}

fn cell_value(value: rusqlite::Result<ValueRef<'_>>) -> CellValue {
    match value {
        Ok(ValueRef::Null) | Err(_) => CellValue::Null,
        Ok(ValueRef::Integer(n)) => CellValue::Integer(n),
        Ok(ValueRef::Real(x)) => CellValue::Real(x),
        Ok(ValueRef::Text(bytes)) => CellValue::Text(String::from_utf8_lossy(bytes).into_owned()),
        Ok(ValueRef::Blob(bytes)) => CellValue::Blob(bytes.len()),
    }
}

fn query_error(e: rusqlite::Error, limits: &QueryLimits) -> CoreError {
    if e.sqlite_error_code() == Some(ErrorCode::OperationInterrupted) {
        return timed_out(limits.timeout);
    }
    CoreError::Query(e.to_string())
}

fn timed_out(timeout: Duration) -> CoreError {
    CoreError::Query(format!("query timed out after {} ms", timeout.as_millis()))
}
