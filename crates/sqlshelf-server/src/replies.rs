//! Human-readable reply texts for every command and error kind.

use sqlshelf_core::CoreError;
use sqlshelf_types::{DatabaseFile, DatabaseOverview, QueryResult, Reply, SchemaReport};

pub const COMMANDS: &str = "\
/start - show this message
/help - list available commands
/list - show uploaded databases with table and row counts
/info [index] [table] [column] - describe tables and columns
/select - choose the database to query
/clear - delete all uploaded databases
Upload a .db or .sqlite file to add a database.
Send a SELECT statement to query the selected database.";

pub fn welcome() -> Reply {
    Reply::ok(format!(
        "Hi! I keep your SQLite databases and run read-only queries against them. Available commands:\n\n{COMMANDS}"
    ))
}

pub fn help() -> Reply {
    Reply::ok(format!("Available commands:\n\n{COMMANDS}"))
}

pub fn unknown() -> Reply {
    Reply::error(
        "unknown_command",
        "Unrecognized message. Send /help for the list of commands.",
    )
}

pub fn saved(file: &DatabaseFile) -> Reply {
    Reply::ok(format!("Database '{}' saved.", file.name))
}

pub fn cleared() -> Reply {
    Reply::ok("All databases have been removed.")
}

pub fn selection_prompt(files: &[DatabaseFile]) -> Reply {
    let mut lines = vec!["Choose the database to query:".to_string()];
    lines.extend(numbered(files));
    lines.push("Reply with the file number.".to_string());
    Reply::ok(lines.join("\n"))
}

pub fn selected(file: &DatabaseFile) -> Reply {
    Reply::ok(format!(
        "Selected database: {}. You can now send a SELECT statement.",
        file.name
    ))
}

pub fn listing(overview: &[DatabaseOverview]) -> Reply {
    let mut lines = vec![format!("Databases available: {}", overview.len()), String::new()];

    for entry in overview {
        lines.push(format!(
            "Database: {} (Size: {:.2} MB)",
            entry.file.name,
            entry.file.size_mb()
        ));
        match (&entry.summary, &entry.error) {
            (Some(summary), _) if summary.table_count == 0 => {
                lines.push("  No tables in this database.".to_string());
            }
            (Some(summary), _) => {
                lines.push(format!("  Tables: {}", summary.table_count));
                lines.push(format!("  Total rows: {}", summary.total_rows));
                for note in &summary.failed_tables {
                    lines.push(format!("  Could not count {}: {}", note.table, note.message));
                }
            }
            (None, Some(error)) => {
                lines.push(format!("Error accessing database {}: {}", entry.file.name, error));
            }
            (None, None) => {}
        }
        lines.push(String::new());
    }

    Reply::ok(trim_trailing(lines))
}

/// Render `/info`, applying the table and column filters as it goes.
///
/// The "no tables" and "schema not found" notes describe the catalog itself,
/// so a filter that matches nothing just prints less.
pub fn schema(reports: &[SchemaReport], table: Option<&str>, column: Option<&str>) -> Reply {
    let mut lines = Vec::new();

    for report in reports {
        lines.push(format!("Database: {}", report.file.name));
        let Some(schema) = &report.schema else {
            if let Some(error) = &report.error {
                lines.push(format!("Error accessing database {}: {}", report.file.name, error));
            }
            continue;
        };

        if schema.tables.is_empty() {
            lines.push("  No tables in this database.".to_string());
            continue;
        }
        for shown in schema.filtered(table, column).tables {
            lines.push(format!("  Table: {}", shown.name));
            if let Some(error) = &shown.error {
                lines.push(format!("    Error: {}", error));
            }
            if schema.table(&shown.name).is_some_and(|t| t.columns.is_empty()) {
                lines.push("    Table schema not found.".to_string());
            }
            for col in &shown.columns {
                lines.push(format!("    {} {}", col.name, col.declared_type).trim_end().to_string());
            }
            lines.push(String::new());
        }
    }

    Reply::ok(trim_trailing(lines))
}

pub fn query_result(result: &QueryResult) -> Reply {
    if result.is_empty() {
        if result.truncated {
            return Reply::ok("The query returned rows, but none fit in a reply.");
        }
        return Reply::ok("The query ran but returned no rows.");
    }

    let mut lines = vec!["Result:".to_string()];
    lines.extend(result.lines());
    if result.truncated {
        lines.push(format!("(output truncated after {} rows)", result.rows.len()));
    }
    Reply::ok(lines.join("\n"))
}

/// One sentence per error kind.
pub fn error(err: &CoreError) -> Reply {
    let text = match err {
        CoreError::Duplicate(name) => {
            format!("File '{name}' already exists. Rename it or upload a different file.")
        }
        CoreError::InvalidFileName { .. } => {
            "Please send a file with a .sqlite or .db extension.".to_string()
        }
        CoreError::UploadTooLarge { limit } => format!(
            "The file is too large; the limit is {:.2} MB.",
            *limit as f64 / (1024.0 * 1024.0)
        ),
        CoreError::Io(_) => "Something went wrong while accessing storage. Try again later.".to_string(),
        CoreError::Open { name, message } => {
            format!("Error accessing database {name}: {message}")
        }
        CoreError::NotSelected => {
            "No database selected. Use /select to choose one.".to_string()
        }
        CoreError::InvalidIndex { .. } => "Invalid database number. Try again.".to_string(),
        CoreError::Empty => "You have no uploaded databases.".to_string(),
        CoreError::Rejected(reason) => format!("Query rejected: {reason}."),
        CoreError::Query(message) => format!("Query failed: {message}"),
    };
    Reply::error(err.kind(), text)
}

fn numbered(files: &[DatabaseFile]) -> impl Iterator<Item = String> + '_ {
    files
        .iter()
        .enumerate()
        .map(|(i, file)| format!("{}. {}", i + 1, file.name))
}

fn trim_trailing(mut lines: Vec<String>) -> String {
    while lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlshelf_types::{
        ColumnSchema, DatabaseSummary, SchemaInfo, TableNote, TableSchema,
    };
    use std::path::PathBuf;

    fn file(name: &str, size: u64) -> DatabaseFile {
        DatabaseFile {
            name: name.to_string(),
            path: PathBuf::from("/tmp").join(name),
            size,
            modified_at: None,
        }
    }

    #[test]
    fn test_help_lists_every_command() {
        let text = help().text;
        for command in ["/start", "/help", "/list", "/info", "/select", "/clear"] {
            assert!(text.contains(command), "missing {command}");
        }
        assert!(welcome().text.ends_with(COMMANDS));
    }

    #[test]
    fn test_listing_report() {
        let overview = vec![
            DatabaseOverview {
                file: file("shop.db", 1024 * 1024 * 3 / 2),
                summary: Some(DatabaseSummary {
                    table_count: 2,
                    total_rows: 7,
                    failed_tables: vec![TableNote {
                        table: "broken".into(),
                        message: "no such module: fts9".into(),
                    }],
                }),
                error: None,
            },
            DatabaseOverview {
                file: file("empty.sqlite", 0),
                summary: Some(DatabaseSummary::default()),
                error: None,
            },
            DatabaseOverview {
                file: file("junk.db", 10),
                summary: None,
                error: Some("file is not a database".into()),
            },
        ];

        let text = listing(&overview).text;

        assert!(text.starts_with("Databases available: 3\n"));
        assert!(text.contains("Database: shop.db (Size: 1.50 MB)\n  Tables: 2\n  Total rows: 7"));
        assert!(text.contains("  Could not count broken: no such module: fts9"));
        assert!(text.contains("Database: empty.sqlite (Size: 0.00 MB)\n  No tables in this database."));
        assert!(text.ends_with("Error accessing database junk.db: file is not a database"));
    }

    #[test]
    fn test_schema_report() {
        let reports = vec![SchemaReport {
            file: file("shop.db", 0),
            schema: Some(SchemaInfo {
                tables: vec![
                    TableSchema {
                        name: "orders".into(),
                        columns: vec![
                            ColumnSchema { name: "id".into(), declared_type: "INTEGER".into() },
                            ColumnSchema { name: "note".into(), declared_type: String::new() },
                        ],
                        row_count: Some(3),
                        error: None,
                    },
                    TableSchema {
                        name: "ghost".into(),
                        columns: vec![],
                        row_count: None,
                        error: Some("no such table: ghost".into()),
                    },
                ],
            }),
            error: None,
        }];

        let text = schema(&reports, None, None).text;

        assert_eq!(
            text,
            "Database: shop.db\n  Table: orders\n    id INTEGER\n    note\n\n  Table: ghost\n    Error: no such table: ghost\n    Table schema not found."
        );
    }

    fn shop_report() -> SchemaReport {
        SchemaReport {
            file: file("shop.db", 0),
            schema: Some(SchemaInfo {
                tables: vec![TableSchema {
                    name: "orders".into(),
                    columns: vec![
                        ColumnSchema { name: "id".into(), declared_type: "INTEGER".into() },
                        ColumnSchema { name: "item".into(), declared_type: "TEXT".into() },
                    ],
                    row_count: Some(3),
                    error: None,
                }],
            }),
            error: None,
        }
    }

    #[test]
    fn test_schema_filters_that_match_nothing_print_nothing() {
        let reports = vec![shop_report()];

        assert_eq!(schema(&reports, Some("nope"), None).text, "Database: shop.db");
        assert_eq!(
            schema(&reports, Some("orders"), Some("zz")).text,
            "Database: shop.db\n  Table: orders"
        );
        assert_eq!(
            schema(&reports, Some("orders"), Some("item")).text,
            "Database: shop.db\n  Table: orders\n    item TEXT"
        );
    }

    #[test]
    fn test_schema_empty_catalog_note_survives_filters() {
        let reports = vec![SchemaReport {
            file: file("blank.db", 0),
            schema: Some(SchemaInfo::default()),
            error: None,
        }];

        assert_eq!(
            schema(&reports, Some("orders"), None).text,
            "Database: blank.db\n  No tables in this database."
        );
    }

    #[test]
    fn test_query_result_lines() {
        let result = QueryResult {
            columns: vec!["id".into(), "item".into()],
            rows: vec![vec!["1".into(), "lamp".into()], vec!["2".into(), "NULL".into()]],
            truncated: true,
        };

        let reply = query_result(&result);

        assert!(reply.ok);
        assert_eq!(reply.text, "Result:\n1 | lamp\n2 | NULL\n(output truncated after 2 rows)");
        assert_eq!(
            query_result(&QueryResult::default()).text,
            "The query ran but returned no rows."
        );

        let nothing_fit = QueryResult {
            truncated: true,
            ..QueryResult::default()
        };
        assert_eq!(
            query_result(&nothing_fit).text,
            "The query returned rows, but none fit in a reply."
        );
    }

    #[test]
    fn test_error_replies_carry_kind() {
        let reply = error(&CoreError::NotSelected);
        assert!(!reply.ok);
        assert_eq!(reply.kind, "not_selected");
        assert!(reply.text.contains("/select"));

        let reply = error(&CoreError::Duplicate("shop.db".into()));
        assert_eq!(reply.kind, "duplicate");
        assert!(reply.text.contains("'shop.db' already exists"));
    }

    #[test]
    fn test_selection_prompt_is_numbered() {
        let text = selection_prompt(&[file("a.db", 0), file("b.sqlite", 0)]).text;
        assert_eq!(
            text,
            "Choose the database to query:\n1. a.db\n2. b.sqlite\nReply with the file number."
        );
    }
}
