//! Classification of inbound chat messages into user intents.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Arguments of `/info [index] [table] [column]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoArgs {
    /// 1-based database index; all databases when absent.
    pub index: Option<usize>,
    pub table: Option<String>,
    pub column: Option<String>,
}

/// A recognized user intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", content = "args", rename_all = "snake_case")]
pub enum Command {
    Start,
    Help,
    List,
    Info(InfoArgs),
    Clear,
    Select,
    /// A bare number, answering a selection prompt.
    SelectIndex(String),
    /// Text that looks like a read-only query.
    Query(String),
    /// Anything else, including unknown slash commands.
    Unknown(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Invalid database index: {0}")]
    InvalidIndex(String),
}

impl Command {
    /// Classify a message text.
    ///
    /// Slash commands may carry a `@botname` suffix. All-digit text is a
    /// selection answer; text starting with `select` (any case) is a query.
    pub fn parse(text: &str) -> Result<Command, CommandError> {
        let trimmed = text.trim();

        if let Some(rest) = trimmed.strip_prefix('/') {
            let mut parts = rest.split_whitespace();
            let head = parts.next().unwrap_or_default();
            let name = head.split('@').next().unwrap_or_default().to_lowercase();
            let args: Vec<&str> = parts.collect();

            return Ok(match name.as_str() {
                "start" => Command::Start,
                "help" => Command::Help,
                "list" => Command::List,
                "clear" => Command::Clear,
                "select" => Command::Select,
                "info" => Command::Info(parse_info_args(&args)?),
                _ => Command::Unknown(trimmed.to_string()),
            });
        }

        if !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Ok(Command::SelectIndex(trimmed.to_string()));
        }

        if trimmed.to_lowercase().starts_with("select") {
            return Ok(Command::Query(text.to_string()));
        }

        Ok(Command::Unknown(trimmed.to_string()))
    }
}

fn parse_info_args(args: &[&str]) -> Result<InfoArgs, CommandError> {
    let index = match args.first() {
        Some(raw) => Some(
            raw.parse::<usize>()
                .map_err(|_| CommandError::InvalidIndex(raw.to_string()))?,
        ),
        None => None,
    };

    Ok(InfoArgs {
        index,
        table: args.get(1).map(|s| s.to_string()),
        column: args.get(2).map(|s| s.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_slash_commands() {
        assert_eq!(Command::parse("/start").unwrap(), Command::Start);
        assert_eq!(Command::parse("/help").unwrap(), Command::Help);
        assert_eq!(Command::parse("/list@shelf_bot").unwrap(), Command::List);
        assert_eq!(Command::parse("  /CLEAR ").unwrap(), Command::Clear);
        assert_eq!(Command::parse("/select").unwrap(), Command::Select);
        assert_eq!(
            Command::parse("/drop").unwrap(),
            Command::Unknown("/drop".to_string())
        );
    }

    #[test]
    fn test_parse_info_args() {
        assert_eq!(
            Command::parse("/info").unwrap(),
            Command::Info(InfoArgs::default())
        );
        assert_eq!(
            Command::parse("/info 1 orders id").unwrap(),
            Command::Info(InfoArgs {
                index: Some(1),
                table: Some("orders".into()),
                column: Some("id".into()),
            })
        );
        assert_eq!(
            Command::parse("/info first"),
            Err(CommandError::InvalidIndex("first".into()))
        );
    }

    #[test]
    fn test_parse_index_and_query() {
        assert_eq!(
            Command::parse(" 2 ").unwrap(),
            Command::SelectIndex("2".into())
        );
        assert_eq!(
            Command::parse("SELECT 1").unwrap(),
            Command::Query("SELECT 1".into())
        );
        assert_eq!(
            Command::parse("  select * from t").unwrap(),
            Command::Query("  select * from t".into())
        );
        assert_eq!(
            Command::parse("delete from t").unwrap(),
            Command::Unknown("delete from t".into())
        );
    }
}
