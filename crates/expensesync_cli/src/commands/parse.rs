//! Line parser for the interactive session.

use chrono::NaiveDate;
use thiserror::Error;

/// A parsed session command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    List,
    Add { amount: f64, category: String },
    Delete { id: String },
    Clear,
    Budget(f64),
    Notify(bool),
    Range(NaiveDate, NaiveDate),
    ClearRange,
    Categories,
    AddCategory(String),
    Online,
    Offline,
    Status,
    Help,
    Quit,
}

/// Errors from parsing a session line.
#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("unknown command '{0}' (try 'help')")]
    Unknown(String),

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("invalid number '{0}'")]
    Number(String),

    #[error("invalid date '{0}' (expected YYYY-MM-DD)")]
    Date(String),

    #[error("start date must not be after end date")]
    RangeOrder,
}

/// Parses one input line. Blank lines yield `Ok(None)`.
pub fn parse(line: &str) -> Result<Option<Command>, ParseError> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(None);
    };
    let rest: Vec<&str> = words.collect();

    let command = match (head.to_ascii_lowercase().as_str(), rest.as_slice()) {
        ("list" | "ls", []) => Command::List,
        ("add", [amount, category @ ..]) if !category.is_empty() => Command::Add {
            amount: number(amount)?,
            category: category.join(" "),
        },
        ("add", _) => return Err(ParseError::Usage("add <amount> <category...>")),
        ("delete" | "rm", [id]) => Command::Delete { id: id.to_string() },
        ("delete" | "rm", _) => return Err(ParseError::Usage("delete <id>")),
        ("clear", []) => Command::Clear,
        ("budget", [amount]) => Command::Budget(number(amount)?),
        ("budget", _) => return Err(ParseError::Usage("budget <amount>")),
        ("notify", ["on"]) => Command::Notify(true),
        ("notify", ["off"]) => Command::Notify(false),
        ("notify", _) => return Err(ParseError::Usage("notify on|off")),
        ("range", ["clear"]) => Command::ClearRange,
        ("range", [start, end]) => {
            let (start, end) = (date(start)?, date(end)?);
            if start > end {
                return Err(ParseError::RangeOrder);
            }
            Command::Range(start, end)
        }
        ("range", _) => {
            return Err(ParseError::Usage(
                "range <YYYY-MM-DD> <YYYY-MM-DD> | range clear",
            ))
        }
        ("categories", []) => Command::Categories,
        ("category", name) if !name.is_empty() => Command::AddCategory(name.join(" ")),
        ("category", _) => return Err(ParseError::Usage("category <name>")),
        ("online", []) => Command::Online,
        ("offline", []) => Command::Offline,
        ("status", []) => Command::Status,
        ("help" | "?", _) => Command::Help,
        ("quit" | "exit", _) => Command::Quit,
        _ => return Err(ParseError::Unknown(line.trim().to_string())),
    };
    Ok(Some(command))
}

fn number(raw: &str) -> Result<f64, ParseError> {
    raw.parse::<f64>()
        .map_err(|_| ParseError::Number(raw.to_string()))
}

fn date(raw: &str) -> Result<NaiveDate, ParseError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| ParseError::Date(raw.to_string()))
}
