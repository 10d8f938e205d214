//! Session command parsing and execution.

pub mod parse;
pub mod session;

pub use parse::{parse, Command, ParseError};
pub use session::{Flow, Session};

/// Usage text printed by `help`.
pub const HELP: &str = "\
Commands:
  list                          Show all expenses
  add <amount> <category...>    Add an expense
  delete <id>                   Delete an expense
  clear                         Delete all expenses
  budget <amount>               Set the budget
  notify on|off                 Enable or disable budget alerts
  range <YYYY-MM-DD> <YYYY-MM-DD>
                                Restrict totals and alerts to a date range
  range clear                   Remove the date range
  categories                    List categories
  category <name>               Add a custom category
  online | offline              Toggle simulated connectivity
  status                        Show totals, budget and last operation status
  help                          Show this text
  quit                          Exit";
