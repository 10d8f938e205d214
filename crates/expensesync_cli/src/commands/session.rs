//! Executes parsed commands against a running engine.

use super::{Command, HELP};
use expensesync_engine::store::{InMemoryRemoteStore, SettingsStore};
use expensesync_engine::{DateRange, EngineError, ExpenseEngine, StaticConnectivity};
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

/// How long a mutation waits for the store to echo the change back before
/// totals are recomputed anyway.
const ECHO_TIMEOUT: Duration = Duration::from_millis(500);

/// Whether the session should keep reading input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Read the next line.
    Continue,
    /// Stop the session.
    Quit,
}

/// An interactive session over one engine.
pub struct Session<K: SettingsStore + 'static, W: Write> {
    engine: Arc<ExpenseEngine<InMemoryRemoteStore, K>>,
    connectivity: Arc<StaticConnectivity>,
    out: W,
}

impl<K: SettingsStore + 'static, W: Write> Session<K, W> {
    /// Creates a session writing its output to `out`.
    pub fn new(
        engine: Arc<ExpenseEngine<InMemoryRemoteStore, K>>,
        connectivity: Arc<StaticConnectivity>,
        out: W,
    ) -> Self {
        Self {
            engine,
            connectivity,
            out,
        }
    }

    /// Consumes the session, returning its output sink.
    pub fn into_output(self) -> W {
        self.out
    }

    /// Runs one command.
    pub async fn execute(&mut self, command: Command) -> io::Result<Flow> {
        let online = self.engine.is_online();
        match command {
            Command::List => self.list()?,
            Command::Add { amount, category } => {
                let mut echo = self.engine.subscribe_expenses();
                echo.borrow_and_update();
                match self.engine.add_expense(amount, &category, online).await {
                    Ok(expense) => {
                        wait_for_echo(&mut echo).await;
                        writeln!(
                            self.out,
                            "added {} ({:.2} {})",
                            expense.id, amount, expense.category
                        )?;
                        self.engine.recalculate();
                    }
                    Err(e) => self.report(&e)?,
                }
            }
            Command::Delete { id } => {
                let mut echo = self.engine.subscribe_expenses();
                echo.borrow_and_update();
                match self.engine.delete_expense(&id, online).await {
                    Ok(()) => {
                        wait_for_echo(&mut echo).await;
                        writeln!(self.out, "deleted {id}")?;
                        self.engine.recalculate();
                    }
                    Err(e) => self.report(&e)?,
                }
            }
            Command::Clear => {
                let mut echo = self.engine.subscribe_expenses();
                echo.borrow_and_update();
                match self.engine.clear_all_expenses(online).await {
                    Ok(0) => writeln!(self.out, "nothing to clear")?,
                    Ok(count) => {
                        wait_for_echo(&mut echo).await;
                        writeln!(self.out, "cleared {count} expenses")?;
                        self.engine.recalculate();
                    }
                    Err(e) => self.report(&e)?,
                }
            }
            Command::Budget(amount) => {
                if self.engine.update_budget(amount) {
                    writeln!(self.out, "budget set to {amount:.2}")?;
                } else {
                    writeln!(self.out, "error: budget must be a positive number")?;
                }
            }
            Command::Notify(enabled) => {
                self.engine.toggle_notifications(enabled);
                let state = if enabled { "enabled" } else { "disabled" };
                writeln!(self.out, "budget alerts {state}")?;
            }
            Command::Range(start, end) => {
                let range = DateRange::new(start, end);
                let total = self.engine.total_for(range.as_ref());
                self.engine
                    .update_total_expenses_for_notifications(total, Some(start), Some(end));
                writeln!(self.out, "range {start} to {end}: total {total:.2}")?;
            }
            Command::ClearRange => {
                let total = self.engine.total_for(None);
                self.engine
                    .update_total_expenses_for_notifications(total, None, None);
                writeln!(self.out, "range cleared: total {total:.2}")?;
            }
            Command::Categories => {
                writeln!(self.out, "{}", self.engine.categories().join(", "))?;
            }
            Command::AddCategory(name) => {
                if self.engine.add_category(&name) {
                    writeln!(self.out, "added category {}", name.trim())?;
                } else {
                    writeln!(self.out, "category not added")?;
                }
            }
            Command::Online => {
                self.connectivity.set_online(true);
                writeln!(self.out, "online")?;
            }
            Command::Offline => {
                self.connectivity.set_online(false);
                writeln!(self.out, "offline")?;
            }
            Command::Status => self.status()?,
            Command::Help => writeln!(self.out, "{HELP}")?,
            Command::Quit => return Ok(Flow::Quit),
        }
        self.out.flush()?;
        Ok(Flow::Continue)
    }

    /// Prints the status message the engine recorded, falling back to the error.
    fn report(&mut self, err: &EngineError) -> io::Result<()> {
        match self.engine.error_message() {
            Some(message) => writeln!(self.out, "error: {message}"),
            None => writeln!(self.out, "error: {err}"),
        }
    }

    fn list(&mut self) -> io::Result<()> {
        let expenses = self.engine.expenses();
        if expenses.is_empty() {
            return writeln!(self.out, "no expenses");
        }
        for e in &expenses {
            writeln!(
                self.out,
                "{}  {:>10.2}  {:<14} {}",
                e.id,
                e.amount,
                e.category,
                e.timestamp.format("%Y-%m-%d %H:%M")
            )?;
        }
        Ok(())
    }

    fn status(&mut self) -> io::Result<()> {
        let status = self.engine.status();
        let range = match self.engine.date_range() {
            Some(r) => format!("{} to {}", r.start(), r.end()),
            None => "all dates".to_string(),
        };
        writeln!(
            self.out,
            "connectivity: {}",
            if self.engine.is_online() { "online" } else { "offline" }
        )?;
        writeln!(self.out, "expenses:     {}", self.engine.expenses().len())?;
        writeln!(self.out, "total:        {:.2} ({range})", self.engine.total_expenses())?;
        writeln!(self.out, "budget:       {:.2}", self.engine.budget())?;
        writeln!(
            self.out,
            "alerts:       {}",
            if self.engine.notifications_enabled() { "on" } else { "off" }
        )?;
        match status.error_message {
            Some(message) if status.is_failed() => {
                writeln!(self.out, "last op:      failed: {message}")
            }
            Some(message) => writeln!(self.out, "last op:      ok ({message})"),
            None => writeln!(self.out, "last op:      ok"),
        }
    }
}

async fn wait_for_echo<T>(rx: &mut tokio::sync::watch::Receiver<T>) {
    if timeout(ECHO_TIMEOUT, rx.changed()).await.is_err() {
        debug!(timeout = ?ECHO_TIMEOUT, "store did not echo the change; recalculating anyway");
    }
}
