//! expensesync CLI
//!
//! Interactive host for the expense engine. Expenses live in an in-memory
//! remote store for the lifetime of the process; preferences persist to a
//! JSON settings file. Type `help` at the prompt for the command list.

mod commands;

use clap::Parser;
use commands::{parse, Flow, Session};
use expensesync_engine::store::{FileSettings, InMemoryRemoteStore};
use expensesync_engine::{EngineConfig, ExpenseEngine, StaticConnectivity, TracingAlertSink};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

/// Connectivity-aware expense tracking with budget alerts.
#[derive(Parser)]
#[command(name = "expensesync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the JSON settings file
    #[arg(short, long, default_value = "expensesync-settings.json")]
    settings: PathBuf,

    /// Start with connectivity down
    #[arg(long)]
    offline: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let settings = Arc::new(FileSettings::open(&cli.settings)?);
    let connectivity = Arc::new(StaticConnectivity::new(!cli.offline));
    let engine = Arc::new(ExpenseEngine::new(
        EngineConfig::default(),
        Arc::new(InMemoryRemoteStore::new()),
        settings,
        Arc::new(TracingAlertSink),
        connectivity.clone(),
    ));
    let listener = engine.start().await;
    tracing::info!(settings = %cli.settings.display(), "session started");

    let mut session = Session::new(engine, connectivity, std::io::stdout());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        match parse(&line) {
            Ok(None) => continue,
            Ok(Some(command)) => {
                if session.execute(command).await? == Flow::Quit {
                    break;
                }
            }
            Err(e) => println!("error: {e}"),
        }
    }

    drop(session);
    listener.abort();
    Ok(())
}
