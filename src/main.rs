//! Expense-logging chat assistant
//!
//! A per-user dialogue state machine driving button menus over a chat
//! channel, with SQLite persistence and per-category spending reports.

mod admin;
mod catalog;
mod channel;
mod config;
mod dialogue;
mod periods;
mod report;
mod runtime;
mod store;

use catalog::Catalog;
use channel::StdioChannel;
use config::Config;
use runtime::Dispatcher;
use std::path::Path;
use std::sync::Arc;
use store::ExpenseStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    init_logging(&config.log_path)?;
    tracing::info!(?config, "Starting expense assistant");

    if let Some(parent) = config.database_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let store = ExpenseStore::open(&config.database_path)?;
    tracing::info!(path = %config.database_path.display(), "Database ready");

    let catalog = Arc::new(Catalog::load(&config.catalog_dir)?);
    tracing::info!(
        categories = catalog.categories.len(),
        periods = catalog.periods.len(),
        "Catalog loaded"
    );

    let channel = Arc::new(StdioChannel::new());
    let dispatcher = Dispatcher::new(
        store,
        catalog,
        channel,
        config.admin_id,
        config.log_path.clone(),
    );

    tokio::select! {
        result = channel::run_stdin_loop(&dispatcher) => {
            result?;
            tracing::info!("Input closed");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupt received");
        }
    }

    dispatcher.shutdown().await;
    tracing::info!("Shut down cleanly");
    Ok(())
}

/// Stderr for humans, the log file for /logs; stdout stays clean for the
/// channel protocol.
fn init_logging(log_path: &Path) -> Result<(), std::io::Error> {
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)?;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "outlay=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Arc::new(log_file)),
        )
        .init();
    Ok(())
}
