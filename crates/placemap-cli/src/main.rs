//! placemap - browse place themes and trip itineraries from the terminal.
//!
//! Datasets are discovered from a local directory or an HTTP base URL,
//! loaded on demand and kept in a bounded in-memory cache.

mod cli;
mod commands;

use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Command};
use placemap_core::{fetcher_for, BrowseSession, Config};

/// Initialize the tracing subscriber for logging.
///
/// Uses RUST_LOG when set, `warn` otherwise. With a log file the returned
/// guard must live until exit so buffered lines are flushed.
fn init_tracing(log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    match log_file {
        Some(path) => {
            let directory = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let file_name = path
                .file_name()
                .with_context(|| format!("Invalid log file path {}", path.display()))?;
            let appender = tracing_appender::rolling::never(directory, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);

            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .with(filter)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(io::stderr))
                .with(filter)
                .init();
            Ok(None)
        }
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.global.config {
        Some(path) => {
            let mut config = Config::load_from(path)?;
            config.apply_overrides(|key| std::env::var(key).ok());
            config
        }
        None => Config::load()?,
    };
    cli.global.apply(&mut config);
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _guard = init_tracing(cli.global.log_file.as_deref())?;
    info!("placemap starting");

    let config = load_config(&cli)?;
    let fetcher = fetcher_for(&config)?;
    let mut session = BrowseSession::start(&config, fetcher)
        .await
        .context("Failed to open the catalogue")?;

    match &cli.command {
        Command::List => commands::list(&session),
        Command::Show { id, day } => commands::show(&mut session, id, *day).await?,
        Command::Facets { id } => commands::facets(&mut session, id).await?,
        Command::Filter {
            id,
            labels,
            constraints,
        } => commands::filter(&mut session, id, labels, constraints).await?,
        Command::Search { id, query, labels } => {
            commands::search(&mut session, id, query, labels).await?
        }
        Command::Browse => commands::browse(&mut session).await?,
    }

    info!("placemap shutting down");
    Ok(())
}
