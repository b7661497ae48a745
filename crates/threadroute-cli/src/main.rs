//! Threadroute CLI
//!
//! Command-line front end for the conversation routing engine.

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use threadroute_core::error::exit_codes;
use threadroute_core::{
    Config, Database, InMemoryThreadStore, RouteError, SqliteThreadStore, ThreadOrchestrator,
    ThreadStore,
};

mod app;
mod commands;
mod output;

use app::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(exit_code(&e));
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;

    let store: Arc<dyn ThreadStore> = if cli.ephemeral {
        Arc::new(InMemoryThreadStore::new())
    } else {
        let db_path = Database::default_path();
        tracing::debug!(path = %db_path.display(), "Opening thread store");
        Arc::new(SqliteThreadStore::open(&db_path)?)
    };

    let orchestrator = ThreadOrchestrator::from_config(&config, store)?;

    match cli.command {
        Commands::Ask(args) => commands::ask::run(args, &orchestrator, cli.format).await,
        Commands::History(args) => commands::history::run(args, &orchestrator, cli.format).await,
        Commands::Thread(args) => commands::thread::run(args, &orchestrator, cli.format).await,
        Commands::Threads(args) => commands::thread::run_list(args, &orchestrator, cli.format).await,
        Commands::Status => commands::status::run(&orchestrator, cli.format).await,
        Commands::Cleanup(args) => commands::cleanup::run(args, &orchestrator, cli.format).await,
    }
}

fn exit_code(e: &anyhow::Error) -> i32 {
    e.downcast_ref::<RouteError>()
        .map(RouteError::exit_code)
        .unwrap_or(exit_codes::GENERAL_ERROR)
}
