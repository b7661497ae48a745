//! Thread inspection commands

use crate::app::{OutputFormat, ThreadArgs, ThreadsArgs};
use crate::output::{format_summary, format_threads};
use anyhow::Result;
use threadroute_core::{RouteError, ThreadOrchestrator};

pub async fn run(args: ThreadArgs, orchestrator: &ThreadOrchestrator, format: OutputFormat) -> Result<()> {
    let summary = orchestrator
        .thread_summary(&args.thread)
        .await?
        .ok_or_else(|| RouteError::ThreadNotFound(args.thread.clone()))?;

    print!("{}", format_summary(&summary, format));
    Ok(())
}

pub async fn run_list(
    args: ThreadsArgs,
    orchestrator: &ThreadOrchestrator,
    format: OutputFormat,
) -> Result<()> {
    let rows = orchestrator
        .memory()
        .list_threads(args.user.as_deref(), args.limit, 0)
        .await?;
    print!("{}", format_threads(&rows, format));
    Ok(())
}
