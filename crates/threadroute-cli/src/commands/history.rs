//! History command

use crate::app::{HistoryArgs, OutputFormat};
use crate::output::format_history;
use anyhow::Result;
use threadroute_core::{RouteError, ThreadOrchestrator};

pub async fn run(
    args: HistoryArgs,
    orchestrator: &ThreadOrchestrator,
    format: OutputFormat,
) -> Result<()> {
    if !orchestrator.thread_exists(&args.thread).await? {
        return Err(RouteError::ThreadNotFound(args.thread).into());
    }

    let messages = orchestrator.history(&args.thread, args.limit).await?;
    print!("{}", format_history(&args.thread, &messages, format));
    Ok(())
}
