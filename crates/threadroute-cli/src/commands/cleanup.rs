//! Cleanup command

use crate::app::{CleanupArgs, OutputFormat};
use crate::output::json;
use anyhow::Result;
use threadroute_core::ThreadOrchestrator;

pub async fn run(args: CleanupArgs, orchestrator: &ThreadOrchestrator, format: OutputFormat) -> Result<()> {
    let days = args
        .max_age_days
        .unwrap_or(orchestrator.memory().config().retention_days);
    let removed = orchestrator.cleanup_old_threads(Some(days)).await?;

    match format {
        OutputFormat::Json => {
            print!(
                "{}",
                json::format(&serde_json::json!({ "removed": removed, "max_age_days": days }))
            );
        }
        OutputFormat::Cli => {
            println!("Removed {} threads older than {} days", removed, days);
        }
    }
    Ok(())
}
