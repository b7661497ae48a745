//! Status command

use crate::app::OutputFormat;
use crate::output::format_stats;
use anyhow::Result;
use threadroute_core::ThreadOrchestrator;

pub async fn run(orchestrator: &ThreadOrchestrator, format: OutputFormat) -> Result<()> {
    let stats = orchestrator.memory().stats().await?;
    let providers = orchestrator.providers().configured();

    print!("{}", format_stats(&stats, &providers, format));
    Ok(())
}
