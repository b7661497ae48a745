//! Ask command

use crate::app::{AskArgs, OutputFormat};
use crate::output::format_result;
use anyhow::Result;
use threadroute_core::{QueryRequest, ThreadOrchestrator};

pub async fn run(args: AskArgs, orchestrator: &ThreadOrchestrator, format: OutputFormat) -> Result<()> {
    let mut request = QueryRequest::new(args.query.join(" "), args.user).with_provider(args.provider);
    request.thread_id = args.thread;
    request.model = args.model;
    request.temperature = args.temperature;
    request.max_tokens = args.max_tokens;

    let result = orchestrator.process_query(request).await?;
    print!("{}", format_result(&result, format));

    if format == OutputFormat::Cli {
        eprintln!("Continue with: threadroute ask --thread {} <query>", result.thread_id);
    }
    Ok(())
}
