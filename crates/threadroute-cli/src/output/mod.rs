//! Output formatters

pub mod json;
pub mod terminal;

use crate::app::OutputFormat;
use serde_json::json;
use threadroute_core::db::ThreadRow;
use threadroute_core::{Message, MemoryStats, ProviderKind, RoutingResult, ThreadSummary};

pub fn format_result(result: &RoutingResult, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => json::format(result),
        OutputFormat::Cli => terminal::format_result(result),
    }
}

pub fn format_history(thread_id: &str, messages: &[Message], format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => json::format(&json!({
            "thread_id": thread_id,
            "messages": messages,
        })),
        OutputFormat::Cli => terminal::format_history(messages),
    }
}

pub fn format_summary(summary: &ThreadSummary, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => json::format(summary),
        OutputFormat::Cli => terminal::format_summary(summary),
    }
}

pub fn format_threads(rows: &[ThreadRow], format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => json::format(rows),
        OutputFormat::Cli => terminal::format_threads(rows),
    }
}

pub fn format_stats(stats: &MemoryStats, providers: &[ProviderKind], format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => json::format(&json!({
            "providers": providers,
            "memory": stats,
        })),
        OutputFormat::Cli => terminal::format_stats(stats, providers),
    }
}
