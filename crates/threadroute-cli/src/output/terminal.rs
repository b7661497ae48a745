//! Terminal output formatter

use threadroute_core::db::ThreadRow;
use threadroute_core::{
    Message, MemoryStats, ProviderKind, ResponsePayload, RoutingResult, ThreadSummary,
};

pub fn format_result(result: &RoutingResult) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "[{}] {:.0}% thread {}\n",
        result.query_type,
        result.classification_confidence * 100.0,
        result.thread_id
    ));
    if !result.classification_reasoning.is_empty() {
        output.push_str(&format!("  {}\n", result.classification_reasoning));
    }
    output.push_str(&format!(
        "  context turns: {}  time: {}ms  model: {}\n",
        result.context_messages_used, result.processing_time_ms, result.generation.model
    ));
    if let Some(m) = &result.provider_metrics {
        output.push_str(&format!(
            "  provider calls: {}  errors: {}  avg latency: {:.0}ms\n",
            m.total_requests, m.total_errors, m.avg_latency_ms
        ));
    }
    if result.degraded {
        output.push_str("  (degraded: some generations failed)\n");
    }
    output.push('\n');

    match &result.response {
        ResponsePayload::Exploratory {
            responses,
            questions,
        } => {
            for (i, (key, text)) in responses.iter().enumerate() {
                output.push_str(&format!("## {}", key));
                if let Some(q) = questions.get(i) {
                    output.push_str(&format!(": {}", q));
                }
                output.push('\n');
                output.push_str(text.trim_end());
                output.push_str("\n\n");
            }
        }
        ResponsePayload::Direct { response } => {
            output.push_str(response.trim_end());
            output.push('\n');
        }
    }

    output
}

pub fn format_history(messages: &[Message]) -> String {
    let mut output = String::new();
    for (i, m) in messages.iter().enumerate() {
        output.push_str(&format!(
            "{:>3}. [{}] {}\n",
            i + 1,
            m.query_type,
            m.timestamp.format("%Y-%m-%d %H:%M:%S")
        ));
        output.push_str(&format!("     > {}\n", m.user_query));
        for line in m.ai_response.lines().take(5) {
            output.push_str(&format!("     {}\n", line));
        }
        if m.ai_response.lines().count() > 5 {
            output.push_str("     ...\n");
        }
    }
    output
}

pub fn format_summary(summary: &ThreadSummary) -> String {
    let types: Vec<&str> = summary.query_types.iter().map(|t| t.as_str()).collect();
    let mut output = String::new();
    output.push_str(&format!("Thread:          {}\n", summary.thread_id));
    output.push_str(&format!(
        "User:            {}\n",
        summary.user_id.as_deref().unwrap_or("-")
    ));
    output.push_str(&format!("Messages:        {}\n", summary.message_count));
    output.push_str(&format!("Created:         {}\n", summary.created_at.to_rfc3339()));
    output.push_str(&format!("Updated:         {}\n", summary.updated_at.to_rfc3339()));
    output.push_str(&format!("Query types:     {}\n", types.join(", ")));
    if let Some(q) = &summary.first_query {
        output.push_str(&format!("First query:     {}\n", q));
    }
    if let Some(q) = &summary.last_query {
        output.push_str(&format!("Last query:      {}\n", q));
    }
    output
}

pub fn format_threads(rows: &[ThreadRow]) -> String {
    if rows.is_empty() {
        return "No threads\n".to_string();
    }
    let mut output = String::new();
    for row in rows {
        output.push_str(&format!(
            "{}  {:>4} msgs  {}  {}\n",
            row.thread_id,
            row.message_count,
            row.updated_at,
            row.user_id.as_deref().unwrap_or("-")
        ));
        if let Some(first) = &row.first_query {
            output.push_str(&format!("    first: {}\n", first));
        }
        if let Some(last) = row.last_query.as_ref().filter(|_| row.message_count > 1) {
            output.push_str(&format!("    last:  {}\n", last));
        }
    }
    output
}

pub fn format_stats(stats: &MemoryStats, providers: &[ProviderKind]) -> String {
    let names: Vec<&str> = providers.iter().map(|p| p.as_str()).collect();
    let mut output = String::new();
    output.push_str(&format!("Threads:         {}\n", stats.total_threads));
    output.push_str(&format!("Messages:        {}\n", stats.total_messages));
    output.push_str(&format!(
        "Avg per thread:  {:.1}\n",
        stats.avg_messages_per_thread
    ));
    output.push('\n');
    output.push_str("Cache:\n");
    output.push_str(&format!(
        "  Threads:       {}/{}\n",
        stats.cached_threads, stats.cache_capacity
    ));
    output.push('\n');
    output.push_str(&format!("Providers:       {}\n", names.join(", ")));
    output
}
