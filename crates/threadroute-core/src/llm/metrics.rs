//! Request counters shared by the HTTP clients

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// API metrics for monitoring
#[derive(Debug, Default)]
pub struct ApiMetrics {
    pub total_requests: AtomicU64,
    pub total_errors: AtomicU64,
    pub total_latency_ms: AtomicU64,
    pub total_tokens: AtomicU64,
}

impl ApiMetrics {
    pub fn record_request(&self) -> Instant {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        Instant::now()
    }

    pub fn record_error(&self) {
        self.total_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_success(&self, started: Instant, tokens: Option<u32>) {
        let elapsed = started.elapsed().as_millis() as u64;
        self.total_latency_ms.fetch_add(elapsed, Ordering::Relaxed);
        if let Some(t) = tokens {
            self.total_tokens.fetch_add(t as u64, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let total = self.total_requests.load(Ordering::Relaxed);
        let errors = self.total_errors.load(Ordering::Relaxed);
        let succeeded = total.saturating_sub(errors);

        MetricsSnapshot {
            total_requests: total,
            total_errors: errors,
            total_tokens: self.total_tokens.load(Ordering::Relaxed),
            avg_latency_ms: if succeeded > 0 {
                self.total_latency_ms.load(Ordering::Relaxed) as f64 / succeeded as f64
            } else {
                0.0
            },
        }
    }
}

/// Snapshot of API metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub total_errors: u64,
    pub total_tokens: u64,
    pub avg_latency_ms: f64,
}
