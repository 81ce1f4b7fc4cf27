//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring the bank.
//!
//! # Metrics
//!
//! - `bank_requests_total{cmd}` - Requests handled, by command
//! - `bank_rejections_total{reason}` - Requests rejected, by reason
//! - `bank_appends_total` - Entries appended to the ledger
//! - `bank_append_duration_seconds` - Histogram of append (sign + seal + fsync) latencies
//! - `bank_ledger_entries` - Current ledger length

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Requests by command
    pub requests_total: IntCounterVec,

    /// Rejections by reason
    pub rejections_total: IntCounterVec,

    /// Total entries appended
    pub appends_total: IntCounter,

    /// Append duration histogram
    pub append_duration: Histogram,

    /// Ledger length
    pub ledger_entries: IntGauge,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector with a private registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let requests_total = IntCounterVec::new(
            Opts::new("bank_requests_total", "Requests handled, by command"),
            &["cmd"],
        )?;
        registry.register(Box::new(requests_total.clone()))?;

        let rejections_total = IntCounterVec::new(
            Opts::new("bank_rejections_total", "Requests rejected, by reason"),
            &["reason"],
        )?;
        registry.register(Box::new(rejections_total.clone()))?;

        let appends_total =
            IntCounter::new("bank_appends_total", "Total number of entries appended")?;
        registry.register(Box::new(appends_total.clone()))?;

        let append_duration = Histogram::with_opts(
            HistogramOpts::new(
                "bank_append_duration_seconds",
                "Histogram of append latencies",
            )
            .buckets(vec![0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0]),
        )?;
        registry.register(Box::new(append_duration.clone()))?;

        let ledger_entries = IntGauge::new("bank_ledger_entries", "Current ledger length")?;
        registry.register(Box::new(ledger_entries.clone()))?;

        Ok(Self {
            requests_total,
            rejections_total,
            appends_total,
            append_duration,
            ledger_entries,
            registry,
        })
    }

    /// Record a handled request
    pub fn record_request(&self, cmd: &str) {
        self.requests_total.with_label_values(&[cmd]).inc();
    }

    /// Record a rejection
    pub fn record_rejection(&self, reason: &str) {
        self.rejections_total.with_label_values(&[reason]).inc();
    }

    /// Record a committed append
    pub fn record_append(&self, duration_seconds: f64, ledger_len: usize) {
        self.appends_total.inc();
        self.append_duration.observe(duration_seconds);
        self.set_ledger_entries(ledger_len);
    }

    /// Set the ledger length gauge (e.g. after loading the store)
    pub fn set_ledger_entries(&self, ledger_len: usize) {
        self.ledger_entries.set(ledger_len as i64);
    }

    /// Text exposition format
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        if let Err(e) = TextEncoder::new().encode(&self.registry.gather(), &mut buffer) {
            tracing::warn!("Failed to encode metrics: {}", e);
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("appends_total", &self.appends_total.get())
            .field("ledger_entries", &self.ledger_entries.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        assert_eq!(metrics.appends_total.get(), 0);
        // Private registries never collide
        assert!(Metrics::new().is_ok());
    }

    #[test]
    fn test_record_append() {
        let metrics = Metrics::new().unwrap();
        metrics.record_append(0.002, 3);
        metrics.record_append(0.004, 4);
        assert_eq!(metrics.appends_total.get(), 2);
        assert_eq!(metrics.ledger_entries.get(), 4);
    }

    #[test]
    fn test_render_contains_labels() {
        let metrics = Metrics::new().unwrap();
        metrics.record_request("deposit");
        metrics.record_rejection("insufficient_funds");

        let text = metrics.render();
        assert!(text.contains("bank_requests_total{cmd=\"deposit\"} 1"));
        assert!(text.contains("bank_rejections_total{reason=\"insufficient_funds\"} 1"));
    }
}
