// Private module declaration
mod server;

use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry};

// Re-export for public API
pub use server::start_metrics_server;

// ============================================================================
// Metrics Module - Prometheus metrics for observability
// ============================================================================
//
// One counter increment and one latency observation per transition attempt,
// labelled by outcome, so every decision branch (invalid input, forbidden,
// invalid transition, conflict, success, ...) is visible without reading
// application logs. Audit-append failures get their own counter because they
// are swallowed on the request path and must surface somewhere.
//
// All metrics are registered with Prometheus and can be scraped via /metrics
// ============================================================================

/// Central metrics registry for the entire application
pub struct Metrics {
    registry: Registry,

    // Transition Engine Metrics
    pub transition_attempts: IntCounterVec,
    pub transition_duration: HistogramVec,

    // Audit Trail Metrics
    pub audit_append_failures: IntCounter,

    // Intake Metrics
    pub orders_created: IntCounter,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let transition_attempts = IntCounterVec::new(
            Opts::new(
                "order_transition_attempts_total",
                "Order status transition attempts by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(transition_attempts.clone()))?;

        let transition_duration = HistogramVec::new(
            HistogramOpts::new(
                "order_transition_duration_seconds",
                "Order status transition latency by outcome",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["outcome"],
        )?;
        registry.register(Box::new(transition_duration.clone()))?;

        let audit_append_failures = IntCounter::new(
            "order_audit_append_failures_total",
            "Transition events that could not be appended after retries",
        )?;
        registry.register(Box::new(audit_append_failures.clone()))?;

        let orders_created = IntCounter::new(
            "orders_created_total",
            "Orders accepted from the intake endpoint",
        )?;
        registry.register(Box::new(orders_created.clone()))?;

        Ok(Self {
            registry,
            transition_attempts,
            transition_duration,
            audit_append_failures,
            orders_created,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Record one transition attempt, whatever its outcome
    pub fn record_transition(&self, outcome: &str, duration_secs: f64) {
        self.transition_attempts.with_label_values(&[outcome]).inc();
        self.transition_duration
            .with_label_values(&[outcome])
            .observe(duration_secs);
    }

    /// Record an audit append that failed after all retries
    pub fn record_audit_failure(&self) {
        self.audit_append_failures.inc();
    }

    /// Record one accepted order
    pub fn record_order_created(&self) {
        self.orders_created.inc();
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new().expect("Failed to create metrics")
    }
}
