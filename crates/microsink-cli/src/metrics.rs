//! Prometheus counters for a replay run.

use std::sync::Arc;

use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::registry::Registry;

#[derive(Clone)]
pub struct ReplayMetrics {
    pub batches_delivered: Counter,
    pub batches_failed: Counter,
    pub rows_delivered: Counter,
    pub registry: Arc<Registry>,
}

impl ReplayMetrics {
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let batches_delivered = Counter::default();
        registry.register(
            "microsink_batches_delivered",
            "Micro-batches accepted by the sink and handled by the callback",
            batches_delivered.clone(),
        );

        let batches_failed = Counter::default();
        registry.register(
            "microsink_batches_failed",
            "Micro-batches rejected by the sink or failed by the callback",
            batches_failed.clone(),
        );

        let rows_delivered = Counter::default();
        registry.register(
            "microsink_rows_delivered",
            "Rows handed to the callback across all delivered batches",
            rows_delivered.clone(),
        );

        Self {
            batches_delivered,
            batches_failed,
            rows_delivered,
            registry: Arc::new(registry),
        }
    }

    /// Encode all metrics as Prometheus text format.
    pub fn encode(&self) -> Result<String, std::fmt::Error> {
        let mut buf = String::new();
        encode(&mut buf, &self.registry)?;
        Ok(buf)
    }
}

impl Default for ReplayMetrics {
    fn default() -> Self {
        Self::new()
    }
}
