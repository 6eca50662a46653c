//! Node Operation Metrics
//!
//! Prometheus counters and latency histograms for node RPCs, labelled by
//! operation and result (`success` or the error kind).

use crate::error::{Error, Result};
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};
use std::time::Instant;

/// Metric name prefix
pub const METRICS_NAMESPACE: &str = "goofys_csi";

/// Counters and histograms for node operations
#[derive(Clone)]
pub struct NodeMetrics {
    operations: IntCounterVec,
    duration: HistogramVec,
}

impl NodeMetrics {
    /// Create unregistered metrics
    pub fn new() -> Result<Self> {
        let operations = IntCounterVec::new(
            Opts::new("node_operations_total", "Node operations by result")
                .namespace(METRICS_NAMESPACE),
            &["operation", "result"],
        )
        .map_err(|e| Error::Internal(format!("metric definition: {}", e)))?;

        let duration = HistogramVec::new(
            HistogramOpts::new(
                "node_operation_duration_seconds",
                "Duration of node operations",
            )
            .namespace(METRICS_NAMESPACE),
            &["operation"],
        )
        .map_err(|e| Error::Internal(format!("metric definition: {}", e)))?;

        Ok(Self {
            operations,
            duration,
        })
    }

    /// Register with a prometheus registry
    pub fn register(&self, registry: &Registry) -> Result<()> {
        registry
            .register(Box::new(self.operations.clone()))
            .and_then(|_| registry.register(Box::new(self.duration.clone())))
            .map_err(|e| Error::Internal(format!("metric registration: {}", e)))
    }

    /// Record one finished operation
    pub fn observe<T>(&self, operation: &str, started: Instant, result: &Result<T>) {
        let outcome = match result {
            Ok(_) => "success",
            Err(e) => e.kind(),
        };
        self.operations
            .with_label_values(&[operation, outcome])
            .inc();
        self.duration
            .with_label_values(&[operation])
            .observe(started.elapsed().as_secs_f64());
    }

    /// Count of operations with the given labels
    pub fn count(&self, operation: &str, outcome: &str) -> u64 {
        self.operations
            .with_label_values(&[operation, outcome])
            .get()
    }
}
