// Copyright (c) 2025 Opsforge Maintainers
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the fleet operator.
//!
//! All metrics live under the namespace prefix `fleet_opsforge_io_`
//! (prometheus-safe version of "fleet.opsforge.io") and are exposed on the
//! `/metrics` endpoint.
//!
//! # Metrics Categories
//!
//! - **Reconciliation Metrics** - Outcomes and duration of reconciliations
//! - **Fleet API Metrics** - Calls against the fleet-management service
//! - **Poller Metrics** - Active status pollers and status write-backs
//!
//! # Example
//!
//! ```rust,no_run
//! use fleetop::metrics::record_reconciliation_success;
//!
//! record_reconciliation_success(std::time::Duration::from_millis(120));
//! ```

use prometheus::{
    CounterVec, Encoder, Gauge, Histogram, HistogramOpts, IntCounter, Opts, Registry, TextEncoder,
};
use std::sync::LazyLock;
use std::time::Duration;

/// Namespace prefix for all fleet operator metrics (prometheus-safe)
const METRICS_NAMESPACE: &str = "fleet_opsforge_io";

/// Global Prometheus metrics registry
///
/// All metrics are registered in this registry and exposed via the
/// `/metrics` endpoint.
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

/// Total number of reconciliations by outcome
///
/// Labels:
/// - `status`: Outcome (`success`, `error`)
pub static RECONCILIATION_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_reconciliations_total"),
        "Total number of RemoteCluster reconciliations by outcome",
    );
    let counter = CounterVec::new(opts, &["status"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Duration of reconciliations in seconds
pub static RECONCILIATION_DURATION_SECONDS: LazyLock<Histogram> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_reconciliation_duration_seconds"),
        "Duration of RemoteCluster reconciliations in seconds",
    )
    .buckets(vec![0.001, 0.01, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]);
    let histogram = Histogram::with_opts(opts).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

/// Total number of fleet API requests by operation and outcome
///
/// Labels:
/// - `operation`: Fleet endpoint called (`create_cluster`, `get_cluster_status`,
///   `get_cluster_by_name`, `delete_cluster`)
/// - `outcome`: `success` or `error` (after retries were exhausted)
pub static FLEET_API_REQUESTS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_fleet_api_requests_total"),
        "Total number of fleet API requests by operation and outcome",
    );
    let counter = CounterVec::new(opts, &["operation", "outcome"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Number of currently running status pollers
pub static ACTIVE_POLLERS: LazyLock<Gauge> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_active_pollers"),
        "Number of currently running status pollers",
    );
    let gauge = Gauge::with_opts(opts).unwrap();
    METRICS_REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

/// Total number of status write-backs (only changed statuses are written)
pub static STATUS_UPDATES_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_status_updates_total"),
        "Total number of cluster status write-backs",
    );
    let counter = IntCounter::with_opts(opts).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Total number of synthetic reconcile events injected
pub static SYNTHETIC_EVENTS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_synthetic_events_total"),
        "Total number of synthetic reconcile events injected",
    );
    let counter = IntCounter::with_opts(opts).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Record a successful reconciliation
///
/// # Arguments
/// * `duration` - Duration of the reconciliation
pub fn record_reconciliation_success(duration: Duration) {
    RECONCILIATION_TOTAL.with_label_values(&["success"]).inc();
    RECONCILIATION_DURATION_SECONDS.observe(duration.as_secs_f64());
}

/// Record a failed reconciliation
///
/// # Arguments
/// * `duration` - Duration of the reconciliation before failure
pub fn record_reconciliation_error(duration: Duration) {
    RECONCILIATION_TOTAL.with_label_values(&["error"]).inc();
    RECONCILIATION_DURATION_SECONDS.observe(duration.as_secs_f64());
}

/// Record a fleet API request
///
/// # Arguments
/// * `operation` - The fleet endpoint called (e.g., `create_cluster`)
/// * `outcome` - `success` or `error`
pub fn record_fleet_api_request(operation: &str, outcome: &str) {
    FLEET_API_REQUESTS_TOTAL
        .with_label_values(&[operation, outcome])
        .inc();
}

/// Set the active poller gauge to the registry's current size
pub fn set_active_pollers(count: usize) {
    #[allow(clippy::cast_precision_loss)]
    ACTIVE_POLLERS.set(count as f64);
}

/// Record a cluster status write-back
pub fn record_status_update() {
    STATUS_UPDATES_TOTAL.inc();
}

/// Record an injected synthetic reconcile event
pub fn record_synthetic_event() {
    SYNTHETIC_EVENTS_TOTAL.inc();
}

/// Gather and encode all metrics in Prometheus text format
///
/// # Returns
/// Prometheus-formatted metrics as a String
///
/// # Errors
/// Returns error if encoding fails
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod metrics_tests;
