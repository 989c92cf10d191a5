// Copyright (c) 2025 Opsforge Maintainers
// SPDX-License-Identifier: MIT

//! Unit tests for `metrics.rs`

#[cfg(test)]
mod tests {
    use super::super::{
        gather_metrics, record_fleet_api_request, record_reconciliation_error,
        record_reconciliation_success, record_status_update, set_active_pollers,
        FLEET_API_REQUESTS_TOTAL, RECONCILIATION_DURATION_SECONDS, RECONCILIATION_TOTAL,
    };
    use std::time::Duration;

    #[test]
    fn test_record_reconciliation_success() {
        record_reconciliation_success(Duration::from_millis(500));

        let counter = RECONCILIATION_TOTAL.with_label_values(&["success"]);
        assert!(counter.get() > 0.0);
        assert!(RECONCILIATION_DURATION_SECONDS.get_sample_count() > 0);
    }

    #[test]
    fn test_record_reconciliation_error() {
        record_reconciliation_error(Duration::from_millis(250));

        let counter = RECONCILIATION_TOTAL.with_label_values(&["error"]);
        assert!(counter.get() > 0.0);
    }

    #[test]
    fn test_record_fleet_api_request() {
        record_fleet_api_request("create_cluster", "success");
        record_fleet_api_request("create_cluster", "error");

        let success = FLEET_API_REQUESTS_TOTAL.with_label_values(&["create_cluster", "success"]);
        let error = FLEET_API_REQUESTS_TOTAL.with_label_values(&["create_cluster", "error"]);
        assert!(success.get() > 0.0);
        assert!(error.get() > 0.0);
    }

    #[test]
    fn test_gather_metrics() {
        // Record some metrics to initialize them
        record_reconciliation_success(Duration::from_millis(100));
        record_status_update();
        set_active_pollers(3);

        let result = gather_metrics();
        assert!(result.is_ok(), "Gathering metrics should succeed");

        let metrics_text = result.unwrap();
        assert!(
            metrics_text.contains("fleet_opsforge_io"),
            "Metrics should contain namespace prefix"
        );
        assert!(
            metrics_text.contains("reconciliations_total"),
            "Metrics should contain reconciliation counter"
        );
    }
}
