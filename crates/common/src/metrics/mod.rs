//! Metrics and observability utilities
//!
//! Prometheus metrics with SLO-aligned histograms and standardized naming
//! conventions.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all CoE metrics
pub const METRICS_PREFIX: &str = "coe";

/// SLO-aligned histogram buckets for request latency (in seconds)
/// Targets: P50 < 50ms, P99 < 250ms
pub const LATENCY_BUCKETS: &[f64] = &[
    0.001, // 1ms
    0.005, // 5ms
    0.010, // 10ms
    0.025, // 25ms
    0.050, // 50ms - P50 target
    0.100, // 100ms
    0.250, // 250ms - P99 target
    0.500, // 500ms
    1.000, // 1s
    2.500, // 2.5s
    5.000, // 5s
];

/// Buckets for cross-category aggregations (many sequential reads)
pub const AGGREGATION_BUCKETS: &[f64] = &[0.010, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.00];

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    describe_histogram!(
        format!("{}_aggregation_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Cross-category aggregation latency in seconds"
    );

    describe_counter!(
        format!("{}_records_scanned_total", METRICS_PREFIX),
        Unit::Count,
        "Records read by aggregations"
    );

    describe_counter!(
        format!("{}_reports_created_total", METRICS_PREFIX),
        Unit::Count,
        "Custom reports created"
    );

    describe_counter!(
        format!("{}_report_snapshot_records_total", METRICS_PREFIX),
        Unit::Count,
        "Records materialized into custom report snapshots"
    );

    describe_counter!(
        format!("{}_account_reports_total", METRICS_PREFIX),
        Unit::Count,
        "Account activity reports generated"
    );

    describe_histogram!(
        format!("{}_account_report_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Account activity report latency in seconds"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Helper to record a cross-category aggregation
pub fn record_aggregation(duration_secs: f64, scope: &str, records_scanned: u64) {
    histogram!(
        format!("{}_aggregation_duration_seconds", METRICS_PREFIX),
        "scope" => scope.to_string()
    )
    .record(duration_secs);

    counter!(
        format!("{}_records_scanned_total", METRICS_PREFIX),
        "scope" => scope.to_string()
    )
    .increment(records_scanned);
}

/// Helper to record custom report creation
pub fn record_report_created(source_type: &str, record_count: i32) {
    counter!(
        format!("{}_reports_created_total", METRICS_PREFIX),
        "source_type" => source_type.to_string()
    )
    .increment(1);

    counter!(
        format!("{}_report_snapshot_records_total", METRICS_PREFIX),
        "source_type" => source_type.to_string()
    )
    .increment(u64::try_from(record_count).unwrap_or(0));
}

/// Helper to record account report generation
pub fn record_account_report(duration_secs: f64, detailed: bool, activities: usize) {
    let profile = if detailed { "detailed" } else { "summary" };

    counter!(
        format!("{}_account_reports_total", METRICS_PREFIX),
        "profile" => profile
    )
    .increment(1);

    histogram!(
        format!("{}_account_report_duration_seconds", METRICS_PREFIX),
        "profile" => profile
    )
    .record(duration_secs);

    tracing::debug!(profile, activities, "Account report metrics recorded");
}
