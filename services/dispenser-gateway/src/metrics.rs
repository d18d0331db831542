//! Prometheus metrics exposition
//!
//! - `draws_total` (counter): labels `command`, `outcome`
//! - `draw_duration_seconds` (histogram): label `outcome`
//! - `pool_records` (gauge): label `pool`

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and return a handle for rendering metrics.
///
/// `draw_duration_seconds` gets explicit buckets so it renders as a
/// Prometheus histogram (with `_bucket` lines for `histogram_quantile()`
/// queries) rather than the default summary. Draws are local file I/O, so
/// the buckets cover sub-millisecond up to one second.
pub fn install_recorder() -> PrometheusHandle {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            metrics_exporter_prometheus::Matcher::Full("draw_duration_seconds".to_string()),
            &[0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0],
        )
        .expect("failed to set histogram buckets")
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}

/// Record a completed draw request with command and outcome labels.
pub fn record_draw(command: &str, outcome: &str, duration_secs: f64) {
    metrics::counter!("draws_total", "command" => command.to_string(), "outcome" => outcome.to_string())
        .increment(1);
    metrics::histogram!("draw_duration_seconds", "outcome" => outcome.to_string())
        .record(duration_secs);
}

/// Publish a pool's current record count.
pub fn set_pool_records(pool: &str, count: usize) {
    metrics::gauge!("pool_records", "pool" => pool.to_string()).set(count as f64);
}
