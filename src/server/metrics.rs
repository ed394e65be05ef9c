use axum::{http::StatusCode, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Encoder, Gauge, GaugeVec, Histogram, HistogramOpts, HistogramVec, Opts,
    Registry, TextEncoder,
};
use std::time::Duration;

use crate::indexer::IndexReport;

/// Metric name prefix for all SongDb metrics
const PREFIX: &str = "songdb";

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_http_requests_total"), "Total number of HTTP requests"),
        &["method", "path", "status"]
    ).expect("Failed to create http_requests_total metric");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_http_request_duration_seconds"),
            "HTTP request duration in seconds"
        )
        .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
        &["method", "path"]
    ).expect("Failed to create http_request_duration_seconds metric");

    pub static ref AUTH_FAILURES_TOTAL: Counter = Counter::new(
        format!("{PREFIX}_auth_failures_total"),
        "Requests rejected for missing or wrong credentials"
    ).expect("Failed to create auth_failures_total metric");

    // Indexing
    pub static ref REINDEX_RUNS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_reindex_runs_total"), "Reconciliation passes by outcome"),
        &["status"]
    ).expect("Failed to create reindex_runs_total metric");

    pub static ref REINDEX_DURATION_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            format!("{PREFIX}_reindex_duration_seconds"),
            "Duration of successful reconciliation passes"
        )
        .buckets(vec![0.01, 0.1, 0.5, 1.0, 5.0, 30.0, 60.0, 300.0])
    ).expect("Failed to create reindex_duration_seconds metric");

    pub static ref REINDEX_FILES: GaugeVec = GaugeVec::new(
        Opts::new(format!("{PREFIX}_reindex_files"), "Files handled by the last pass"),
        &["outcome"]
    ).expect("Failed to create reindex_files metric");

    pub static ref INDEX_WARNINGS_TOTAL: Counter = Counter::new(
        format!("{PREFIX}_index_warnings_total"),
        "Malformed metadata lines seen while indexing"
    ).expect("Failed to create index_warnings_total metric");

    pub static ref SONGS_TOTAL: Gauge = Gauge::new(
        format!("{PREFIX}_songs_total"),
        "Number of songs in the store"
    ).expect("Failed to create songs_total metric");

    pub static ref DB_SIZE_BYTES: Gauge = Gauge::new(
        format!("{PREFIX}_db_size_bytes"),
        "Song database size in bytes"
    ).expect("Failed to create db_size_bytes metric");

    // Background jobs
    pub static ref BACKGROUND_JOB_RUNNING: GaugeVec = GaugeVec::new(
        Opts::new(format!("{PREFIX}_background_job_running"), "Whether a job is running (1) or idle (0)"),
        &["job_id"]
    ).expect("Failed to create background_job_running metric");

    pub static ref BACKGROUND_JOB_EXECUTIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_background_job_executions_total"), "Job executions by outcome"),
        &["job_id", "status"]
    ).expect("Failed to create background_job_executions_total metric");

    pub static ref BACKGROUND_JOB_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_background_job_duration_seconds"),
            "Background job duration in seconds"
        )
        .buckets(vec![0.1, 1.0, 10.0, 60.0, 300.0, 900.0]),
        &["job_id"]
    ).expect("Failed to create background_job_duration_seconds metric");
}

/// Register all metrics with the registry. Safe to call more than once.
pub fn init_metrics() {
    let _ = REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(AUTH_FAILURES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(REINDEX_RUNS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(REINDEX_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(REINDEX_FILES.clone()));
    let _ = REGISTRY.register(Box::new(INDEX_WARNINGS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(SONGS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(DB_SIZE_BYTES.clone()));
    let _ = REGISTRY.register(Box::new(BACKGROUND_JOB_RUNNING.clone()));
    let _ = REGISTRY.register(Box::new(BACKGROUND_JOB_EXECUTIONS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(BACKGROUND_JOB_DURATION_SECONDS.clone()));

    tracing::info!("Metrics system initialized successfully");
}

pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration.as_secs_f64());
}

pub fn record_auth_failure() {
    AUTH_FAILURES_TOTAL.inc();
}

/// Record a successful reconciliation pass
pub fn record_reindex(report: &IndexReport) {
    REINDEX_RUNS_TOTAL.with_label_values(&["success"]).inc();
    REINDEX_DURATION_SECONDS.observe(report.duration_ms as f64 / 1000.0);
    REINDEX_FILES
        .with_label_values(&["indexed"])
        .set(report.files_indexed as f64);
    REINDEX_FILES
        .with_label_values(&["skipped"])
        .set(report.files_skipped as f64);
    REINDEX_FILES
        .with_label_values(&["removed"])
        .set(report.files_removed as f64);
    INDEX_WARNINGS_TOTAL.inc_by(report.warnings as f64);
}

pub fn record_reindex_failure() {
    REINDEX_RUNS_TOTAL.with_label_values(&["failure"]).inc();
}

pub fn set_songs_total(count: usize) {
    SONGS_TOTAL.set(count as f64);
}

pub fn set_db_size_bytes(size: u64) {
    DB_SIZE_BYTES.set(size as f64);
}

pub fn set_background_job_running(job_id: &str, running: bool) {
    BACKGROUND_JOB_RUNNING
        .with_label_values(&[job_id])
        .set(if running { 1.0 } else { 0.0 });
}

pub fn record_background_job_execution(job_id: &str, status: &str, duration: Duration) {
    BACKGROUND_JOB_EXECUTIONS_TOTAL
        .with_label_values(&[job_id, status])
        .inc();
    BACKGROUND_JOB_DURATION_SECONDS
        .with_label_values(&[job_id])
        .observe(duration.as_secs_f64());
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = vec![];
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => {
            let response = String::from_utf8(buffer).unwrap_or_default();
            (StatusCode::OK, response)
        }
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}
