use std::net::SocketAddr;

use crate::config::Config;
use crate::engine::EngineError;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: engine operations finished. Labels: operation, status.
pub const OPERATIONS_TOTAL: &str = "courtside_operations_total";

/// Histogram: operation latency in seconds. Labels: operation.
pub const OPERATION_DURATION_SECONDS: &str = "courtside_operation_duration_seconds";

/// Histogram: proposals evaluated per availability batch.
pub const AVAILABILITY_BATCH_SIZE: &str = "courtside_availability_batch_size";

// ── Domain counters ─────────────────────────────────────────────

/// Counter: reservations written by create operations (single and series).
pub const RESERVATIONS_CREATED_TOTAL: &str = "courtside_reservations_created_total";

/// Counter: reservations rewritten by linked updates.
pub const RESERVATIONS_UPDATED_TOTAL: &str = "courtside_reservations_updated_total";

/// Counter: recurring series written.
pub const SERIES_CREATED_TOTAL: &str = "courtside_series_created_total";

/// Counter: recurring series rejected because at least one date was taken.
pub const SERIES_REJECTED_TOTAL: &str = "courtside_series_rejected_total";

// ── Storage ─────────────────────────────────────────────────────

/// Histogram: WAL append + fsync duration in seconds.
pub const WAL_FLUSH_DURATION_SECONDS: &str = "courtside_wal_flush_duration_seconds";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), metrics_exporter_prometheus::BuildError> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}

/// `init` with the configured `metrics_port`.
pub fn init_from_config(config: &Config) -> Result<(), metrics_exporter_prometheus::BuildError> {
    init(config.metrics_port)
}

/// Record the outcome of one engine operation.
pub fn record_operation<T>(
    operation: &'static str,
    started: std::time::Instant,
    result: &Result<T, EngineError>,
) {
    let status = match result {
        Ok(_) => "ok",
        Err(e) => e.code(),
    };
    metrics::counter!(OPERATIONS_TOTAL, "operation" => operation, "status" => status).increment(1);
    metrics::histogram!(OPERATION_DURATION_SECONDS, "operation" => operation)
        .record(started.elapsed().as_secs_f64());
}
