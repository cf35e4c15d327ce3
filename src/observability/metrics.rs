//! Metrics collection.
//!
//! # Metrics
//! - `resourcemanager_rpc_calls_total` (counter): attempts by operation
//! - `resourcemanager_rpc_retries_total` (counter): retried attempts by operation
//! - `resourcemanager_rpc_failures_total` (counter): surfaced failures by operation, code
//!
//! Without an installed recorder every call is a no-op.

/// Record one RPC attempt.
pub fn record_call(operation: &'static str) {
    metrics::counter!("resourcemanager_rpc_calls_total", "operation" => operation).increment(1);
}

/// Record a retry after a transient failure.
pub fn record_retry(operation: &'static str) {
    metrics::counter!("resourcemanager_rpc_retries_total", "operation" => operation).increment(1);
}

/// Record a failure surfaced to the caller.
pub fn record_failure(operation: &'static str, code: Option<u16>) {
    let code = code.map_or_else(|| "none".to_string(), |c| c.to_string());
    metrics::counter!(
        "resourcemanager_rpc_failures_total",
        "operation" => operation,
        "code" => code
    )
    .increment(1);
}
