//! Prometheus metrics for monitoring tournament server health and activity.
//!
//! Metrics are exposed in Prometheus text format for scraping by monitoring
//! systems. Recording is a no-op until [`init_metrics`] installs the exporter.
//!
//! # Metrics Categories
//!
//! - **HTTP Metrics**: Request counts, duration, status codes
//! - **Tournament Metrics**: Tournaments created and completed, registrations
//! - **Bracket Metrics**: Brackets generated, byes per bracket, match results
//! - **Storage Metrics**: Retryable conflicts
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use fed_server::metrics;
//! use std::net::SocketAddr;
//!
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//!
//! metrics::http_requests_total("POST", "/api/v1/tournaments", 201);
//! metrics::participants_registered_total();
//! ```

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize Prometheus metrics exporter.
///
/// Sets up a Prometheus scrape endpoint on the specified address.
/// Metrics will be available at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Record HTTP request.
///
/// `path` should be the matched route template, not the raw URI, to keep
/// label cardinality bounded.
pub fn http_requests_total(method: &str, path: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record HTTP request duration in milliseconds.
pub fn http_request_duration_ms(method: &str, path: &str, duration_ms: f64) {
    metrics::histogram!("http_request_duration_ms",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_ms);
}

// ============================================================================
// Tournament Metrics
// ============================================================================

pub fn tournaments_created_total() {
    metrics::counter!("tournaments_created_total").increment(1);
}

pub fn tournaments_completed_total() {
    metrics::counter!("tournaments_completed_total").increment(1);
}

pub fn participants_registered_total() {
    metrics::counter!("participants_registered_total").increment(1);
}

// ============================================================================
// Bracket Metrics
// ============================================================================

/// Record a generated bracket and how many byes it needed.
pub fn bracket_generated(policy: &str, byes: usize) {
    metrics::counter!("brackets_generated_total",
        "seeding_policy" => policy.to_string()
    )
    .increment(1);
    metrics::histogram!("bracket_byes").record(byes as f64);
}

/// Increment match results counter.
pub fn match_results_total() {
    metrics::counter!("match_results_total").increment(1);
}

// ============================================================================
// Storage Metrics
// ============================================================================

/// Increment the counter of operations rejected as retryable.
pub fn retryable_conflicts_total(operation: &str) {
    metrics::counter!("retryable_conflicts_total",
        "operation" => operation.to_string()
    )
    .increment(1);
}
