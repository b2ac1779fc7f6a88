//! Structured logging configuration.
//!
//! Records from the `log` facade used by the `federation` crate are bridged
//! into the same subscriber, so library and server events share one stream.

use federation::tournament::{ErrorKind, TournamentError};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured logging
///
/// Log levels are configurable via the `RUST_LOG` env var.
///
/// # Example
///
/// ```no_run
/// use fed_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,hyper=warn"));

    // Console layer for development
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log a request that the tournament service turned down
///
/// Client mistakes are logged at debug, conflicts and transient failures at
/// warn, and anything internal at error with the unsanitized cause.
pub fn log_rejected_request(operation: &str, error: &TournamentError) {
    match error.kind() {
        ErrorKind::Validation | ErrorKind::NotFound => {
            tracing::debug!(operation = operation, error = %error, "Request rejected");
        }
        ErrorKind::Conflict => {
            tracing::warn!(
                operation = operation,
                error = %error,
                "Request conflicts with tournament state"
            );
        }
        ErrorKind::Retryable => {
            tracing::warn!(
                operation = operation,
                error = %error,
                "Transient failure, client may retry"
            );
        }
        ErrorKind::Internal => {
            tracing::error!(operation = operation, error = ?error, "Request failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_rejected_request() {
        // Just ensure it doesn't panic for any kind
        log_rejected_request("register", &TournamentError::Validation("bad".to_string()));
        log_rejected_request("register", &TournamentError::TournamentLocked);
        log_rejected_request("submit_result", &TournamentError::Retryable("busy".to_string()));
        log_rejected_request("advance", &TournamentError::Internal("broken".to_string()));
    }
}
