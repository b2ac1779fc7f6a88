//! HTTP API for the tournament server.
//!
//! REST endpoints for tournaments, their participant rosters, brackets and
//! matches. Every handler delegates to a [`TournamentManager`], which applies
//! mutations atomically per tournament.
//!
//! # Modules
//!
//! - [`tournaments`]: Create, list, cancel; bracket generation and view
//! - [`participants`]: Registration, roster edits, withdrawal
//! - [`matches`]: Match lifecycle and winner advancement
//! - [`middleware`]: Organizer token guard and HTTP metrics
//! - [`request_id`]: Request correlation ids
//!
//! # Endpoints Overview
//!
//! ```text
//! GET    /health
//! GET    /api/v1/health
//! POST   /api/v1/tournaments
//! GET    /api/v1/tournaments?status=<status>
//! GET    /api/v1/tournaments/{id}
//! POST   /api/v1/tournaments/{id}/cancel
//! POST   /api/v1/tournaments/{id}/participants
//! GET    /api/v1/tournaments/{id}/participants
//! GET    /api/v1/tournaments/{id}/participants/{pid}
//! PUT    /api/v1/tournaments/{id}/participants/{pid}
//! DELETE /api/v1/tournaments/{id}/participants/{pid}
//! POST   /api/v1/tournaments/{id}/participants/{pid}/withdraw
//! POST   /api/v1/tournaments/{id}/generate-bracket
//! GET    /api/v1/tournaments/{id}/bracket
//! GET    /api/v1/tournaments/{id}/matches
//! GET    /api/v1/tournaments/{id}/matches/{mid}
//! POST   /api/v1/tournaments/{id}/matches/{mid}/start
//! PUT    /api/v1/tournaments/{id}/matches/{mid}/result
//! POST   /api/v1/tournaments/{id}/matches/{mid}/cancel
//! POST   /api/v1/tournaments/{id}/matches/{mid}/advance
//! ```
//!
//! # Errors
//!
//! Failures are returned as `{"error": "...", "retryable": false}` with:
//! 400 for validation, 404 for unknown ids, 409 for state conflicts, 503 for
//! lock contention (`retryable: true`, the request may be repeated) and 500
//! for anything internal.
//!
//! # CORS
//!
//! CORS is configured permissively for development. In production, configure
//! appropriate origins, methods, and headers.

pub mod matches;
pub mod middleware;
pub mod participants;
pub mod request_id;
pub mod tournaments;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post, put},
};
use federation::tournament::{ErrorKind, SeedingPolicy, TournamentError, TournamentManager};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::{config::ServerConfig, logging, metrics};

/// Application state shared across all HTTP handlers.
///
/// Cloned for each request; the manager holds its repository behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub manager: TournamentManager,
    /// Hex SHA-256 of the organizer token, `None` leaves mutations open
    pub organizer_token_sha256: Option<String>,
    pub default_seeding_policy: SeedingPolicy,
}

impl AppState {
    pub fn new(manager: TournamentManager, config: &ServerConfig) -> Self {
        Self {
            manager,
            organizer_token_sha256: config.organizer_token_sha256.clone(),
            default_seeding_policy: config.default_seeding_policy,
        }
    }
}

/// Error body returned by every endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    /// The same request may succeed if repeated
    #[serde(default)]
    pub retryable: bool,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// Convert a domain error into a response, logging and counting it.
pub(crate) fn api_error(operation: &'static str, error: TournamentError) -> ApiError {
    logging::log_rejected_request(operation, &error);

    let status = match error.kind() {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Retryable => {
            metrics::retryable_conflicts_total(operation);
            StatusCode::SERVICE_UNAVAILABLE
        }
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (
        status,
        Json(ErrorResponse {
            error: error.client_message(),
            retryable: error.is_retryable(),
        }),
    )
}

/// Create the complete API router with all endpoints and middleware.
///
/// # Example
///
/// ```rust,no_run
/// use fed_server::api::{create_router, AppState};
/// use fed_server::config::ServerConfig;
/// use federation::TournamentManager;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let state = AppState::new(TournamentManager::in_memory(), &ServerConfig::in_memory());
/// let app = create_router(state);
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```
pub fn create_router(state: AppState) -> Router {
    let v1_routes = create_v1_router(state.clone());

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", v1_routes)
        .layer(axum::middleware::from_fn(middleware::track_metrics))
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Create API v1 router with all versioned endpoints.
///
/// Reads are public; the organizer guard rejects mutating methods without the
/// organizer token when one is configured.
fn create_v1_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route(
            "/tournaments",
            post(tournaments::create_tournament).get(tournaments::list_tournaments),
        )
        .route("/tournaments/{tournament_id}", get(tournaments::get_tournament))
        .route(
            "/tournaments/{tournament_id}/cancel",
            post(tournaments::cancel_tournament),
        )
        .route(
            "/tournaments/{tournament_id}/generate-bracket",
            post(tournaments::generate_bracket),
        )
        .route(
            "/tournaments/{tournament_id}/bracket",
            get(tournaments::get_bracket),
        )
        .route(
            "/tournaments/{tournament_id}/participants",
            post(participants::register_participant).get(participants::list_participants),
        )
        .route(
            "/tournaments/{tournament_id}/participants/{participant_id}",
            get(participants::get_participant)
                .put(participants::update_participant)
                .delete(participants::remove_participant),
        )
        .route(
            "/tournaments/{tournament_id}/participants/{participant_id}/withdraw",
            post(participants::withdraw_participant),
        )
        .route(
            "/tournaments/{tournament_id}/matches",
            get(matches::list_matches),
        )
        .route(
            "/tournaments/{tournament_id}/matches/{match_id}",
            get(matches::get_match),
        )
        .route(
            "/tournaments/{tournament_id}/matches/{match_id}/start",
            post(matches::start_match),
        )
        .route(
            "/tournaments/{tournament_id}/matches/{match_id}/result",
            put(matches::submit_result),
        )
        .route(
            "/tournaments/{tournament_id}/matches/{match_id}/cancel",
            post(matches::cancel_match),
        )
        .route(
            "/tournaments/{tournament_id}/matches/{match_id}/advance",
            post(matches::advance_match),
        )
        .layer(axum::middleware::from_fn_with_state(
            state,
            middleware::organizer_guard,
        ))
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when the tournament store answers, `503 Service
/// Unavailable` otherwise.
///
/// ```bash
/// curl http://localhost:6969/health
/// # {"status":"healthy","storage":true,"version":"0.4.0","timestamp":"2026-10-19T10:30:00Z"}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let storage_healthy = match state.manager.health_check().await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(error = %e, "Health check failed");
            false
        }
    };

    let status_code = if storage_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if storage_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "storage": storage_healthy,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (TournamentError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (TournamentError::TournamentNotFound(Uuid::nil()), StatusCode::NOT_FOUND),
            (TournamentError::TournamentLocked, StatusCode::CONFLICT),
            (TournamentError::BracketAlreadyExists, StatusCode::CONFLICT),
            (
                TournamentError::Retryable("lock timeout".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                TournamentError::Internal("broken".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            let (status, _) = api_error("test", error);
            assert_eq!(status, expected);
        }
    }

    #[test]
    fn test_retryable_flag_and_sanitized_message() {
        let (_, Json(body)) = api_error("test", TournamentError::Retryable("55P03".into()));
        assert!(body.retryable);
        assert!(!body.error.contains("55P03"));

        let (_, Json(body)) = api_error("test", TournamentError::Internal("arena index".into()));
        assert!(!body.retryable);
        assert_eq!(body.error, "Internal server error");
    }
}
