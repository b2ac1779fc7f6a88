//! Tournament API handlers.
//!
//! Creating, listing and cancelling tournaments, plus bracket generation and
//! the round-by-round bracket view.
//!
//! # Examples
//!
//! Create a tournament:
//! ```bash
//! curl -X POST http://localhost:6969/api/v1/tournaments \
//!   -H "Authorization: Bearer TOKEN" \
//!   -H "Content-Type: application/json" \
//!   -d '{"name": "Autumn Cup", "max_participants": 16}'
//! ```
//!
//! Generate its bracket once registration is done:
//! ```bash
//! curl -X POST http://localhost:6969/api/v1/tournaments/$ID/generate-bracket \
//!   -H "Authorization: Bearer TOKEN" \
//!   -d '{"seeding_policy": "random"}'
//! ```

use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
};
use federation::tournament::{
    BracketView, Match, NewTournament, SeedingPolicy, Tournament, TournamentError, TournamentId,
    TournamentStatus,
};
use serde::Deserialize;

use super::{ApiError, AppState, api_error, request_id::RequestId};
use crate::metrics;

#[derive(Debug, Default, Deserialize)]
pub struct ListTournamentsQuery {
    pub status: Option<TournamentStatus>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GenerateBracketRequest {
    /// Falls back to the server's default policy
    #[serde(default)]
    pub seeding_policy: Option<SeedingPolicy>,
}

/// Create a tournament open for registration.
///
/// Returns `201 Created` with the new tournament.
pub async fn create_tournament(
    State(state): State<AppState>,
    request_id: RequestId,
    Json(request): Json<NewTournament>,
) -> Result<(StatusCode, Json<Tournament>), ApiError> {
    let tournament = state
        .manager
        .create_tournament(request)
        .await
        .map_err(|e| api_error("create_tournament", e))?;

    metrics::tournaments_created_total();
    tracing::info!(
        request_id = %request_id.as_str(),
        tournament_id = %tournament.id,
        "Tournament created"
    );

    Ok((StatusCode::CREATED, Json(tournament)))
}

/// List tournaments, newest first, optionally filtered by `?status=`.
pub async fn list_tournaments(
    State(state): State<AppState>,
    Query(query): Query<ListTournamentsQuery>,
) -> Result<Json<Vec<Tournament>>, ApiError> {
    state
        .manager
        .list_tournaments(query.status)
        .await
        .map(Json)
        .map_err(|e| api_error("list_tournaments", e))
}

pub async fn get_tournament(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> Result<Json<Tournament>, ApiError> {
    state
        .manager
        .get_tournament(tournament_id)
        .await
        .map(Json)
        .map_err(|e| api_error("get_tournament", e))
}

/// Cancel a tournament along with every match still open.
pub async fn cancel_tournament(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> Result<Json<Tournament>, ApiError> {
    state
        .manager
        .cancel_tournament(tournament_id)
        .await
        .map(Json)
        .map_err(|e| api_error("cancel_tournament", e))
}

/// Build the bracket from the active roster and start the tournament.
///
/// The body is optional; without a `seeding_policy` the server default is
/// used. Returns `201 Created` with every generated match, byes included.
pub async fn generate_bracket(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
    request_id: RequestId,
    body: Bytes,
) -> Result<(StatusCode, Json<Vec<Match>>), ApiError> {
    let request: GenerateBracketRequest = if body.iter().all(u8::is_ascii_whitespace) {
        GenerateBracketRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| {
            api_error(
                "generate_bracket",
                TournamentError::Validation(format!("Invalid request body: {e}")),
            )
        })?
    };
    let policy = request
        .seeding_policy
        .unwrap_or(state.default_seeding_policy);

    let matches = state
        .manager
        .generate_bracket(tournament_id, policy)
        .await
        .map_err(|e| api_error("generate_bracket", e))?;

    let byes = matches.iter().filter(|m| m.is_bye).count();
    metrics::bracket_generated(policy.as_str(), byes);
    tracing::info!(
        request_id = %request_id.as_str(),
        tournament_id = %tournament_id,
        matches = matches.len(),
        byes = byes,
        "Bracket generated"
    );

    Ok((StatusCode::CREATED, Json(matches)))
}

/// Matches grouped by round with the champion once the final is decided.
pub async fn get_bracket(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> Result<Json<BracketView>, ApiError> {
    state
        .manager
        .get_bracket(tournament_id)
        .await
        .map(Json)
        .map_err(|e| api_error("get_bracket", e))
}
