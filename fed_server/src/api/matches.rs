//! Match API handlers.
//!
//! Results are submitted with `PUT .../matches/{mid}/result`:
//!
//! ```bash
//! curl -X PUT http://localhost:6969/api/v1/tournaments/$ID/matches/$MID/result \
//!   -H "Authorization: Bearer TOKEN" \
//!   -H "Content-Type: application/json" \
//!   -d '{"participant1_score": 3, "participant2_score": 1, "winner_id": "..."}'
//! ```
//!
//! The response carries the updated match, where its winner was placed and
//! the tournament status, which turns `completed` when the final is decided.

use axum::{
    Json,
    extract::{Path, State},
};
use federation::tournament::{
    Match, MatchId, MatchOutcome, ScoreReport, TournamentId, TournamentStatus,
};

use super::{ApiError, AppState, api_error};
use crate::metrics;

pub async fn list_matches(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> Result<Json<Vec<Match>>, ApiError> {
    state
        .manager
        .list_matches(tournament_id)
        .await
        .map(Json)
        .map_err(|e| api_error("list_matches", e))
}

pub async fn get_match(
    State(state): State<AppState>,
    Path((tournament_id, match_id)): Path<(TournamentId, MatchId)>,
) -> Result<Json<Match>, ApiError> {
    state
        .manager
        .get_match(tournament_id, match_id)
        .await
        .map(Json)
        .map_err(|e| api_error("get_match", e))
}

/// Move a scheduled match with both participants to in progress.
pub async fn start_match(
    State(state): State<AppState>,
    Path((tournament_id, match_id)): Path<(TournamentId, MatchId)>,
) -> Result<Json<MatchOutcome>, ApiError> {
    state
        .manager
        .start_match(tournament_id, match_id)
        .await
        .map(Json)
        .map_err(|e| api_error("start_match", e))
}

/// Record scores and winner, then advance the winner.
pub async fn submit_result(
    State(state): State<AppState>,
    Path((tournament_id, match_id)): Path<(TournamentId, MatchId)>,
    Json(report): Json<ScoreReport>,
) -> Result<Json<MatchOutcome>, ApiError> {
    let outcome = state
        .manager
        .submit_result(tournament_id, match_id, report)
        .await
        .map_err(|e| api_error("submit_result", e))?;

    metrics::match_results_total();
    if outcome.tournament_status == TournamentStatus::Completed && outcome.match_info.is_final() {
        metrics::tournaments_completed_total();
        tracing::info!(tournament_id = %tournament_id, "Tournament completed");
    }

    Ok(Json(outcome))
}

pub async fn cancel_match(
    State(state): State<AppState>,
    Path((tournament_id, match_id)): Path<(TournamentId, MatchId)>,
) -> Result<Json<MatchOutcome>, ApiError> {
    state
        .manager
        .cancel_match(tournament_id, match_id)
        .await
        .map(Json)
        .map_err(|e| api_error("cancel_match", e))
}

/// Re-run advancement for a resolved match; repeating it changes nothing.
pub async fn advance_match(
    State(state): State<AppState>,
    Path((tournament_id, match_id)): Path<(TournamentId, MatchId)>,
) -> Result<Json<MatchOutcome>, ApiError> {
    state
        .manager
        .advance_match(tournament_id, match_id)
        .await
        .map(Json)
        .map_err(|e| api_error("advance_match", e))
}
