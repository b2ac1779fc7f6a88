//! Participant roster API handlers.
//!
//! Registration is open while the tournament is upcoming and has no bracket.
//! Once the bracket exists the roster is locked: only notes remain editable.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use federation::tournament::{
    NewParticipant, Participant, ParticipantId, ParticipantUpdate, TournamentId,
};

use super::{ApiError, AppState, api_error};
use crate::metrics;

/// Register a federation member for a tournament.
///
/// Returns `201 Created`, or `409 Conflict` when the member is already on the
/// roster, the tournament is full or the roster is locked.
pub async fn register_participant(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
    Json(request): Json<NewParticipant>,
) -> Result<(StatusCode, Json<Participant>), ApiError> {
    let participant = state
        .manager
        .register_participant(tournament_id, request)
        .await
        .map_err(|e| api_error("register_participant", e))?;

    metrics::participants_registered_total();

    Ok((StatusCode::CREATED, Json(participant)))
}

/// Full roster in registration order, withdrawn participants included.
pub async fn list_participants(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> Result<Json<Vec<Participant>>, ApiError> {
    state
        .manager
        .list_participants(tournament_id)
        .await
        .map(Json)
        .map_err(|e| api_error("list_participants", e))
}

pub async fn get_participant(
    State(state): State<AppState>,
    Path((tournament_id, participant_id)): Path<(TournamentId, ParticipantId)>,
) -> Result<Json<Participant>, ApiError> {
    state
        .manager
        .get_participant(tournament_id, participant_id)
        .await
        .map(Json)
        .map_err(|e| api_error("get_participant", e))
}

pub async fn update_participant(
    State(state): State<AppState>,
    Path((tournament_id, participant_id)): Path<(TournamentId, ParticipantId)>,
    Json(update): Json<ParticipantUpdate>,
) -> Result<Json<Participant>, ApiError> {
    state
        .manager
        .update_participant(tournament_id, participant_id, update)
        .await
        .map(Json)
        .map_err(|e| api_error("update_participant", e))
}

/// Delete the registration and return it.
pub async fn remove_participant(
    State(state): State<AppState>,
    Path((tournament_id, participant_id)): Path<(TournamentId, ParticipantId)>,
) -> Result<Json<Participant>, ApiError> {
    state
        .manager
        .remove_participant(tournament_id, participant_id)
        .await
        .map(Json)
        .map_err(|e| api_error("remove_participant", e))
}

/// Mark the participant withdrawn, keeping the registration on record.
pub async fn withdraw_participant(
    State(state): State<AppState>,
    Path((tournament_id, participant_id)): Path<(TournamentId, ParticipantId)>,
) -> Result<Json<Participant>, ApiError> {
    state
        .manager
        .withdraw_participant(tournament_id, participant_id)
        .await
        .map(Json)
        .map_err(|e| api_error("withdraw_participant", e))
}
