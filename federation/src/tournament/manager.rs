//! Tournament manager for creating tournaments and running their brackets.

use super::{
    aggregate::{MatchOutcome, TournamentCommand},
    bracket::{MAX_PARTICIPANTS, MIN_PARTICIPANTS},
    errors::{TournamentError, TournamentResult},
    models::{
        BracketView, Match, MatchId, NewParticipant, NewTournament, Participant, ParticipantId,
        ParticipantUpdate, ScoreReport, SeedingPolicy, Tournament, TournamentId,
        TournamentStatus, timestamp_now,
    },
};
use crate::db::{MemoryTournamentRepository, PgTournamentRepository, TournamentRepository};
use log::info;
use sqlx::PgPool;
use std::sync::Arc;

/// Longest accepted tournament name, in characters
pub const MAX_NAME_LENGTH: usize = 200;

/// Tournament manager
#[derive(Clone)]
pub struct TournamentManager {
    repository: Arc<dyn TournamentRepository>,
}

impl TournamentManager {
    /// Create a manager over any repository
    pub fn new(repository: Arc<dyn TournamentRepository>) -> Self {
        Self { repository }
    }

    /// Create a manager backed by PostgreSQL
    pub fn with_pool(pool: Arc<PgPool>) -> Self {
        Self::new(Arc::new(PgTournamentRepository::new(pool)))
    }

    /// Create a manager backed by in-process storage
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryTournamentRepository::new()))
    }

    pub fn repository(&self) -> &Arc<dyn TournamentRepository> {
        &self.repository
    }

    /// Check that storage is reachable
    pub async fn health_check(&self) -> TournamentResult<()> {
        self.repository.health_check().await
    }

    /// Create a new tournament
    ///
    /// # Errors
    ///
    /// * `TournamentError::Validation` - Empty or overlong name, fewer than
    ///   two places or more than `MAX_PARTICIPANTS`
    pub async fn create_tournament(&self, request: NewTournament) -> TournamentResult<Tournament> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(TournamentError::Validation(
                "tournament name must not be empty".to_string(),
            ));
        }
        if name.chars().count() > MAX_NAME_LENGTH {
            return Err(TournamentError::Validation(format!(
                "tournament name must be at most {MAX_NAME_LENGTH} characters"
            )));
        }
        if (request.max_participants as usize) < MIN_PARTICIPANTS {
            return Err(TournamentError::Validation(format!(
                "max_participants must be at least {MIN_PARTICIPANTS}"
            )));
        }
        if request.max_participants > MAX_PARTICIPANTS {
            return Err(TournamentError::Validation(format!(
                "max_participants must be at most {MAX_PARTICIPANTS}"
            )));
        }

        let tournament = Tournament::new(request, timestamp_now());
        self.repository.insert_tournament(&tournament).await?;

        info!(
            "Created tournament {} '{}' for {} participants",
            tournament.id, tournament.name, tournament.max_participants
        );

        Ok(tournament)
    }

    /// Get a tournament
    pub async fn get_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Tournament> {
        self.repository
            .find_tournament(tournament_id)
            .await?
            .ok_or(TournamentError::TournamentNotFound(tournament_id))
    }

    /// List tournaments, optionally only those with the given status
    pub async fn list_tournaments(
        &self,
        status: Option<TournamentStatus>,
    ) -> TournamentResult<Vec<Tournament>> {
        self.repository.list_tournaments(status).await
    }

    /// Cancel a tournament and every match still open
    pub async fn cancel_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Tournament> {
        self.repository
            .execute(tournament_id, TournamentCommand::CancelTournament)
            .await?
            .into_tournament()
    }

    /// Register a member for a tournament
    ///
    /// # Errors
    ///
    /// * `TournamentError::AlreadyRegistered` - Member already on the roster
    /// * `TournamentError::CapacityExceeded` - No free place
    /// * `TournamentError::TournamentLocked` - Bracket already generated
    pub async fn register_participant(
        &self,
        tournament_id: TournamentId,
        request: NewParticipant,
    ) -> TournamentResult<Participant> {
        self.repository
            .execute(tournament_id, TournamentCommand::Register(request))
            .await?
            .into_participant()
    }

    pub async fn list_participants(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Vec<Participant>> {
        Ok(self.repository.load_aggregate(tournament_id).await?.participants)
    }

    pub async fn get_participant(
        &self,
        tournament_id: TournamentId,
        participant_id: ParticipantId,
    ) -> TournamentResult<Participant> {
        let aggregate = self.repository.load_aggregate(tournament_id).await?;
        aggregate.participant(participant_id).cloned()
    }

    /// Apply an organizer edit to a participant
    pub async fn update_participant(
        &self,
        tournament_id: TournamentId,
        participant_id: ParticipantId,
        update: ParticipantUpdate,
    ) -> TournamentResult<Participant> {
        self.repository
            .execute(
                tournament_id,
                TournamentCommand::UpdateParticipant {
                    participant_id,
                    update,
                },
            )
            .await?
            .into_participant()
    }

    /// Withdraw a participant, keeping the registration on record
    pub async fn withdraw_participant(
        &self,
        tournament_id: TournamentId,
        participant_id: ParticipantId,
    ) -> TournamentResult<Participant> {
        self.repository
            .execute(tournament_id, TournamentCommand::Withdraw(participant_id))
            .await?
            .into_participant()
    }

    /// Delete a registration
    pub async fn remove_participant(
        &self,
        tournament_id: TournamentId,
        participant_id: ParticipantId,
    ) -> TournamentResult<Participant> {
        self.repository
            .execute(tournament_id, TournamentCommand::Remove(participant_id))
            .await?
            .into_participant()
    }

    /// Number of registered and confirmed participants
    pub async fn count_active(&self, tournament_id: TournamentId) -> TournamentResult<u32> {
        Ok(self
            .repository
            .load_aggregate(tournament_id)
            .await?
            .count_active())
    }

    /// Build the bracket and start the tournament
    ///
    /// # Errors
    ///
    /// * `TournamentError::BracketAlreadyExists` - Called a second time
    /// * `TournamentError::InsufficientParticipants` - Fewer than two active
    ///   participants
    pub async fn generate_bracket(
        &self,
        tournament_id: TournamentId,
        policy: SeedingPolicy,
    ) -> TournamentResult<Vec<Match>> {
        self.repository
            .execute(tournament_id, TournamentCommand::GenerateBracket { policy })
            .await?
            .into_bracket()
    }

    pub async fn get_bracket(&self, tournament_id: TournamentId) -> TournamentResult<BracketView> {
        Ok(self
            .repository
            .load_aggregate(tournament_id)
            .await?
            .bracket_view())
    }

    pub async fn list_matches(&self, tournament_id: TournamentId) -> TournamentResult<Vec<Match>> {
        Ok(self.repository.load_aggregate(tournament_id).await?.matches)
    }

    pub async fn get_match(
        &self,
        tournament_id: TournamentId,
        match_id: MatchId,
    ) -> TournamentResult<Match> {
        let aggregate = self.repository.load_aggregate(tournament_id).await?;
        aggregate.find_match(match_id).cloned()
    }

    pub async fn start_match(
        &self,
        tournament_id: TournamentId,
        match_id: MatchId,
    ) -> TournamentResult<MatchOutcome> {
        self.repository
            .execute(tournament_id, TournamentCommand::StartMatch(match_id))
            .await?
            .into_match()
    }

    /// Record a match result and advance its winner
    pub async fn submit_result(
        &self,
        tournament_id: TournamentId,
        match_id: MatchId,
        report: ScoreReport,
    ) -> TournamentResult<MatchOutcome> {
        self.repository
            .execute(
                tournament_id,
                TournamentCommand::SubmitResult { match_id, report },
            )
            .await?
            .into_match()
    }

    pub async fn cancel_match(
        &self,
        tournament_id: TournamentId,
        match_id: MatchId,
    ) -> TournamentResult<MatchOutcome> {
        self.repository
            .execute(tournament_id, TournamentCommand::CancelMatch(match_id))
            .await?
            .into_match()
    }

    /// Re-run advancement for a resolved match; a no-op when already applied
    pub async fn advance_match(
        &self,
        tournament_id: TournamentId,
        match_id: MatchId,
    ) -> TournamentResult<MatchOutcome> {
        self.repository
            .execute(tournament_id, TournamentCommand::Advance(match_id))
            .await?
            .into_match()
    }
}
