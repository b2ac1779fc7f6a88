//! Participant registry operations.

use super::{
    aggregate::TournamentAggregate,
    errors::{TournamentError, TournamentResult},
    models::{
        NewParticipant, Participant, ParticipantId, ParticipantStatus, ParticipantUpdate,
        TournamentStatus,
    },
};
use chrono::{DateTime, Utc};
use log::{info, warn};
use uuid::Uuid;

/// Largest seed that fits the stored column
pub const MAX_SEED: u32 = i32::MAX as u32;

fn validate_seed(seed: Option<u32>) -> TournamentResult<()> {
    match seed {
        Some(0) => Err(TournamentError::Validation(
            "seed must be 1 or greater".to_string(),
        )),
        Some(seed) if seed > MAX_SEED => Err(TournamentError::Validation(format!(
            "seed must be at most {MAX_SEED}"
        ))),
        _ => Ok(()),
    }
}

fn normalize_notes(notes: Option<String>) -> Option<String> {
    notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
}

impl TournamentAggregate {
    /// Registered and confirmed participants
    pub fn count_active(&self) -> u32 {
        self.participants.iter().filter(|p| p.is_active()).count() as u32
    }

    pub fn participant(&self, participant_id: ParticipantId) -> TournamentResult<&Participant> {
        self.participants
            .iter()
            .find(|p| p.id == participant_id)
            .ok_or(TournamentError::ParticipantNotFound(participant_id))
    }

    fn participant_index(&self, participant_id: ParticipantId) -> TournamentResult<usize> {
        self.participants
            .iter()
            .position(|p| p.id == participant_id)
            .ok_or(TournamentError::ParticipantNotFound(participant_id))
    }

    fn ensure_roster_unlocked(&self) -> TournamentResult<()> {
        if self.has_bracket() {
            warn!(
                "Roster change rejected for tournament {}: bracket exists",
                self.tournament.id
            );
            return Err(TournamentError::TournamentLocked);
        }
        Ok(())
    }

    fn ensure_capacity(&self) -> TournamentResult<()> {
        if self.count_active() >= self.tournament.max_participants {
            return Err(TournamentError::CapacityExceeded {
                capacity: self.tournament.max_participants,
            });
        }
        Ok(())
    }

    fn sync_participant_count(&mut self, now: DateTime<Utc>) {
        self.tournament.current_participants = self.count_active();
        self.tournament.updated_at = now;
    }

    pub(super) fn register(
        &mut self,
        request: NewParticipant,
        now: DateTime<Utc>,
    ) -> TournamentResult<Participant> {
        validate_seed(request.seed)?;

        if self.tournament.status.is_finished() {
            return Err(TournamentError::StateConflict {
                status: self.tournament.status,
                reason: "registration is closed",
            });
        }
        self.ensure_roster_unlocked()?;

        if self
            .participants
            .iter()
            .any(|p| p.member_id == request.member_id)
        {
            return Err(TournamentError::AlreadyRegistered {
                member_id: request.member_id,
            });
        }
        self.ensure_capacity()?;

        let participant = Participant {
            id: Uuid::new_v4(),
            tournament_id: self.tournament.id,
            member_id: request.member_id,
            status: ParticipantStatus::Registered,
            seed: request.seed,
            notes: normalize_notes(request.notes),
            registered_at: now,
        };
        self.participants.push(participant.clone());
        self.sync_participant_count(now);

        info!(
            "Member {} registered for tournament {} ({}/{})",
            participant.member_id,
            self.tournament.id,
            self.tournament.current_participants,
            self.tournament.max_participants
        );

        Ok(participant)
    }

    pub(super) fn update_participant(
        &mut self,
        participant_id: ParticipantId,
        update: ParticipantUpdate,
        now: DateTime<Utc>,
    ) -> TournamentResult<Participant> {
        validate_seed(update.seed.flatten())?;
        let index = self.participant_index(participant_id)?;
        let current = &self.participants[index];

        let status_change = update.status.filter(|s| *s != current.status);
        let seed_change = update.seed.filter(|s| *s != current.seed);
        if status_change.is_some() || seed_change.is_some() {
            self.ensure_roster_unlocked()?;
        }
        if status_change.is_some_and(|s| s.is_active()) && !current.status.is_active() {
            self.ensure_capacity()?;
        }

        let participant = &mut self.participants[index];
        if let Some(status) = status_change {
            participant.status = status;
        }
        if let Some(seed) = seed_change {
            participant.seed = seed;
        }
        if update.notes.is_some() {
            participant.notes = normalize_notes(update.notes);
        }
        let updated = participant.clone();
        self.sync_participant_count(now);

        Ok(updated)
    }

    pub(super) fn withdraw(
        &mut self,
        participant_id: ParticipantId,
        now: DateTime<Utc>,
    ) -> TournamentResult<Participant> {
        let index = self.participant_index(participant_id)?;
        self.ensure_roster_unlocked()?;

        let participant = &mut self.participants[index];
        participant.status = ParticipantStatus::Withdrawn;
        let withdrawn = participant.clone();
        self.sync_participant_count(now);

        info!(
            "Participant {} withdrew from tournament {}",
            participant_id, self.tournament.id
        );

        Ok(withdrawn)
    }

    pub(super) fn remove(
        &mut self,
        participant_id: ParticipantId,
        now: DateTime<Utc>,
    ) -> TournamentResult<Participant> {
        let index = self.participant_index(participant_id)?;
        self.ensure_roster_unlocked()?;

        let removed = self.participants.remove(index);
        self.sync_participant_count(now);

        info!(
            "Participant {} removed from tournament {}",
            participant_id, self.tournament.id
        );

        Ok(removed)
    }

    /// Whether the roster still accepts registrations
    pub fn is_open_for_registration(&self) -> bool {
        self.tournament.status == TournamentStatus::Upcoming
            && !self.has_bracket()
            && self.count_active() < self.tournament.max_participants
    }
}
