//! Tournament aggregate and the commands that mutate it.
//!
//! A tournament, its participants and its matches change together. Storage
//! loads the aggregate under the tournament's lock, applies one command with
//! [`TournamentAggregate::execute`] and persists the result atomically, so a
//! rejected command never leaves partial writes behind.

use super::{
    advancement::{Advancement, advance_winner},
    bracket,
    errors::{TournamentError, TournamentResult},
    models::{
        BracketRound, BracketView, Match, MatchId, MatchStatus, NewParticipant, Participant,
        ParticipantId, ParticipantUpdate, ScoreReport, SeedingPolicy, Tournament,
        TournamentStatus,
    },
};
use chrono::{DateTime, Utc};
use log::{info, warn};
use rand::{SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};

/// Tournament with its roster and bracket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentAggregate {
    pub tournament: Tournament,
    pub participants: Vec<Participant>,
    /// Bracket arena ordered by round, then match number
    pub matches: Vec<Match>,
}

/// Mutation applied to one tournament
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TournamentCommand {
    Register(NewParticipant),
    UpdateParticipant {
        participant_id: ParticipantId,
        update: ParticipantUpdate,
    },
    Withdraw(ParticipantId),
    Remove(ParticipantId),
    GenerateBracket { policy: SeedingPolicy },
    StartMatch(MatchId),
    SubmitResult {
        match_id: MatchId,
        report: ScoreReport,
    },
    CancelMatch(MatchId),
    /// Re-run advancement for an already resolved match
    Advance(MatchId),
    CancelTournament,
}

impl TournamentCommand {
    /// Short name for logs and metrics labels
    pub fn name(&self) -> &'static str {
        match self {
            TournamentCommand::Register(_) => "register",
            TournamentCommand::UpdateParticipant { .. } => "update_participant",
            TournamentCommand::Withdraw(_) => "withdraw",
            TournamentCommand::Remove(_) => "remove",
            TournamentCommand::GenerateBracket { .. } => "generate_bracket",
            TournamentCommand::StartMatch(_) => "start_match",
            TournamentCommand::SubmitResult { .. } => "submit_result",
            TournamentCommand::CancelMatch(_) => "cancel_match",
            TournamentCommand::Advance(_) => "advance",
            TournamentCommand::CancelTournament => "cancel_tournament",
        }
    }
}

/// Match after a transition, with what it did to the bracket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchOutcome {
    #[serde(rename = "match")]
    pub match_info: Match,
    pub advancement: Option<Advancement>,
    pub tournament_status: TournamentStatus,
}

/// Result of a successfully executed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Participant(Participant),
    Bracket(Vec<Match>),
    Match(MatchOutcome),
    Tournament(Tournament),
}

impl CommandOutcome {
    fn unexpected(self, wanted: &str) -> TournamentError {
        TournamentError::Internal(format!("expected {wanted} outcome, got {self:?}"))
    }

    pub fn into_participant(self) -> TournamentResult<Participant> {
        match self {
            CommandOutcome::Participant(p) => Ok(p),
            other => Err(other.unexpected("participant")),
        }
    }

    pub fn into_bracket(self) -> TournamentResult<Vec<Match>> {
        match self {
            CommandOutcome::Bracket(matches) => Ok(matches),
            other => Err(other.unexpected("bracket")),
        }
    }

    pub fn into_match(self) -> TournamentResult<MatchOutcome> {
        match self {
            CommandOutcome::Match(outcome) => Ok(outcome),
            other => Err(other.unexpected("match")),
        }
    }

    pub fn into_tournament(self) -> TournamentResult<Tournament> {
        match self {
            CommandOutcome::Tournament(t) => Ok(t),
            other => Err(other.unexpected("tournament")),
        }
    }
}

impl TournamentAggregate {
    /// Aggregate of a freshly created tournament
    pub fn new(tournament: Tournament) -> Self {
        Self {
            tournament,
            participants: Vec::new(),
            matches: Vec::new(),
        }
    }

    pub fn has_bracket(&self) -> bool {
        !self.matches.is_empty()
    }

    pub fn find_match(&self, match_id: MatchId) -> TournamentResult<&Match> {
        self.matches
            .iter()
            .find(|m| m.id == match_id)
            .ok_or(TournamentError::MatchNotFound(match_id))
    }

    fn match_index(&self, match_id: MatchId) -> TournamentResult<usize> {
        self.matches
            .iter()
            .position(|m| m.id == match_id)
            .ok_or(TournamentError::MatchNotFound(match_id))
    }

    fn ensure_active(&self, reason: &'static str) -> TournamentResult<()> {
        if self.tournament.status != TournamentStatus::Active {
            return Err(TournamentError::StateConflict {
                status: self.tournament.status,
                reason,
            });
        }
        Ok(())
    }

    /// Apply a command in place.
    ///
    /// Callers that need all-or-nothing semantics run this on a copy and keep
    /// the copy only on success.
    pub fn execute(
        &mut self,
        command: TournamentCommand,
        now: DateTime<Utc>,
    ) -> TournamentResult<CommandOutcome> {
        match command {
            TournamentCommand::Register(request) => {
                self.register(request, now).map(CommandOutcome::Participant)
            }
            TournamentCommand::UpdateParticipant {
                participant_id,
                update,
            } => self
                .update_participant(participant_id, update, now)
                .map(CommandOutcome::Participant),
            TournamentCommand::Withdraw(participant_id) => self
                .withdraw(participant_id, now)
                .map(CommandOutcome::Participant),
            TournamentCommand::Remove(participant_id) => self
                .remove(participant_id, now)
                .map(CommandOutcome::Participant),
            TournamentCommand::GenerateBracket { policy } => self
                .generate_bracket(policy, now)
                .map(CommandOutcome::Bracket),
            TournamentCommand::StartMatch(match_id) => {
                self.start_match(match_id, now).map(CommandOutcome::Match)
            }
            TournamentCommand::SubmitResult { match_id, report } => self
                .submit_result(match_id, &report, now)
                .map(CommandOutcome::Match),
            TournamentCommand::CancelMatch(match_id) => {
                self.cancel_match(match_id, now).map(CommandOutcome::Match)
            }
            TournamentCommand::Advance(match_id) => {
                self.advance(match_id, now).map(CommandOutcome::Match)
            }
            TournamentCommand::CancelTournament => {
                self.cancel(now).map(CommandOutcome::Tournament)
            }
        }
    }

    fn generate_bracket(
        &mut self,
        policy: SeedingPolicy,
        now: DateTime<Utc>,
    ) -> TournamentResult<Vec<Match>> {
        if self.has_bracket() {
            return Err(TournamentError::BracketAlreadyExists);
        }
        if self.tournament.status != TournamentStatus::Upcoming {
            return Err(TournamentError::StateConflict {
                status: self.tournament.status,
                reason: "bracket can only be generated for an upcoming tournament",
            });
        }

        let mut rng = StdRng::seed_from_u64(self.tournament.shuffle_seed());
        let matches = bracket::generate(
            &self.tournament,
            &self.participants,
            policy,
            &mut rng,
            now,
        )?;

        self.matches = matches.clone();
        self.tournament.status = TournamentStatus::Active;
        self.tournament.seeding_policy = Some(policy);
        self.tournament.started_at = Some(now);
        self.tournament.current_participants = self.count_active();
        self.tournament.updated_at = now;

        info!(
            "Generated {} matches for tournament {} ({} participants, {} byes, {} seeding)",
            matches.len(),
            self.tournament.id,
            self.tournament.current_participants,
            matches.iter().filter(|m| m.is_bye).count(),
            policy
        );

        Ok(matches)
    }

    fn match_outcome(&self, index: usize, advancement: Option<Advancement>) -> MatchOutcome {
        MatchOutcome {
            match_info: self.matches[index].clone(),
            advancement,
            tournament_status: self.tournament.status,
        }
    }

    fn start_match(
        &mut self,
        match_id: MatchId,
        now: DateTime<Utc>,
    ) -> TournamentResult<MatchOutcome> {
        let index = self.match_index(match_id)?;
        self.ensure_active("matches can only be started in an active tournament")?;

        self.matches[index].start(now)?;
        self.tournament.updated_at = now;

        Ok(self.match_outcome(index, None))
    }

    fn submit_result(
        &mut self,
        match_id: MatchId,
        report: &ScoreReport,
        now: DateTime<Utc>,
    ) -> TournamentResult<MatchOutcome> {
        let index = self.match_index(match_id)?;
        self.ensure_active("results can only be reported in an active tournament")?;

        self.matches[index].record_result(report, now)?;
        self.tournament.updated_at = now;
        let advancement = self.apply_advancement(index, now)?;

        info!(
            "Match {} of tournament {} won by {} ({})",
            match_id,
            self.tournament.id,
            report.winner_id,
            self.matches[index].score.as_deref().unwrap_or("-")
        );

        Ok(self.match_outcome(index, Some(advancement)))
    }

    fn cancel_match(
        &mut self,
        match_id: MatchId,
        now: DateTime<Utc>,
    ) -> TournamentResult<MatchOutcome> {
        let index = self.match_index(match_id)?;

        self.matches[index].cancel(now)?;
        self.tournament.updated_at = now;
        warn!(
            "Match {} of tournament {} cancelled, its bracket branch will not advance",
            match_id, self.tournament.id
        );

        Ok(self.match_outcome(index, None))
    }

    fn advance(&mut self, match_id: MatchId, now: DateTime<Utc>) -> TournamentResult<MatchOutcome> {
        let index = self.match_index(match_id)?;
        if self.tournament.status == TournamentStatus::Cancelled {
            return Err(TournamentError::StateConflict {
                status: self.tournament.status,
                reason: "a cancelled bracket does not advance",
            });
        }
        if !self.matches[index].status.is_resolved() {
            return Err(TournamentError::InvalidTransition {
                action: "advance",
                from: self.matches[index].status,
            });
        }

        let advancement = self.apply_advancement(index, now)?;
        Ok(self.match_outcome(index, Some(advancement)))
    }

    /// Propagate the winner of a resolved match, completing the tournament
    /// when the final is decided.
    fn apply_advancement(
        &mut self,
        index: usize,
        now: DateTime<Utc>,
    ) -> TournamentResult<Advancement> {
        let advancement = advance_winner(&mut self.matches, index)?;

        match advancement {
            Advancement::Placed { .. } => self.tournament.updated_at = now,
            Advancement::Champion { winner_id }
                if self.tournament.status != TournamentStatus::Completed =>
            {
                self.tournament.status = TournamentStatus::Completed;
                self.tournament.completed_at = Some(now);
                self.tournament.updated_at = now;
                info!(
                    "Tournament {} completed, champion {}",
                    self.tournament.id, winner_id
                );
            }
            _ => {}
        }

        Ok(advancement)
    }

    fn cancel(&mut self, now: DateTime<Utc>) -> TournamentResult<Tournament> {
        if self.tournament.status.is_finished() {
            return Err(TournamentError::StateConflict {
                status: self.tournament.status,
                reason: "tournament already finished",
            });
        }

        let mut cancelled_matches = 0;
        for m in self.matches.iter_mut().filter(|m| m.status.is_open()) {
            m.cancel(now)?;
            cancelled_matches += 1;
        }
        self.tournament.status = TournamentStatus::Cancelled;
        self.tournament.updated_at = now;

        info!(
            "Tournament {} cancelled ({} open matches cancelled)",
            self.tournament.id, cancelled_matches
        );

        Ok(self.tournament.clone())
    }

    /// Matches grouped by round, with the champion once decided
    pub fn bracket_view(&self) -> BracketView {
        let bracket_size = if self.has_bracket() {
            self.matches.len() + 1
        } else {
            0
        };

        let mut rounds: Vec<BracketRound> = Vec::new();
        for m in &self.matches {
            match rounds.last_mut() {
                Some(round) if round.round == m.round => round.matches.push(m.clone()),
                _ => rounds.push(BracketRound {
                    round: m.round,
                    matches: vec![m.clone()],
                }),
            }
        }

        let champion = self
            .matches
            .iter()
            .find(|m| m.is_final() && m.status == MatchStatus::Completed)
            .and_then(|m| m.winner_id);

        BracketView {
            tournament_id: self.tournament.id,
            status: self.tournament.status,
            bracket_size,
            rounds,
            champion,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tournament::{
        advancement::Slot,
        models::{NewTournament, TournamentFormat},
    };

    fn aggregate_with(n: i64) -> TournamentAggregate {
        let mut agg = TournamentAggregate::new(Tournament::new(
            NewTournament {
                name: "Aggregate".to_string(),
                max_participants: 16,
                tournament_format: TournamentFormat::SingleElimination,
            },
            Utc::now(),
        ));
        for member_id in 1..=n {
            agg.execute(
                TournamentCommand::Register(NewParticipant {
                    member_id,
                    seed: Some(member_id as u32),
                    notes: None,
                }),
                Utc::now(),
            )
            .unwrap();
        }
        agg
    }

    fn generate(agg: &mut TournamentAggregate) -> Vec<Match> {
        agg.execute(
            TournamentCommand::GenerateBracket {
                policy: SeedingPolicy::Ranking,
            },
            Utc::now(),
        )
        .unwrap()
        .into_bracket()
        .unwrap()
    }

    fn win(agg: &mut TournamentAggregate, match_id: MatchId, first: bool) -> MatchOutcome {
        let m = agg.find_match(match_id).unwrap().clone();
        let winner_id = if first {
            m.participant1_id.unwrap()
        } else {
            m.participant2_id.unwrap()
        };
        agg.execute(
            TournamentCommand::SubmitResult {
                match_id,
                report: ScoreReport {
                    participant1_score: 3,
                    participant2_score: 1,
                    winner_id,
                },
            },
            Utc::now(),
        )
        .unwrap()
        .into_match()
        .unwrap()
    }

    #[test]
    fn test_generation_activates_and_locks() {
        let mut agg = aggregate_with(4);
        let matches = generate(&mut agg);

        assert_eq!(matches.len(), 3);
        assert_eq!(agg.tournament.status, TournamentStatus::Active);
        assert_eq!(agg.tournament.seeding_policy, Some(SeedingPolicy::Ranking));
        assert!(agg.tournament.started_at.is_some());

        let err = agg
            .execute(
                TournamentCommand::Register(NewParticipant {
                    member_id: 99,
                    ..Default::default()
                }),
                Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(err, TournamentError::TournamentLocked));

        let err = agg
            .execute(
                TournamentCommand::GenerateBracket {
                    policy: SeedingPolicy::Random,
                },
                Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(err, TournamentError::BracketAlreadyExists));
    }

    #[test]
    fn test_full_bracket_completes_tournament() {
        let mut agg = aggregate_with(4);
        let matches = generate(&mut agg);

        let semi1 = win(&mut agg, matches[0].id, true);
        assert_eq!(
            semi1.advancement,
            Some(Advancement::Placed {
                next_match_id: matches[2].id,
                slot: Slot::Participant1
            })
        );
        win(&mut agg, matches[1].id, false);
        let final_outcome = win(&mut agg, matches[2].id, true);

        assert_eq!(final_outcome.tournament_status, TournamentStatus::Completed);
        assert!(agg.tournament.completed_at.is_some());
        let view = agg.bracket_view();
        assert_eq!(view.bracket_size, 4);
        assert_eq!(view.rounds.len(), 2);
        assert_eq!(view.champion, final_outcome.match_info.winner_id);
    }

    #[test]
    fn test_advance_repeat_is_noop() {
        let mut agg = aggregate_with(4);
        let matches = generate(&mut agg);
        win(&mut agg, matches[0].id, true);
        let before = agg.clone();

        let outcome = agg
            .execute(TournamentCommand::Advance(matches[0].id), Utc::now())
            .unwrap()
            .into_match()
            .unwrap();
        assert!(matches!(
            outcome.advancement,
            Some(Advancement::AlreadyPlaced { .. })
        ));
        assert_eq!(agg.matches, before.matches);
    }

    #[test]
    fn test_advance_unresolved_match_rejected() {
        let mut agg = aggregate_with(4);
        let matches = generate(&mut agg);

        let err = agg
            .execute(TournamentCommand::Advance(matches[0].id), Utc::now())
            .unwrap_err();
        assert!(matches!(err, TournamentError::InvalidTransition { .. }));
    }

    #[test]
    fn test_submit_requires_active_tournament() {
        let mut agg = aggregate_with(4);
        let matches = generate(&mut agg);
        agg.execute(TournamentCommand::CancelTournament, Utc::now())
            .unwrap();

        let m = &matches[0];
        let err = agg
            .execute(
                TournamentCommand::SubmitResult {
                    match_id: m.id,
                    report: ScoreReport {
                        participant1_score: 1,
                        participant2_score: 0,
                        winner_id: m.participant1_id.unwrap(),
                    },
                },
                Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(err, TournamentError::StateConflict { .. }));
    }

    #[test]
    fn test_cancel_tournament_cancels_open_matches() {
        let mut agg = aggregate_with(5);
        generate(&mut agg);

        let tournament = agg
            .execute(TournamentCommand::CancelTournament, Utc::now())
            .unwrap()
            .into_tournament()
            .unwrap();
        assert_eq!(tournament.status, TournamentStatus::Cancelled);
        assert!(agg.matches.iter().all(|m| !m.status.is_open()));
        assert_eq!(
            agg.matches
                .iter()
                .filter(|m| m.status == MatchStatus::Bye)
                .count(),
            3
        );

        let err = agg
            .execute(TournamentCommand::CancelTournament, Utc::now())
            .unwrap_err();
        assert!(matches!(err, TournamentError::StateConflict { .. }));
    }

    #[test]
    fn test_cancelled_match_does_not_advance() {
        let mut agg = aggregate_with(4);
        let matches = generate(&mut agg);

        agg.execute(TournamentCommand::CancelMatch(matches[0].id), Utc::now())
            .unwrap();
        let final_match = agg.find_match(matches[2].id).unwrap();
        assert!(final_match.participant1_id.is_none());
    }

    #[test]
    fn test_unknown_match() {
        let mut agg = aggregate_with(2);
        generate(&mut agg);

        let err = agg
            .execute(
                TournamentCommand::StartMatch(uuid::Uuid::new_v4()),
                Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(err, TournamentError::MatchNotFound(_)));
    }
}
