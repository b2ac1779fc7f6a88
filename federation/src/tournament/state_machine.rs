//! Match lifecycle transitions.
//!
//! ```text
//! scheduled ──start──▶ in_progress ──result──▶ completed
//!     │                    │
//!     └──────cancel────────┴──────────────────▶ cancelled
//!
//! bye: terminal, entered only when the bracket is generated
//! ```
//!
//! Every transition validates before it mutates, so a rejected call leaves the
//! match exactly as it was.

use super::{
    errors::{TournamentError, TournamentResult},
    models::{Match, MatchStatus, ScoreReport},
};
use chrono::{DateTime, Utc};

impl Match {
    /// scheduled → in_progress
    pub fn start(&mut self, now: DateTime<Utc>) -> TournamentResult<()> {
        if self.status != MatchStatus::Scheduled {
            return Err(TournamentError::InvalidTransition {
                action: "start",
                from: self.status,
            });
        }
        if !self.has_both_participants() {
            return Err(TournamentError::ParticipantsNotSet(self.id));
        }

        self.status = MatchStatus::InProgress;
        self.started_at = Some(now);
        Ok(())
    }

    /// scheduled | in_progress → completed
    pub fn record_result(
        &mut self,
        report: &ScoreReport,
        now: DateTime<Utc>,
    ) -> TournamentResult<()> {
        if !self.status.is_open() {
            return Err(TournamentError::InvalidTransition {
                action: "report a result for",
                from: self.status,
            });
        }
        if !self.has_both_participants() {
            return Err(TournamentError::ParticipantsNotSet(self.id));
        }
        if report.participant1_score < 0 || report.participant2_score < 0 {
            return Err(TournamentError::Validation(format!(
                "scores must not be negative, got {}-{}",
                report.participant1_score, report.participant2_score
            )));
        }
        if !self.involves(report.winner_id) {
            return Err(TournamentError::InvalidWinner {
                winner_id: report.winner_id,
            });
        }

        self.status = MatchStatus::Completed;
        self.winner_id = Some(report.winner_id);
        self.participant1_score = Some(report.participant1_score);
        self.participant2_score = Some(report.participant2_score);
        self.score = Some(format!(
            "{}-{}",
            report.participant1_score, report.participant2_score
        ));
        self.started_at.get_or_insert(now);
        self.completed_at = Some(now);
        Ok(())
    }

    /// scheduled | in_progress → cancelled
    pub fn cancel(&mut self, now: DateTime<Utc>) -> TournamentResult<()> {
        if !self.status.is_open() {
            return Err(TournamentError::InvalidTransition {
                action: "cancel",
                from: self.status,
            });
        }

        self.status = MatchStatus::Cancelled;
        self.completed_at = Some(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tournament::models::ParticipantId;
    use uuid::Uuid;

    fn ready_match() -> (Match, ParticipantId, ParticipantId) {
        let (p1, p2) = (Uuid::new_v4(), Uuid::new_v4());
        let m = Match {
            id: Uuid::new_v4(),
            tournament_id: Uuid::new_v4(),
            round: 1,
            match_number: 1,
            bracket_position: 1,
            participant1_id: Some(p1),
            participant2_id: Some(p2),
            winner_id: None,
            status: MatchStatus::Scheduled,
            score: None,
            participant1_score: None,
            participant2_score: None,
            next_match_id: Some(Uuid::new_v4()),
            is_bye: false,
            started_at: None,
            completed_at: None,
        };
        (m, p1, p2)
    }

    fn report(winner_id: ParticipantId, s1: i32, s2: i32) -> ScoreReport {
        ScoreReport {
            participant1_score: s1,
            participant2_score: s2,
            winner_id,
        }
    }

    #[test]
    fn test_start_then_complete() {
        let (mut m, _, p2) = ready_match();
        let now = Utc::now();

        m.start(now).unwrap();
        assert_eq!(m.status, MatchStatus::InProgress);
        assert_eq!(m.started_at, Some(now));

        m.record_result(&report(p2, 1, 3), now).unwrap();
        assert_eq!(m.status, MatchStatus::Completed);
        assert_eq!(m.winner_id, Some(p2));
        assert_eq!(m.score.as_deref(), Some("1-3"));
        assert_eq!(m.participant2_score, Some(3));
    }

    #[test]
    fn test_direct_reporting_from_scheduled() {
        let (mut m, p1, _) = ready_match();
        m.record_result(&report(p1, 2, 0), Utc::now()).unwrap();
        assert_eq!(m.status, MatchStatus::Completed);
        assert!(m.started_at.is_some());
    }

    #[test]
    fn test_start_twice_is_invalid() {
        let (mut m, _, _) = ready_match();
        m.start(Utc::now()).unwrap();

        let err = m.start(Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            TournamentError::InvalidTransition {
                from: MatchStatus::InProgress,
                ..
            }
        ));
    }

    #[test]
    fn test_completing_completed_match_is_invalid() {
        let (mut m, p1, _) = ready_match();
        m.record_result(&report(p1, 2, 1), Utc::now()).unwrap();

        let err = m.record_result(&report(p1, 2, 1), Utc::now()).unwrap_err();
        assert!(matches!(err, TournamentError::InvalidTransition { .. }));
    }

    #[test]
    fn test_invalid_winner_leaves_match_unchanged() {
        let (mut m, _, _) = ready_match();
        let before = m.clone();

        let err = m
            .record_result(&report(Uuid::new_v4(), 2, 1), Utc::now())
            .unwrap_err();
        assert!(matches!(err, TournamentError::InvalidWinner { .. }));
        assert_eq!(m, before);
    }

    #[test]
    fn test_negative_score_rejected() {
        let (mut m, p1, _) = ready_match();
        let err = m.record_result(&report(p1, -1, 0), Utc::now()).unwrap_err();
        assert!(matches!(err, TournamentError::Validation(_)));
        assert_eq!(m.status, MatchStatus::Scheduled);
    }

    #[test]
    fn test_unresolved_slots_block_play() {
        let (mut m, p1, _) = ready_match();
        m.participant2_id = None;

        assert!(matches!(
            m.start(Utc::now()),
            Err(TournamentError::ParticipantsNotSet(_))
        ));
        assert!(matches!(
            m.record_result(&report(p1, 1, 0), Utc::now()),
            Err(TournamentError::ParticipantsNotSet(_))
        ));
    }

    #[test]
    fn test_cancel_from_open_states_only() {
        let (mut m, _, _) = ready_match();
        m.start(Utc::now()).unwrap();
        m.cancel(Utc::now()).unwrap();
        assert_eq!(m.status, MatchStatus::Cancelled);
        assert!(m.winner_id.is_none());

        let (mut done, p1, _) = ready_match();
        done.record_result(&report(p1, 1, 0), Utc::now()).unwrap();
        assert!(done.cancel(Utc::now()).is_err());
    }

    #[test]
    fn test_bye_is_terminal() {
        let (mut m, p1, _) = ready_match();
        m.participant2_id = None;
        m.status = MatchStatus::Bye;
        m.is_bye = true;
        m.winner_id = Some(p1);

        assert!(m.start(Utc::now()).is_err());
        assert!(m.cancel(Utc::now()).is_err());
        assert!(m.record_result(&report(p1, 1, 0), Utc::now()).is_err());
    }
}
