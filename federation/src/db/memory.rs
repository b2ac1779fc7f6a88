//! In-process tournament storage.
//!
//! Used by tests and by the server's `memory` storage backend. A single write
//! lock serializes every command, and a command runs against a copy of the
//! aggregate that replaces the stored one only on success.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::repository::TournamentRepository;
use crate::tournament::{
    CommandOutcome, Tournament, TournamentAggregate, TournamentCommand, TournamentError,
    TournamentId, TournamentResult, TournamentStatus, timestamp_now,
};

#[derive(Clone, Default)]
pub struct MemoryTournamentRepository {
    tournaments: Arc<RwLock<HashMap<TournamentId, TournamentAggregate>>>,
}

impl MemoryTournamentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TournamentRepository for MemoryTournamentRepository {
    async fn insert_tournament(&self, tournament: &Tournament) -> TournamentResult<()> {
        let mut tournaments = self.tournaments.write().await;
        if tournaments.contains_key(&tournament.id) {
            return Err(TournamentError::Internal(format!(
                "tournament {} already stored",
                tournament.id
            )));
        }
        tournaments.insert(tournament.id, TournamentAggregate::new(tournament.clone()));
        Ok(())
    }

    async fn find_tournament(&self, id: TournamentId) -> TournamentResult<Option<Tournament>> {
        let tournaments = self.tournaments.read().await;
        Ok(tournaments.get(&id).map(|agg| agg.tournament.clone()))
    }

    async fn list_tournaments(
        &self,
        status: Option<TournamentStatus>,
    ) -> TournamentResult<Vec<Tournament>> {
        let tournaments = self.tournaments.read().await;
        let mut listed: Vec<Tournament> = tournaments
            .values()
            .map(|agg| &agg.tournament)
            .filter(|t| status.is_none_or(|s| t.status == s))
            .cloned()
            .collect();
        listed.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(listed)
    }

    async fn load_aggregate(&self, id: TournamentId) -> TournamentResult<TournamentAggregate> {
        let tournaments = self.tournaments.read().await;
        tournaments
            .get(&id)
            .cloned()
            .ok_or(TournamentError::TournamentNotFound(id))
    }

    async fn execute(
        &self,
        id: TournamentId,
        command: TournamentCommand,
    ) -> TournamentResult<CommandOutcome> {
        let mut tournaments = self.tournaments.write().await;
        let stored = tournaments
            .get_mut(&id)
            .ok_or(TournamentError::TournamentNotFound(id))?;

        let mut working = stored.clone();
        let outcome = working.execute(command, timestamp_now())?;
        *stored = working;

        Ok(outcome)
    }

    async fn health_check(&self) -> TournamentResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tournament::{NewParticipant, NewTournament, TournamentFormat};

    fn new_tournament(name: &str) -> Tournament {
        Tournament::new(
            NewTournament {
                name: name.to_string(),
                max_participants: 2,
                tournament_format: TournamentFormat::SingleElimination,
            },
            timestamp_now(),
        )
    }

    fn register(member_id: i64) -> TournamentCommand {
        TournamentCommand::Register(NewParticipant {
            member_id,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let repo = MemoryTournamentRepository::new();
        let t = new_tournament("Memory Cup");
        repo.insert_tournament(&t).await.unwrap();

        assert_eq!(repo.find_tournament(t.id).await.unwrap(), Some(t.clone()));
        assert!(repo.insert_tournament(&t).await.is_err());
        assert!(
            repo.find_tournament(uuid::Uuid::new_v4())
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_failed_command_leaves_state_untouched() {
        let repo = MemoryTournamentRepository::new();
        let t = new_tournament("Atomic");
        repo.insert_tournament(&t).await.unwrap();

        repo.execute(t.id, register(1)).await.unwrap();
        repo.execute(t.id, register(2)).await.unwrap();
        let before = repo.load_aggregate(t.id).await.unwrap();

        let err = repo.execute(t.id, register(3)).await.unwrap_err();
        assert!(matches!(err, TournamentError::CapacityExceeded { .. }));
        assert_eq!(repo.load_aggregate(t.id).await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_list_filters_by_status() {
        let repo = MemoryTournamentRepository::new();
        let open = new_tournament("Open");
        let cancelled = new_tournament("Cancelled");
        repo.insert_tournament(&open).await.unwrap();
        repo.insert_tournament(&cancelled).await.unwrap();
        repo.execute(cancelled.id, TournamentCommand::CancelTournament)
            .await
            .unwrap();

        let all = repo.list_tournaments(None).await.unwrap();
        assert_eq!(all.len(), 2);

        let upcoming = repo
            .list_tournaments(Some(TournamentStatus::Upcoming))
            .await
            .unwrap();
        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].id, open.id);
    }

    #[tokio::test]
    async fn test_unknown_tournament() {
        let repo = MemoryTournamentRepository::new();
        let id = uuid::Uuid::new_v4();

        assert!(matches!(
            repo.execute(id, register(1)).await,
            Err(TournamentError::TournamentNotFound(_))
        ));
        assert!(matches!(
            repo.load_aggregate(id).await,
            Err(TournamentError::TournamentNotFound(_))
        ));
    }
}
