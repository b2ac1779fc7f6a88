//! Integration tests for the PostgreSQL repository.
//!
//! Run against the database named by `DATABASE_URL`; every test returns early
//! when it is unset. Each test works on its own tournament, and `#[serial]`
//! keeps the schema setup from racing itself.

use federation::db::{Database, DatabaseConfig};
use federation::tournament::{
    Advancement, Match, MatchStatus, NewParticipant, NewTournament, ParticipantUpdate,
    ScoreReport, SeedingPolicy, Slot, Tournament, TournamentError, TournamentFormat,
    TournamentManager, TournamentStatus,
};
use serial_test::serial;
use sqlx::PgPool;
use std::sync::Arc;

/// Connect and apply the schema, or `None` without a configured database
async fn setup_test_db() -> Option<(TournamentManager, Arc<PgPool>)> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping PostgreSQL repository test");
        return None;
    };

    let config = DatabaseConfig {
        database_url,
        max_connections: 5,
        min_connections: 1,
        connection_timeout_secs: 5,
        idle_timeout_secs: 300,
        max_lifetime_secs: 1800,
    };

    let db = Database::new(&config)
        .await
        .expect("Failed to create test database");
    db.apply_schema().await.expect("Failed to apply schema");

    let pool = Arc::new(db.pool().clone());
    Some((TournamentManager::with_pool(pool.clone()), pool))
}

async fn tournament_with(
    manager: &TournamentManager,
    max_participants: u32,
    members: i64,
) -> Tournament {
    let tournament = manager
        .create_tournament(NewTournament {
            name: "Pg Cup".to_string(),
            max_participants,
            tournament_format: TournamentFormat::SingleElimination,
        })
        .await
        .unwrap();

    for member_id in 1..=members {
        manager
            .register_participant(
                tournament.id,
                NewParticipant {
                    member_id,
                    seed: Some(member_id as u32),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
    }

    tournament
}

fn first_wins(m: &Match) -> ScoreReport {
    ScoreReport {
        participant1_score: 3,
        participant2_score: 1,
        winner_id: m.participant1_id.unwrap(),
    }
}

fn second_wins(m: &Match) -> ScoreReport {
    ScoreReport {
        participant1_score: 0,
        participant2_score: 2,
        winner_id: m.participant2_id.unwrap(),
    }
}

async fn match_rows(pool: &PgPool, tournament: &Tournament) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM matches WHERE tournament_id = $1")
        .bind(tournament.id)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn cleanup(pool: &PgPool, tournament: &Tournament) {
    // Matches reference each other through next_match_id
    let _ = sqlx::query("UPDATE matches SET next_match_id = NULL WHERE tournament_id = $1")
        .bind(tournament.id)
        .execute(pool)
        .await;
    let _ = sqlx::query("DELETE FROM matches WHERE tournament_id = $1")
        .bind(tournament.id)
        .execute(pool)
        .await;
    let _ = sqlx::query("DELETE FROM tournaments WHERE id = $1")
        .bind(tournament.id)
        .execute(pool)
        .await;
}

#[tokio::test]
#[serial]
async fn test_created_tournament_reads_back() {
    let Some((manager, pool)) = setup_test_db().await else {
        return;
    };
    let t = tournament_with(&manager, 8, 0).await;

    let stored = manager.get_tournament(t.id).await.unwrap();
    assert_eq!(stored, t);
    manager.health_check().await.unwrap();

    cleanup(&pool, &t).await;
}

#[tokio::test]
#[serial]
async fn test_bracket_with_byes_reads_back_identical() {
    let Some((manager, pool)) = setup_test_db().await else {
        return;
    };
    let t = tournament_with(&manager, 8, 5).await;

    let generated = manager
        .generate_bracket(t.id, SeedingPolicy::Ranking)
        .await
        .unwrap();
    assert_eq!(generated.len(), 7);
    assert_eq!(generated.iter().filter(|m| m.is_bye).count(), 3);

    let aggregate = manager.repository().load_aggregate(t.id).await.unwrap();
    assert_eq!(aggregate.matches, generated);
    assert_eq!(aggregate.tournament.status, TournamentStatus::Active);
    assert_eq!(aggregate.tournament.seeding_policy, Some(SeedingPolicy::Ranking));
    assert_eq!(manager.list_matches(t.id).await.unwrap(), generated);
    assert_eq!(match_rows(&pool, &t).await, 7);

    cleanup(&pool, &t).await;
}

#[tokio::test]
#[serial]
async fn test_second_generation_leaves_rows_untouched() {
    let Some((manager, pool)) = setup_test_db().await else {
        return;
    };
    let t = tournament_with(&manager, 8, 6).await;

    let original = manager
        .generate_bracket(t.id, SeedingPolicy::Ranking)
        .await
        .unwrap();
    let tournament_before = manager.get_tournament(t.id).await.unwrap();

    let err = manager
        .generate_bracket(t.id, SeedingPolicy::Random)
        .await
        .unwrap_err();
    assert!(matches!(err, TournamentError::BracketAlreadyExists));

    assert_eq!(manager.list_matches(t.id).await.unwrap(), original);
    assert_eq!(manager.get_tournament(t.id).await.unwrap(), tournament_before);
    assert_eq!(match_rows(&pool, &t).await, 7);

    cleanup(&pool, &t).await;
}

#[tokio::test]
#[serial]
async fn test_invalid_winner_leaves_row_unchanged() {
    let Some((manager, pool)) = setup_test_db().await else {
        return;
    };
    let t = tournament_with(&manager, 4, 4).await;
    let matches = manager
        .generate_bracket(t.id, SeedingPolicy::RegistrationOrder)
        .await
        .unwrap();
    let target = &matches[0];

    let err = manager
        .submit_result(
            t.id,
            target.id,
            ScoreReport {
                participant1_score: 2,
                participant2_score: 0,
                winner_id: uuid::Uuid::new_v4(),
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, TournamentError::InvalidWinner { .. }));
    assert_eq!(&manager.get_match(t.id, target.id).await.unwrap(), target);
    assert_eq!(manager.list_matches(t.id).await.unwrap(), matches);

    cleanup(&pool, &t).await;
}

#[tokio::test]
#[serial]
async fn test_seed_cleared_and_persisted() {
    let Some((manager, pool)) = setup_test_db().await else {
        return;
    };
    let t = tournament_with(&manager, 4, 2).await;
    let participant = manager.list_participants(t.id).await.unwrap()[0].clone();
    assert_eq!(participant.seed, Some(1));

    manager
        .update_participant(
            t.id,
            participant.id,
            ParticipantUpdate {
                seed: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let stored = manager.get_participant(t.id, participant.id).await.unwrap();
    assert_eq!(stored.seed, None);

    cleanup(&pool, &t).await;
}

#[tokio::test]
#[serial]
async fn test_full_play_out_completes() {
    let Some((manager, pool)) = setup_test_db().await else {
        return;
    };
    let t = tournament_with(&manager, 8, 7).await;
    manager
        .generate_bracket(t.id, SeedingPolicy::Ranking)
        .await
        .unwrap();

    loop {
        let ready: Vec<Match> = manager
            .list_matches(t.id)
            .await
            .unwrap()
            .into_iter()
            .filter(|m| m.status == MatchStatus::Scheduled && m.has_both_participants())
            .collect();
        if ready.is_empty() {
            break;
        }
        for m in ready {
            manager
                .submit_result(t.id, m.id, first_wins(&m))
                .await
                .unwrap();
        }
    }

    let finished = manager.get_tournament(t.id).await.unwrap();
    assert_eq!(finished.status, TournamentStatus::Completed);
    assert!(finished.completed_at.is_some());

    let bracket = manager.get_bracket(t.id).await.unwrap();
    let final_match = &bracket.rounds.last().unwrap().matches[0];
    assert_eq!(final_match.status, MatchStatus::Completed);
    assert_eq!(bracket.champion, final_match.winner_id);
    assert!(
        manager
            .list_matches(t.id)
            .await
            .unwrap()
            .iter()
            .all(|m| m.status.is_resolved())
    );

    cleanup(&pool, &t).await;
}

#[tokio::test]
#[serial]
async fn test_concurrent_semi_final_results_fill_both_slots() {
    let Some((manager, pool)) = setup_test_db().await else {
        return;
    };
    let t = tournament_with(&manager, 4, 4).await;
    let matches = manager
        .generate_bracket(t.id, SeedingPolicy::RegistrationOrder)
        .await
        .unwrap();
    let (semi1, semi2, final_id) = (matches[0].clone(), matches[1].clone(), matches[2].id);
    let tournament_id = t.id;

    let first = {
        let manager = manager.clone();
        let report = first_wins(&semi1);
        tokio::spawn(async move {
            manager.submit_result(tournament_id, semi1.id, report).await
        })
    };
    let second = {
        let manager = manager.clone();
        let report = second_wins(&semi2);
        tokio::spawn(async move {
            manager.submit_result(tournament_id, semi2.id, report).await
        })
    };

    let first = first.await.unwrap().unwrap();
    let second = second.await.unwrap().unwrap();
    assert_eq!(
        first.advancement,
        Some(Advancement::Placed {
            next_match_id: final_id,
            slot: Slot::Participant1
        })
    );
    assert_eq!(
        second.advancement,
        Some(Advancement::Placed {
            next_match_id: final_id,
            slot: Slot::Participant2
        })
    );

    let final_match = manager.get_match(t.id, final_id).await.unwrap();
    assert_eq!(final_match.participant1_id, first.match_info.winner_id);
    assert_eq!(final_match.participant2_id, second.match_info.winner_id);
    assert_eq!(final_match.status, MatchStatus::Scheduled);

    cleanup(&pool, &t).await;
}
