//! Repository trait definitions for testability and dependency injection.
//!
//! [`TournamentRepository`] is the only storage seam. Reads return snapshots;
//! every mutation goes through [`TournamentRepository::execute`], which applies
//! one [`TournamentCommand`] to the tournament's aggregate while holding the
//! tournament's lock and persists the result in the same transaction.

use async_trait::async_trait;
use log::{debug, warn};
use sqlx::{PgConnection, PgPool, Row, postgres::PgRow};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use super::timeouts::{
    DEFAULT_TRANSACTION_TIMEOUT, LOCK_TIMEOUT, with_default_timeout, with_timeout,
};
use crate::tournament::{
    CommandOutcome, Match, ParseEnumError, Participant, Tournament, TournamentAggregate,
    TournamentCommand, TournamentError, TournamentId, TournamentResult, TournamentStatus,
    timestamp_now,
};

/// Storage of tournaments and their aggregates
#[async_trait]
pub trait TournamentRepository: Send + Sync {
    /// Persist a newly created tournament
    async fn insert_tournament(&self, tournament: &Tournament) -> TournamentResult<()>;

    /// Find tournament by ID
    async fn find_tournament(&self, id: TournamentId) -> TournamentResult<Option<Tournament>>;

    /// List tournaments, newest first
    async fn list_tournaments(
        &self,
        status: Option<TournamentStatus>,
    ) -> TournamentResult<Vec<Tournament>>;

    /// Consistent snapshot of a tournament with its participants and matches
    async fn load_aggregate(&self, id: TournamentId) -> TournamentResult<TournamentAggregate>;

    /// Apply a command atomically under the tournament's lock
    async fn execute(
        &self,
        id: TournamentId,
        command: TournamentCommand,
    ) -> TournamentResult<CommandOutcome>;

    /// Check that storage is reachable
    async fn health_check(&self) -> TournamentResult<()>;
}

macro_rules! tournament_query {
    ($tail:literal) => {
        concat!(
            "SELECT id, name, max_participants, current_participants, status, tournament_format,
                    seeding_policy, created_at, updated_at, started_at, completed_at
             FROM tournaments ",
            $tail
        )
    };
}

const PARTICIPANTS_QUERY: &str = "SELECT id, tournament_id, member_id, status, seed, notes,
            registered_at
     FROM tournament_participants
     WHERE tournament_id = $1
     ORDER BY registered_at, id";

const MATCHES_QUERY: &str = "SELECT id, tournament_id, round, match_number, bracket_position,
            participant1_id, participant2_id, winner_id, status, score,
            participant1_score, participant2_score, next_match_id, is_bye,
            started_at, completed_at
     FROM matches
     WHERE tournament_id = $1
     ORDER BY round, match_number";

fn column_enum<T>(row: &PgRow, column: &str) -> TournamentResult<T>
where
    T: FromStr<Err = ParseEnumError>,
{
    let text: String = row.try_get(column)?;
    text.parse()
        .map_err(|e: ParseEnumError| TournamentError::Internal(e.to_string()))
}

fn column_u32(row: &PgRow, column: &str) -> TournamentResult<u32> {
    let value: i32 = row.try_get(column)?;
    u32::try_from(value)
        .map_err(|_| TournamentError::Internal(format!("{column} is negative: {value}")))
}

/// Stored seeds are 1 or greater; anything else is corrupt data
fn decode_seed(value: Option<i32>) -> TournamentResult<Option<u32>> {
    value
        .map(|seed| {
            u32::try_from(seed)
                .ok()
                .filter(|s| *s >= 1)
                .ok_or_else(|| TournamentError::Internal(format!("invalid stored seed: {seed}")))
        })
        .transpose()
}

/// Narrow a count or position to its `INTEGER` column
fn to_column(value: u32, column: &str) -> TournamentResult<i32> {
    i32::try_from(value)
        .map_err(|_| TournamentError::Internal(format!("{column} out of range: {value}")))
}

fn seed_column(seed: Option<u32>) -> TournamentResult<Option<i32>> {
    seed.map(|s| to_column(s, "seed")).transpose()
}

fn tournament_from_row(row: &PgRow) -> TournamentResult<Tournament> {
    let seeding_policy: Option<String> = row.try_get("seeding_policy")?;
    Ok(Tournament {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        max_participants: column_u32(row, "max_participants")?,
        current_participants: column_u32(row, "current_participants")?,
        status: column_enum(row, "status")?,
        tournament_format: column_enum(row, "tournament_format")?,
        seeding_policy: seeding_policy
            .map(|p| p.parse())
            .transpose()
            .map_err(|e: ParseEnumError| TournamentError::Internal(e.to_string()))?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        started_at: row.try_get("started_at")?,
        completed_at: row.try_get("completed_at")?,
    })
}

fn participant_from_row(row: &PgRow) -> TournamentResult<Participant> {
    let seed = decode_seed(row.try_get("seed")?)?;
    Ok(Participant {
        id: row.try_get("id")?,
        tournament_id: row.try_get("tournament_id")?,
        member_id: row.try_get("member_id")?,
        status: column_enum(row, "status")?,
        seed,
        notes: row.try_get("notes")?,
        registered_at: row.try_get("registered_at")?,
    })
}

fn match_from_row(row: &PgRow) -> TournamentResult<Match> {
    Ok(Match {
        id: row.try_get("id")?,
        tournament_id: row.try_get("tournament_id")?,
        round: column_u32(row, "round")?,
        match_number: column_u32(row, "match_number")?,
        bracket_position: column_u32(row, "bracket_position")?,
        participant1_id: row.try_get("participant1_id")?,
        participant2_id: row.try_get("participant2_id")?,
        winner_id: row.try_get("winner_id")?,
        status: column_enum(row, "status")?,
        score: row.try_get("score")?,
        participant1_score: row.try_get("participant1_score")?,
        participant2_score: row.try_get("participant2_score")?,
        next_match_id: row.try_get("next_match_id")?,
        is_bye: row.try_get("is_bye")?,
        started_at: row.try_get("started_at")?,
        completed_at: row.try_get("completed_at")?,
    })
}

/// Default PostgreSQL implementation of `TournamentRepository`
#[derive(Clone)]
pub struct PgTournamentRepository {
    pool: Arc<PgPool>,
}

impl PgTournamentRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    async fn load_rows(
        conn: &mut PgConnection,
        tournament: Tournament,
    ) -> TournamentResult<TournamentAggregate> {
        let participants = sqlx::query(PARTICIPANTS_QUERY)
            .bind(tournament.id)
            .fetch_all(&mut *conn)
            .await?
            .iter()
            .map(participant_from_row)
            .collect::<TournamentResult<Vec<_>>>()?;

        let matches = sqlx::query(MATCHES_QUERY)
            .bind(tournament.id)
            .fetch_all(&mut *conn)
            .await?
            .iter()
            .map(match_from_row)
            .collect::<TournamentResult<Vec<_>>>()?;

        Ok(TournamentAggregate {
            tournament,
            participants,
            matches,
        })
    }

    async fn execute_locked(
        &self,
        id: TournamentId,
        command: TournamentCommand,
    ) -> TournamentResult<CommandOutcome> {
        let mut tx = self.pool.begin().await?;

        let lock_timeout = format!("SET LOCAL lock_timeout = '{}ms'", LOCK_TIMEOUT.as_millis());
        sqlx::query(&lock_timeout).execute(&mut *tx).await?;

        let row = sqlx::query(tournament_query!("WHERE id = $1 FOR UPDATE"))
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(TournamentError::TournamentNotFound(id))?;
        let tournament = tournament_from_row(&row)?;

        let before = Self::load_rows(&mut *tx, tournament).await?;
        let mut after = before.clone();
        // Dropping the transaction on error rolls back the lock and nothing is written
        let outcome = after.execute(command, timestamp_now())?;

        persist_changes(&mut *tx, &before, &after).await?;
        tx.commit().await?;

        Ok(outcome)
    }
}

async fn insert_participant(conn: &mut PgConnection, p: &Participant) -> TournamentResult<()> {
    sqlx::query(
        "INSERT INTO tournament_participants
            (id, tournament_id, member_id, status, seed, notes, registered_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(p.id)
    .bind(p.tournament_id)
    .bind(p.member_id)
    .bind(p.status.as_str())
    .bind(seed_column(p.seed)?)
    .bind(&p.notes)
    .bind(p.registered_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn update_participant(conn: &mut PgConnection, p: &Participant) -> TournamentResult<()> {
    sqlx::query(
        "UPDATE tournament_participants SET status = $2, seed = $3, notes = $4 WHERE id = $1",
    )
    .bind(p.id)
    .bind(p.status.as_str())
    .bind(seed_column(p.seed)?)
    .bind(&p.notes)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn insert_match(conn: &mut PgConnection, m: &Match) -> TournamentResult<()> {
    sqlx::query(
        "INSERT INTO matches
            (id, tournament_id, round, match_number, bracket_position,
             participant1_id, participant2_id, winner_id, status, score,
             participant1_score, participant2_score, next_match_id, is_bye,
             started_at, completed_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
    )
    .bind(m.id)
    .bind(m.tournament_id)
    .bind(to_column(m.round, "round")?)
    .bind(to_column(m.match_number, "match_number")?)
    .bind(to_column(m.bracket_position, "bracket_position")?)
    .bind(m.participant1_id)
    .bind(m.participant2_id)
    .bind(m.winner_id)
    .bind(m.status.as_str())
    .bind(&m.score)
    .bind(m.participant1_score)
    .bind(m.participant2_score)
    .bind(m.next_match_id)
    .bind(m.is_bye)
    .bind(m.started_at)
    .bind(m.completed_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn update_match(conn: &mut PgConnection, m: &Match) -> TournamentResult<()> {
    sqlx::query(
        "UPDATE matches
         SET participant1_id = $2, participant2_id = $3, winner_id = $4, status = $5,
             score = $6, participant1_score = $7, participant2_score = $8,
             started_at = $9, completed_at = $10
         WHERE id = $1",
    )
    .bind(m.id)
    .bind(m.participant1_id)
    .bind(m.participant2_id)
    .bind(m.winner_id)
    .bind(m.status.as_str())
    .bind(&m.score)
    .bind(m.participant1_score)
    .bind(m.participant2_score)
    .bind(m.started_at)
    .bind(m.completed_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Write the difference between two versions of an aggregate
async fn persist_changes(
    conn: &mut PgConnection,
    before: &TournamentAggregate,
    after: &TournamentAggregate,
) -> TournamentResult<()> {
    if before.tournament != after.tournament {
        let t = &after.tournament;
        sqlx::query(
            "UPDATE tournaments
             SET current_participants = $2, status = $3, seeding_policy = $4,
                 updated_at = $5, started_at = $6, completed_at = $7
             WHERE id = $1",
        )
        .bind(t.id)
        .bind(to_column(t.current_participants, "current_participants")?)
        .bind(t.status.as_str())
        .bind(t.seeding_policy.map(|p| p.as_str()))
        .bind(t.updated_at)
        .bind(t.started_at)
        .bind(t.completed_at)
        .execute(&mut *conn)
        .await?;
    }

    let old_participants: HashMap<_, _> =
        before.participants.iter().map(|p| (p.id, p)).collect();
    for p in &after.participants {
        match old_participants.get(&p.id) {
            None => insert_participant(conn, p).await?,
            Some(old) if *old != p => update_participant(conn, p).await?,
            Some(_) => {}
        }
    }
    for p in &before.participants {
        if !after.participants.iter().any(|q| q.id == p.id) {
            sqlx::query("DELETE FROM tournament_participants WHERE id = $1")
                .bind(p.id)
                .execute(&mut *conn)
                .await?;
        }
    }

    let old_matches: HashMap<_, _> = before.matches.iter().map(|m| (m.id, m)).collect();
    // Later rounds first so every next_match_id already exists when referenced
    for m in after.matches.iter().rev() {
        match old_matches.get(&m.id) {
            None => insert_match(conn, m).await?,
            Some(old) if *old != m => update_match(conn, m).await?,
            Some(_) => {}
        }
    }

    Ok(())
}

#[async_trait]
impl TournamentRepository for PgTournamentRepository {
    async fn insert_tournament(&self, tournament: &Tournament) -> TournamentResult<()> {
        with_default_timeout(async {
            sqlx::query(
                "INSERT INTO tournaments
                    (id, name, max_participants, current_participants, status,
                     tournament_format, seeding_policy, created_at, updated_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            )
            .bind(tournament.id)
            .bind(&tournament.name)
            .bind(to_column(tournament.max_participants, "max_participants")?)
            .bind(to_column(
                tournament.current_participants,
                "current_participants",
            )?)
            .bind(tournament.status.as_str())
            .bind(tournament.tournament_format.as_str())
            .bind(tournament.seeding_policy.map(|p| p.as_str()))
            .bind(tournament.created_at)
            .bind(tournament.updated_at)
            .execute(self.pool.as_ref())
            .await?;
            Ok::<_, TournamentError>(())
        })
        .await
    }

    async fn find_tournament(&self, id: TournamentId) -> TournamentResult<Option<Tournament>> {
        with_default_timeout(async {
            let row = sqlx::query(tournament_query!("WHERE id = $1"))
                .bind(id)
                .fetch_optional(self.pool.as_ref())
                .await?;
            row.as_ref().map(tournament_from_row).transpose()
        })
        .await
    }

    async fn list_tournaments(
        &self,
        status: Option<TournamentStatus>,
    ) -> TournamentResult<Vec<Tournament>> {
        with_default_timeout(async {
            let rows = sqlx::query(tournament_query!(
                "WHERE ($1::TEXT IS NULL OR status = $1) ORDER BY created_at DESC, id"
            ))
            .bind(status.map(|s| s.as_str()))
            .fetch_all(self.pool.as_ref())
            .await?;
            rows.iter()
                .map(tournament_from_row)
                .collect::<TournamentResult<Vec<_>>>()
        })
        .await
    }

    async fn load_aggregate(&self, id: TournamentId) -> TournamentResult<TournamentAggregate> {
        with_timeout(DEFAULT_TRANSACTION_TIMEOUT, async {
            let mut tx = self.pool.begin().await?;
            sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
                .execute(&mut *tx)
                .await?;

            let row = sqlx::query(tournament_query!("WHERE id = $1"))
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(TournamentError::TournamentNotFound(id))?;
            let aggregate = Self::load_rows(&mut *tx, tournament_from_row(&row)?).await?;

            tx.commit().await?;
            Ok::<_, TournamentError>(aggregate)
        })
        .await
    }

    async fn execute(
        &self,
        id: TournamentId,
        command: TournamentCommand,
    ) -> TournamentResult<CommandOutcome> {
        let name = command.name();
        debug!("Executing {} on tournament {}", name, id);

        with_timeout(DEFAULT_TRANSACTION_TIMEOUT, self.execute_locked(id, command))
            .await
            .inspect_err(|e| {
                if e.is_retryable() {
                    warn!("{} on tournament {} hit contention: {}", name, id, e);
                }
            })
    }

    async fn health_check(&self) -> TournamentResult<()> {
        with_default_timeout(async {
            sqlx::query("SELECT 1").execute(self.pool.as_ref()).await?;
            Ok::<_, TournamentError>(())
        })
        .await
    }
}
