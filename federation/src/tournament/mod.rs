//! Tournament module for single-elimination competitions.
//!
//! This module provides tournament management functionality including:
//! - Tournament creation and cancellation
//! - Participant registration, withdrawal and capacity tracking
//! - Bracket generation with seeding and byes
//! - Match lifecycle and winner advancement
//!
//! ## Example
//!
//! ```no_run
//! use federation::tournament::{
//!     NewParticipant, NewTournament, SeedingPolicy, TournamentFormat, TournamentManager,
//! };
//! use federation::db::Database;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::new(&Default::default()).await?;
//!     let manager = TournamentManager::with_pool(Arc::new(db.pool().clone()));
//!
//!     let tournament = manager
//!         .create_tournament(NewTournament {
//!             name: "Autumn Cup".to_string(),
//!             max_participants: 16,
//!             tournament_format: TournamentFormat::SingleElimination,
//!         })
//!         .await?;
//!
//!     for member_id in 1..=5 {
//!         manager
//!             .register_participant(
//!                 tournament.id,
//!                 NewParticipant {
//!                     member_id,
//!                     ..Default::default()
//!                 },
//!             )
//!             .await?;
//!     }
//!
//!     let matches = manager.generate_bracket(tournament.id, SeedingPolicy::Ranking).await?;
//!     println!("Generated {} matches", matches.len());
//!
//!     Ok(())
//! }
//! ```

pub mod advancement;
pub mod aggregate;
pub mod bracket;
pub mod errors;
pub mod manager;
pub mod models;
pub mod registry;
pub mod state_machine;

pub use advancement::{Advancement, Slot};
pub use aggregate::{CommandOutcome, MatchOutcome, TournamentAggregate, TournamentCommand};
pub use errors::{ErrorKind, TournamentError, TournamentResult};
pub use manager::TournamentManager;
pub use models::{
    BracketRound, BracketView, Match, MatchId, MatchStatus, MemberId, NewParticipant,
    NewTournament, ParseEnumError, Participant, ParticipantId, ParticipantStatus,
    ParticipantUpdate, ScoreReport, SeedingPolicy, Tournament, TournamentFormat, TournamentId,
    TournamentStatus, timestamp_now,
};
