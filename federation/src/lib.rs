//! # Federation
//!
//! Tournament management for a sports federation: participant registration,
//! single-elimination bracket generation and the match lifecycle that carries
//! winners to the final.
//!
//! ## Architecture
//!
//! A tournament, its participants and its matches form one aggregate. Reads
//! load a consistent snapshot of it; every mutation is a
//! [`tournament::TournamentCommand`] that a [`db::TournamentRepository`]
//! applies under the tournament's lock and persists atomically:
//!
//! - **Registry**: registration, withdrawal, capacity
//! - **Bracket**: seeding, byes and the match tree
//! - **State machine**: scheduled, in progress, completed, cancelled, bye
//! - **Advancement**: placing winners and completing the tournament
//!
//! ## Core Modules
//!
//! - [`tournament`]: Domain models, bracket logic and the manager
//! - [`db`]: Connection pool, schema and repositories
//!
//! ## Example
//!
//! ```
//! use federation::tournament::bracket::{next_power_of_two, seed_positions};
//!
//! assert_eq!(next_power_of_two(5), 8);
//! assert_eq!(seed_positions(4), vec![1, 4, 2, 3]);
//! ```

/// Database pooling, schema and tournament repositories.
pub mod db;

/// Tournament domain: registry, bracket, matches and advancement.
pub mod tournament;
pub use tournament::{TournamentError, TournamentManager, TournamentResult};
