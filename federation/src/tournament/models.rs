//! Tournament, participant and match data models.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Tournament ID type
pub type TournamentId = Uuid;

/// Participant ID type
pub type ParticipantId = Uuid;

/// Match ID type
pub type MatchId = Uuid;

/// Member ID type (owned by the member registry)
pub type MemberId = i64;

/// Current time truncated to microseconds, the precision of `TIMESTAMPTZ`,
/// so a returned record equals the one read back from storage.
pub fn timestamp_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Error returned when a stored status string has no matching variant
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} value: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

/// Declares the column text for each variant of a status enum and derives
/// `as_str`, `Display` and `FromStr` from it.
macro_rules! column_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// Text stored in the database column
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(ParseEnumError {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

/// Tournament status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentStatus {
    /// Accepting registrations, no bracket yet
    Upcoming,
    /// Bracket generated, matches being played
    Active,
    /// Final match resolved
    Completed,
    /// Cancelled by an organizer
    Cancelled,
}

column_enum!(TournamentStatus, "tournament status", {
    Upcoming => "upcoming",
    Active => "active",
    Completed => "completed",
    Cancelled => "cancelled",
});

impl TournamentStatus {
    /// Whether the tournament has reached a terminal status
    pub fn is_finished(&self) -> bool {
        matches!(self, TournamentStatus::Completed | TournamentStatus::Cancelled)
    }
}

/// Tournament format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentFormat {
    #[default]
    SingleElimination,
}

column_enum!(TournamentFormat, "tournament format", {
    SingleElimination => "single_elimination",
});

/// Order in which participants are placed into the bracket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedingPolicy {
    /// Seed ascending, unseeded participants last in registration order
    #[default]
    Ranking,
    /// Shuffled with a random source derived from the tournament
    Random,
    /// As registered
    RegistrationOrder,
}

column_enum!(SeedingPolicy, "seeding policy", {
    Ranking => "ranking",
    Random => "random",
    RegistrationOrder => "registration_order",
});

/// Participant status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantStatus {
    Registered,
    Confirmed,
    Withdrawn,
    Disqualified,
}

column_enum!(ParticipantStatus, "participant status", {
    Registered => "registered",
    Confirmed => "confirmed",
    Withdrawn => "withdrawn",
    Disqualified => "disqualified",
});

impl ParticipantStatus {
    /// Active participants count towards capacity and enter the bracket
    pub fn is_active(&self) -> bool {
        matches!(self, ParticipantStatus::Registered | ParticipantStatus::Confirmed)
    }
}

/// Match status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
    /// Terminal pseudo-state of a first-round match with a single participant
    Bye,
}

column_enum!(MatchStatus, "match status", {
    Scheduled => "scheduled",
    InProgress => "in_progress",
    Completed => "completed",
    Cancelled => "cancelled",
    Bye => "bye",
});

impl MatchStatus {
    /// Whether the match has a decided winner
    pub fn is_resolved(&self) -> bool {
        matches!(self, MatchStatus::Completed | MatchStatus::Bye)
    }

    /// Whether the match can still be started, reported or cancelled
    pub fn is_open(&self) -> bool {
        matches!(self, MatchStatus::Scheduled | MatchStatus::InProgress)
    }
}

/// Request to create a tournament
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTournament {
    /// Tournament name
    pub name: String,
    /// Maximum number of active participants
    pub max_participants: u32,
    /// Tournament format
    #[serde(default)]
    pub tournament_format: TournamentFormat,
}

/// Tournament
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
    pub max_participants: u32,
    /// Cached count of active participants, rewritten on every roster change
    pub current_participants: u32,
    pub status: TournamentStatus,
    pub tournament_format: TournamentFormat,
    /// Policy used when the bracket was generated
    pub seeding_policy: Option<SeedingPolicy>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Tournament {
    /// Create an upcoming tournament from a creation request
    pub fn new(request: NewTournament, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: request.name.trim().to_string(),
            max_participants: request.max_participants,
            current_participants: 0,
            status: TournamentStatus::Upcoming,
            tournament_format: request.tournament_format,
            seeding_policy: None,
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
        }
    }

    /// Seed for the random seeding policy, stable for the lifetime of the tournament
    pub fn shuffle_seed(&self) -> u64 {
        let bits = self.id.as_u128();
        (bits as u64) ^ ((bits >> 64) as u64)
    }
}

/// Tournament entrant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub tournament_id: TournamentId,
    pub member_id: MemberId,
    pub status: ParticipantStatus,
    /// Rank used for bracket placement (1 is the top seed)
    pub seed: Option<u32>,
    pub notes: Option<String>,
    pub registered_at: DateTime<Utc>,
}

impl Participant {
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }
}

/// Registration request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewParticipant {
    pub member_id: MemberId,
    #[serde(default)]
    pub seed: Option<u32>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Organizer edit of a participant; absent fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantUpdate {
    #[serde(default)]
    pub status: Option<ParticipantStatus>,
    /// `Some(None)` (JSON `null`) clears the seed
    #[serde(
        default,
        deserialize_with = "present_field",
        skip_serializing_if = "Option::is_none"
    )]
    pub seed: Option<Option<u32>>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Maps a field that is present, `null` included, to `Some`, leaving
/// `None` for a missing field through `#[serde(default)]`.
fn present_field<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// A single bracket match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub tournament_id: TournamentId,
    /// 1-based round, round 1 is the first round
    pub round: u32,
    /// 1-based position within the round
    pub match_number: u32,
    /// 1-based position in the flattened bracket (round-major)
    pub bracket_position: u32,
    pub participant1_id: Option<ParticipantId>,
    pub participant2_id: Option<ParticipantId>,
    pub winner_id: Option<ParticipantId>,
    pub status: MatchStatus,
    pub score: Option<String>,
    pub participant1_score: Option<i32>,
    pub participant2_score: Option<i32>,
    /// Match receiving this match's winner, `None` only for the final
    pub next_match_id: Option<MatchId>,
    pub is_bye: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Match {
    /// Both participant slots are filled
    pub fn has_both_participants(&self) -> bool {
        self.participant1_id.is_some() && self.participant2_id.is_some()
    }

    /// Whether the participant occupies either slot
    pub fn involves(&self, participant_id: ParticipantId) -> bool {
        self.participant1_id == Some(participant_id) || self.participant2_id == Some(participant_id)
    }

    pub fn is_final(&self) -> bool {
        self.next_match_id.is_none()
    }
}

/// Result reported for a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub participant1_score: i32,
    pub participant2_score: i32,
    pub winner_id: ParticipantId,
}

/// One round of a bracket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BracketRound {
    pub round: u32,
    pub matches: Vec<Match>,
}

/// Bracket grouped by round
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BracketView {
    pub tournament_id: TournamentId,
    pub status: TournamentStatus,
    pub bracket_size: usize,
    pub rounds: Vec<BracketRound>,
    /// Winner of the final once the tournament is completed
    pub champion: Option<ParticipantId>,
}
