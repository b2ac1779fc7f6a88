//! Winner propagation through the bracket arena.

use super::{
    bracket::parent_index,
    errors::{TournamentError, TournamentResult},
    models::{Match, MatchId, ParticipantId},
};
use log::error;
use serde::{Deserialize, Serialize};

/// Slot of a match a winner is placed into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    Participant1,
    Participant2,
}

impl Slot {
    /// Odd-numbered matches feed the first slot of their parent, even ones the second
    pub fn for_feeder(match_number: u32) -> Self {
        if match_number % 2 == 1 {
            Slot::Participant1
        } else {
            Slot::Participant2
        }
    }
}

/// Effect of advancing a resolved match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Advancement {
    /// Winner placed into the next match
    Placed { next_match_id: MatchId, slot: Slot },
    /// Next match already held the winner
    AlreadyPlaced { next_match_id: MatchId },
    /// The final was resolved
    Champion { winner_id: ParticipantId },
}

fn broken(message: String) -> TournamentError {
    error!("Bracket invariant violated: {}", message);
    TournamentError::Internal(message)
}

/// Move the winner of `matches[index]` into the match that receives it.
///
/// `matches` must be the full arena of one bracket. Repeating the call for the
/// same match leaves the bracket unchanged.
pub fn advance_winner(matches: &mut [Match], index: usize) -> TournamentResult<Advancement> {
    let bracket_size = matches.len() + 1;
    let source = matches
        .get(index)
        .ok_or_else(|| broken(format!("match index {index} outside bracket of {bracket_size}")))?;

    let winner_id = match (source.status.is_resolved(), source.winner_id) {
        (true, Some(winner_id)) => winner_id,
        _ => {
            return Err(broken(format!(
                "match {} advanced while {} without a winner",
                source.id, source.status
            )));
        }
    };

    let Some(parent) = parent_index(bracket_size, source.round, source.match_number) else {
        if source.next_match_id.is_some() {
            return Err(broken(format!(
                "final-round match {} links to another match",
                source.id
            )));
        }
        return Ok(Advancement::Champion { winner_id });
    };

    let source_id = source.id;
    let expected_next = source.next_match_id;
    let slot = Slot::for_feeder(source.match_number);

    let next = matches
        .get_mut(parent)
        .ok_or_else(|| broken(format!("next match of {source_id} missing at index {parent}")))?;
    if expected_next != Some(next.id) {
        return Err(broken(format!(
            "match {source_id} links to {expected_next:?} but the bracket places {} next",
            next.id
        )));
    }

    let target = match slot {
        Slot::Participant1 => &mut next.participant1_id,
        Slot::Participant2 => &mut next.participant2_id,
    };
    match *target {
        None => {
            *target = Some(winner_id);
            Ok(Advancement::Placed {
                next_match_id: next.id,
                slot,
            })
        }
        Some(current) if current == winner_id => Ok(Advancement::AlreadyPlaced {
            next_match_id: next.id,
        }),
        Some(current) => Err(broken(format!(
            "slot {slot:?} of match {} already holds {current}, cannot place {winner_id}",
            next.id
        ))),
    }
}
