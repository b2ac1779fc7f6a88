//! Single-elimination bracket construction.
//!
//! Matches live in a flat arena ordered by round, then match number. Round `r`
//! of a bracket of size `S` holds `S / 2^r` matches, so the position of any
//! match and of the match receiving its winner are computed arithmetically:
//!
//! ```text
//! size 8:  round 1 -> [0 1 2 3]   round 2 -> [4 5]   round 3 -> [6]
//! ```

use super::{
    advancement::advance_winner,
    errors::{TournamentError, TournamentResult},
    models::{Match, MatchStatus, Participant, ParticipantId, SeedingPolicy, Tournament},
};
use chrono::{DateTime, Utc};
use rand::{Rng, seq::SliceRandom};
use uuid::Uuid;

/// Smallest number of participants a bracket can be built for
pub const MIN_PARTICIPANTS: usize = 2;

/// Largest field a tournament may be created for. Keeps match numbers and
/// bracket sizes within the stored integer columns.
pub const MAX_PARTICIPANTS: u32 = 1 << 16;

/// Smallest power of two holding `n` entrants
pub fn next_power_of_two(n: usize) -> usize {
    n.max(1).next_power_of_two()
}

/// Number of rounds in a bracket of `bracket_size` slots
pub fn round_count(bracket_size: usize) -> u32 {
    bracket_size.trailing_zeros()
}

/// Matches played in `round`
pub fn matches_in_round(bracket_size: usize, round: u32) -> usize {
    bracket_size >> round
}

/// Arena index of the first match of `round`
fn round_offset(bracket_size: usize, round: u32) -> usize {
    bracket_size - (bracket_size >> (round - 1))
}

/// Arena index of a match
pub fn arena_index(bracket_size: usize, round: u32, match_number: u32) -> usize {
    round_offset(bracket_size, round) + match_number as usize - 1
}

/// Arena index of the match receiving the winner, `None` for the final
pub fn parent_index(bracket_size: usize, round: u32, match_number: u32) -> Option<usize> {
    if round >= round_count(bracket_size) {
        return None;
    }
    Some(arena_index(
        bracket_size,
        round + 1,
        match_number.div_ceil(2),
    ))
}

/// Seed number occupying each bracket slot.
///
/// Built by repeatedly splitting every seed `s` into the pair `(s, 2n + 1 - s)`,
/// which keeps seeds 1 and 2 at opposite ends and pairs seed `k` with seed
/// `size + 1 - k` in the first round.
pub fn seed_positions(bracket_size: usize) -> Vec<usize> {
    let mut seeds = vec![1usize];
    while seeds.len() < bracket_size {
        let n = seeds.len();
        seeds = seeds
            .iter()
            .flat_map(|&seed| [seed, n * 2 + 1 - seed])
            .collect();
    }
    seeds
}

/// Order active participants according to the seeding policy
pub fn order_participants<'a, R>(
    participants: &[&'a Participant],
    policy: SeedingPolicy,
    rng: &mut R,
) -> Vec<&'a Participant>
where
    R: Rng + ?Sized,
{
    let mut ordered = participants.to_vec();
    ordered.sort_by_key(|p| p.registered_at);

    match policy {
        SeedingPolicy::RegistrationOrder => {}
        SeedingPolicy::Ranking => ordered.sort_by_key(|p| (p.seed.is_none(), p.seed)),
        SeedingPolicy::Random => ordered.shuffle(rng),
    }

    ordered
}

/// First-round pairings, one `(participant1, participant2)` tuple per match.
///
/// The top `byes` seeds face an empty slot. When seeds drive placement every
/// participant takes the slot of its rank; otherwise participants fill the
/// matches in order and only the bye positions follow the seeding layout.
fn first_round_pairings(
    ordered: &[&Participant],
    bracket_size: usize,
    seeded: bool,
) -> Vec<(Option<ParticipantId>, Option<ParticipantId>)> {
    let byes = bracket_size - ordered.len();
    let positions = seed_positions(bracket_size);
    let by_seed = |seed: usize| ordered.get(seed - 1).map(|p| p.id);
    let mut in_order = ordered.iter().map(|p| p.id);

    positions
        .chunks(2)
        .map(|pair| {
            let (top, bottom) = (pair[0], pair[1]);
            match (seeded, top <= byes) {
                (true, _) => (by_seed(top), by_seed(bottom)),
                (false, true) => (in_order.next(), None),
                (false, false) => (in_order.next(), in_order.next()),
            }
        })
        .collect()
}

/// Build the complete match tree for a tournament.
///
/// Returns `bracket_size - 1` matches in arena order with bye winners already
/// propagated into the second round.
pub fn generate<R>(
    tournament: &Tournament,
    participants: &[Participant],
    policy: SeedingPolicy,
    rng: &mut R,
    now: DateTime<Utc>,
) -> TournamentResult<Vec<Match>>
where
    R: Rng + ?Sized,
{
    let active: Vec<&Participant> = participants.iter().filter(|p| p.is_active()).collect();
    if active.len() < MIN_PARTICIPANTS {
        return Err(TournamentError::InsufficientParticipants {
            needed: MIN_PARTICIPANTS,
            current: active.len(),
        });
    }

    let ordered = order_participants(&active, policy, rng);
    let seeded = policy == SeedingPolicy::Ranking && ordered.iter().any(|p| p.seed.is_some());

    let bracket_size = next_power_of_two(ordered.len());
    let rounds = round_count(bracket_size);
    let ids: Vec<Uuid> = (1..bracket_size).map(|_| Uuid::new_v4()).collect();
    let pairings = first_round_pairings(&ordered, bracket_size, seeded);

    let mut matches = Vec::with_capacity(bracket_size - 1);
    for round in 1..=rounds {
        for match_number in 1..=matches_in_round(bracket_size, round) as u32 {
            let index = arena_index(bracket_size, round, match_number);
            let (participant1_id, participant2_id) = if round == 1 {
                pairings[match_number as usize - 1]
            } else {
                (None, None)
            };
            let is_bye = round == 1 && participant2_id.is_none();

            matches.push(Match {
                id: ids[index],
                tournament_id: tournament.id,
                round,
                match_number,
                bracket_position: index as u32 + 1,
                participant1_id,
                participant2_id,
                winner_id: if is_bye { participant1_id } else { None },
                status: if is_bye {
                    MatchStatus::Bye
                } else {
                    MatchStatus::Scheduled
                },
                score: None,
                participant1_score: None,
                participant2_score: None,
                next_match_id: parent_index(bracket_size, round, match_number).map(|i| ids[i]),
                is_bye,
                started_at: None,
                completed_at: is_bye.then_some(now),
            });
        }
    }

    let bye_indices: Vec<usize> = matches
        .iter()
        .enumerate()
        .filter(|(_, m)| m.is_bye)
        .map(|(i, _)| i)
        .collect();
    for index in bye_indices {
        advance_winner(&mut matches, index)?;
    }

    Ok(matches)
}
