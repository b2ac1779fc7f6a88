use chrono::Utc;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use federation::tournament::{
    MatchStatus, NewTournament, Participant, ParticipantStatus, SeedingPolicy, Tournament,
    TournamentFormat,
    advancement::advance_winner,
    bracket::{generate, seed_positions},
};
use rand::{SeedableRng, rngs::StdRng};
use std::hint::black_box;
use uuid::Uuid;

/// Helper to create a tournament with N seeded participants
fn setup_tournament(n: usize) -> (Tournament, Vec<Participant>) {
    let tournament = Tournament::new(
        NewTournament {
            name: "Benchmark Open".to_string(),
            max_participants: n as u32,
            tournament_format: TournamentFormat::SingleElimination,
        },
        Utc::now(),
    );
    let participants = (0..n)
        .map(|i| Participant {
            id: Uuid::new_v4(),
            tournament_id: tournament.id,
            member_id: i as i64,
            status: ParticipantStatus::Registered,
            seed: Some(i as u32 + 1),
            notes: None,
            registered_at: Utc::now(),
        })
        .collect();
    (tournament, participants)
}

/// Benchmark bracket generation across field sizes and policies
fn bench_generate(c: &mut Criterion) {
    let mut group = c.benchmark_group("bracket_generate");

    for n in [8usize, 37, 128, 1000] {
        let (tournament, participants) = setup_tournament(n);
        for policy in [SeedingPolicy::Ranking, SeedingPolicy::Random] {
            group.bench_with_input(
                BenchmarkId::new(policy.as_str(), n),
                &participants,
                |b, participants| {
                    b.iter(|| {
                        let mut rng = StdRng::seed_from_u64(7);
                        generate(
                            &tournament,
                            black_box(participants),
                            policy,
                            &mut rng,
                            Utc::now(),
                        )
                    });
                },
            );
        }
    }

    group.finish();
}

/// Benchmark standard seed layout
fn bench_seed_positions(c: &mut Criterion) {
    c.bench_function("seed_positions_1024", |b| {
        b.iter(|| seed_positions(black_box(1024)));
    });
}

/// Benchmark playing a full bracket to its final
fn bench_play_out(c: &mut Criterion) {
    let (tournament, participants) = setup_tournament(256);
    let mut rng = StdRng::seed_from_u64(7);
    let Ok(bracket) = generate(
        &tournament,
        &participants,
        SeedingPolicy::Ranking,
        &mut rng,
        Utc::now(),
    ) else {
        return;
    };

    c.bench_function("play_out_256", |b| {
        b.iter(|| {
            let mut matches = bracket.clone();
            for index in 0..matches.len() {
                let m = &mut matches[index];
                m.winner_id = m.participant1_id;
                m.status = MatchStatus::Completed;
                let _ = advance_winner(&mut matches, index);
            }
            matches
        });
    });
}

criterion_group!(benches, bench_generate, bench_seed_positions, bench_play_out);
criterion_main!(benches);
