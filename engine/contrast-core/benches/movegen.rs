use contrast_core::rules;
use contrast_core::GameState;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

fn bench_legal_moves(c: &mut Criterion) {
    let initial = GameState::new();

    // A midgame position reached by a fixed random playout
    let mut rng = ChaCha20Rng::seed_from_u64(7);
    let mut midgame = GameState::new();
    for _ in 0..12 {
        let moves = rules::legal_moves(&midgame);
        if moves.is_empty() {
            break;
        }
        let mv = *moves.choose(&mut rng).unwrap();
        midgame.apply_move(&mv);
    }

    let mut buf = Vec::new();
    c.bench_function("legal_moves_initial", |b| {
        b.iter(|| {
            rules::legal_moves_into(black_box(&initial), &mut buf);
            black_box(buf.len())
        })
    });
    c.bench_function("legal_moves_midgame", |b| {
        b.iter(|| {
            rules::legal_moves_into(black_box(&midgame), &mut buf);
            black_box(buf.len())
        })
    });
}

fn bench_apply_move(c: &mut Criterion) {
    let state = GameState::new();
    let moves = rules::legal_moves(&state);
    let mv = moves[0];

    c.bench_function("apply_move", |b| {
        b.iter(|| {
            let mut s = black_box(state);
            s.apply_move(black_box(&mv));
            black_box(s)
        })
    });
}

criterion_group!(benches, bench_legal_moves, bench_apply_move);
criterion_main!(benches);
