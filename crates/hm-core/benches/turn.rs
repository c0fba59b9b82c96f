use criterion::{Criterion, black_box, criterion_group, criterion_main};

use hm_core::{CoherenceField, RoundRecord, build_superposition, collapse, score_round};

fn history(len: u64) -> Vec<RoundRecord> {
    let mut rounds: Vec<RoundRecord> = Vec::new();
    let mut v = 0.5;
    for idx in 0..len {
        let r = score_round(idx, &format!("bench round {idx} message body"), v, &rounds);
        v = r.v;
        rounds.push(r);
    }
    rounds
}

fn bench_score_round(c: &mut Criterion) {
    let prior = history(50);
    c.bench_function("score_round", |b| {
        b.iter(|| {
            score_round(
                black_box(51),
                black_box("a reasonably sized user message with varied words"),
                black_box(7.12),
                black_box(&prior),
            )
        })
    });
}

fn bench_collapse_8_candidates(c: &mut Criterion) {
    let candidates: Vec<String> = (0..8)
        .map(|i| format!("candidate reply number {i} with a plausible amount of text in it"))
        .collect();
    c.bench_function("collapse_8", |b| {
        b.iter(|| {
            let states = build_superposition(black_box(&candidates), black_box(0.72));
            collapse(states, black_box(0.72), black_box(3), black_box(7.12))
        })
    });
}

fn bench_field_fold_200(c: &mut Criterion) {
    let rounds = history(200);
    c.bench_function("field_fold_200", |b| {
        b.iter(|| CoherenceField::fold(black_box(&rounds)))
    });
}

criterion_group!(
    benches,
    bench_score_round,
    bench_collapse_8_candidates,
    bench_field_fold_200
);
criterion_main!(benches);
