use std::collections::HashMap;

use compactor_common::{RawRecord, RecordPart, Role, Turn, TurnKind};
use compactor_core::dedup::dedup_scores;
use compactor_core::eitf::eitf_scores;
use compactor_core::setcover::setcover_scores;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn system_turn(index: usize, text: String) -> Turn {
    Turn {
        index,
        kind: TurnKind::System,
        records: vec![RawRecord { role: Role::System, part: RecordPart::Text { text } }],
    }
}

/// A synthetic conversation shaped like a long coding-assistant session:
/// tool-dump-heavy system turns with some repeated boilerplate and a
/// scattering of distinct file paths and errors.
fn synthetic_conversation(turn_count: usize) -> Vec<Turn> {
    let boilerplate = "running pytest -q\ncollected 40 items\n".repeat(10);
    (0..turn_count)
        .map(|i| {
            let text = format!(
                "{boilerplate}\nTraceback in /src/module_{m}/handler.py line {l}: ValueError: bad input at port {p}",
                m = i % 7,
                l = 100 + i,
                p = 8000 + (i % 12),
            );
            system_turn(i, text)
        })
        .collect()
}

fn bench_scorers(c: &mut Criterion) {
    let turns = synthetic_conversation(500);
    let token_counts: HashMap<usize, usize> =
        turns.iter().map(|t| (t.index, t.text().chars().count())).collect();

    c.bench_function("dedup_scores_500_turns", |b| {
        b.iter(|| black_box(dedup_scores(&turns, &turns, &token_counts, 64)))
    });

    c.bench_function("eitf_scores_500_turns", |b| {
        b.iter(|| black_box(eitf_scores(&turns, &turns, &token_counts)))
    });

    c.bench_function("setcover_scores_500_turns", |b| {
        b.iter(|| black_box(setcover_scores(&turns, &turns, &token_counts)))
    });
}

criterion_group!(benches, bench_scorers);
criterion_main!(benches);
