//! Dedup scorer: unique-content ratio via a suffix automaton over the whole
//! conversation.

use std::collections::HashMap;

use compactor_common::{CompactionError, ScoreOptions, Turn};
use tracing::debug;

use crate::automaton::SuffixAutomaton;
use crate::scorer::{Scorer, ScoredTurn};

const SEPARATOR: char = '\u{0}';

fn build_automaton(turns: &[Turn]) -> SuffixAutomaton {
    let mut sa = SuffixAutomaton::new();
    let mut pos = 0;
    for turn in turns {
        for c in turn.text().chars() {
            sa.extend(c, pos);
            pos += 1;
        }
        sa.extend(SEPARATOR, pos);
        pos += 1;
    }
    sa.propagate_counts();
    sa
}

/// Fraction of `text` not covered by a repeated run of at least
/// `min_repeat_len` characters, per the reference greedy interval sweep.
fn turn_unique_ratio(sa: &SuffixAutomaton, text: &str, min_repeat_len: usize) -> f64 {
    if text.is_empty() {
        return 1.0;
    }
    let match_lens = sa.match_repeated_length(text);
    let total = text.chars().count();
    let mut duplicated: i64 = 0;
    let mut covered_until: i64 = -1;

    for (i, &ml) in match_lens.iter().enumerate() {
        if ml >= min_repeat_len {
            let i = i as i64;
            let ml = ml as i64;
            let start = i - ml + 1;
            if start > covered_until {
                duplicated += ml;
            } else if i > covered_until {
                duplicated += i - covered_until;
            }
            covered_until = covered_until.max(i);
        }
    }

    let unique = total as i64 - duplicated;
    unique.max(0) as f64 / total as f64
}

/// Score system turns by unique content ratio using a suffix automaton.
pub fn dedup_scores(
    full_turns: &[Turn],
    long_system_turns: &[Turn],
    token_counts: &HashMap<usize, usize>,
    min_repeat_len: usize,
) -> Vec<ScoredTurn> {
    debug!(turns = full_turns.len(), "building suffix automaton");
    let sa = build_automaton(full_turns);
    debug!(states = sa.state_count(), "automaton built");

    long_system_turns
        .iter()
        .map(|turn| {
            let text = turn.text();
            let ratio = turn_unique_ratio(&sa, &text, min_repeat_len);
            ScoredTurn {
                turn_index: turn.index,
                score: ratio,
                tokens: token_counts.get(&turn.index).copied().unwrap_or(0),
            }
        })
        .collect()
}

/// Registered scorer wrapper implementing the [`Scorer`] trait contract.
pub struct DedupScorer;

impl Scorer for DedupScorer {
    fn name(&self) -> &'static str {
        "dedup"
    }

    fn score(
        &self,
        full_turns: &[Turn],
        long_system_turns: &[Turn],
        token_counts: &HashMap<usize, usize>,
        options: &ScoreOptions,
    ) -> Result<Vec<ScoredTurn>, CompactionError> {
        Ok(dedup_scores(
            full_turns,
            long_system_turns,
            token_counts,
            options.min_repeat_len,
        ))
    }
}
