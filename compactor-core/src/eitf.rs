//! EITF scorer: entity-frequency x inverse-turn-frequency, length-normalized.
//!
//! TF-IDF adapted to entity space. Turns with many rare, high-weight
//! entities score highest; length normalization keeps large tool dumps from
//! dominating purely by volume.

use std::collections::{HashMap, HashSet};

use compactor_common::{CompactionError, ScoreOptions, Turn};
use tracing::debug;

use crate::entities::{entity_weight, extract_entities};
use crate::scorer::{Scorer, ScoredTurn};

type EntityPair = (String, String);

/// Score system turns by Entity-frequency Inverse Turn Frequency.
///
/// `score(turn) = (sum of weight(type) * ITF(entity)) / sqrt(max(tokens, 1))`,
/// where `ITF(e) = ln(N / turns_containing(e))`. Recency is handled entirely
/// by the selector's bonus, not here.
pub fn eitf_scores(
    full_turns: &[Turn],
    long_system_turns: &[Turn],
    token_counts: &HashMap<usize, usize>,
) -> Vec<ScoredTurn> {
    let n = full_turns.len().max(1) as f64;

    debug!(turns = full_turns.len(), "extracting entities from all turns");
    let mut turn_entities: HashMap<usize, HashSet<EntityPair>> = HashMap::new();
    let mut entity_turn_count: HashMap<EntityPair, u32> = HashMap::new();

    for turn in full_turns {
        let pairs = extract_entities(&turn.text()).all_entities();
        for pair in &pairs {
            *entity_turn_count.entry(pair.clone()).or_insert(0) += 1;
        }
        turn_entities.insert(turn.index, pairs);
    }
    debug!(
        unique_entities = entity_turn_count.len(),
        "entity extraction complete"
    );

    let itf: HashMap<EntityPair, f64> = entity_turn_count
        .iter()
        .map(|(pair, count)| (pair.clone(), (n / *count as f64).ln()))
        .collect();

    debug!(count = long_system_turns.len(), "scoring long system turns");
    let mut results: Vec<ScoredTurn> = long_system_turns
        .iter()
        .map(|turn| {
            let empty = HashSet::new();
            let pairs = turn_entities.get(&turn.index).unwrap_or(&empty);
            let tokens = token_counts.get(&turn.index).copied().unwrap_or(1);

            let mut score = 0.0;
            for (etype, val) in pairs {
                let weight = entity_weight(etype);
                let itf_val = itf.get(&(etype.clone(), val.clone())).copied().unwrap_or(0.0);
                score += weight * itf_val;
            }
            score /= (tokens.max(1) as f64).sqrt();

            ScoredTurn {
                turn_index: turn.index,
                score,
                tokens: token_counts.get(&turn.index).copied().unwrap_or(0),
            }
        })
        .collect();

    let max_score = results
        .iter()
        .map(|st| st.score)
        .fold(f64::NEG_INFINITY, f64::max);
    let max_score = if max_score.is_finite() && max_score > 0.0 {
        max_score
    } else {
        1.0
    };
    for st in &mut results {
        st.score /= max_score;
    }

    results
}

/// Registered scorer wrapper implementing the [`Scorer`] trait contract.
pub struct EitfScorer;

impl Scorer for EitfScorer {
    fn name(&self) -> &'static str {
        "eitf"
    }

    fn score(
        &self,
        full_turns: &[Turn],
        long_system_turns: &[Turn],
        token_counts: &HashMap<usize, usize>,
        _options: &ScoreOptions,
    ) -> Result<Vec<ScoredTurn>, CompactionError> {
        Ok(eitf_scores(full_turns, long_system_turns, token_counts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compactor_common::{RawRecord, RecordPart, Role, TurnKind};

    fn system_turn(index: usize, text: &str) -> Turn {
        Turn {
            index,
            kind: TurnKind::System,
            records: vec![RawRecord {
                role: Role::System,
                part: RecordPart::Text { text: text.to_string() },
            }],
        }
    }

    #[test]
    fn normalizes_max_score_to_one() {
        let turns = vec![
            system_turn(0, "rare file /home/user/project/src/auth.py"),
            system_turn(1, "print(x) print(y) print(z)"),
        ];
        let counts: HashMap<usize, usize> = turns.iter().map(|t| (t.index, 50)).collect();
        let scored = eitf_scores(&turns, &turns, &counts);
        let max = scored.iter().map(|s| s.score).fold(f64::MIN, f64::max);
        assert!((max - 1.0).abs() < 1e-9);
    }

    #[test]
    fn rare_entity_outranks_stopword_heavy_turn() {
        let a = system_turn(0, "modifying /home/user/project/src/auth.py for the fix");
        let b = system_turn(1, &"print(x) ".repeat(20));
        let turns = vec![a, b];
        let counts: HashMap<usize, usize> = turns.iter().map(|t| (t.index, 40)).collect();
        let scored = eitf_scores(&turns, &turns, &counts);
        assert!(scored[0].score > scored[1].score);
    }

    #[test]
    fn all_scores_in_unit_interval() {
        let turns = vec![system_turn(0, "ValueError at line 5"), system_turn(1, "")];
        let counts: HashMap<usize, usize> = turns.iter().map(|t| (t.index, 10)).collect();
        let scored = eitf_scores(&turns, &turns, &counts);
        for st in scored {
            assert!((0.0..=1.0).contains(&st.score));
        }
    }
}
