//! SetCover scorer: greedy marginal-entity-coverage selection.
//!
//! Rather than scoring each turn independently, this directly optimizes for
//! breadth of entity coverage: it greedily picks the turn that adds the most
//! weighted new entity coverage per token, until no candidate has anything
//! new to contribute. This avoids EITF's failure mode where several
//! redundant turns about the same entity crowd out turns covering distinct
//! entities.

use std::collections::{HashMap, HashSet};

use compactor_common::{CompactionError, ScoreOptions, Turn, TurnKind};
use tracing::debug;

use crate::entities::{entity_weight, extract_entities};
use crate::scorer::{Scorer, ScoredTurn};

type EntityPair = (String, String);

/// Fraction of the conversation (by turn count) after which an entity's
/// last appearance starts earning a boundary-proximity bonus.
///
/// This happens to match `compactor-eval`'s default evaluation split ratio,
/// but the two constants are independent: this one is a scorer-internal
/// weighting knob, the other is an evaluation-harness parameter. See
/// `DESIGN.md` for the decision to keep them separate despite the shared
/// default.
pub const BOUNDARY_RATIO: f64 = 0.70;

/// Recency bonus subtracted from each selected turn's emitted score, so
/// that after the selector adds its own `+0.15 * recency` bonus back on,
/// this scorer's greedy selection order is preserved. Must be changed in
/// lockstep with the selector's bonus (see `selector::RECENCY_BONUS_WEIGHT`).
pub const RECENCY_PENALTY_WEIGHT: f64 = 0.15;

/// Greedy candidate-ranking bonus — deliberately larger than the selector's
/// own recency bonus so that the internal ranking is not swamped by it.
const CANDIDATE_RECENCY_WEIGHT: f64 = 0.3;

fn collect_entities(turns: &[Turn]) -> (HashMap<usize, HashSet<EntityPair>>, HashMap<EntityPair, u32>) {
    let mut turn_entities: HashMap<usize, HashSet<EntityPair>> = HashMap::new();
    let mut entity_turn_count: HashMap<EntityPair, u32> = HashMap::new();
    for turn in turns {
        let pairs = extract_entities(&turn.text()).all_entities();
        for pair in &pairs {
            *entity_turn_count.entry(pair.clone()).or_insert(0) += 1;
        }
        turn_entities.insert(turn.index, pairs);
    }
    (turn_entities, entity_turn_count)
}

/// Score system turns via greedy set-cover over weighted entity coverage.
pub fn setcover_scores(
    full_turns: &[Turn],
    long_system_turns: &[Turn],
    token_counts: &HashMap<usize, usize>,
) -> Vec<ScoredTurn> {
    let n = full_turns.len();
    let n_f = n.max(1) as f64;

    debug!(turns = n, "[setcover] extracting entities from all turns");
    let (turn_entities, entity_turn_count) = collect_entities(full_turns);

    let boundary_start = (n as f64 * BOUNDARY_RATIO) as usize;
    let mut entity_max_position: HashMap<EntityPair, usize> = HashMap::new();
    for turn in full_turns {
        if let Some(pairs) = turn_entities.get(&turn.index) {
            for pair in pairs {
                let cur = entity_max_position.get(pair).copied().unwrap_or(0);
                if turn.index > cur || !entity_max_position.contains_key(pair) {
                    entity_max_position.insert(pair.clone(), turn.index);
                }
            }
        }
    }

    let mut entity_weight_map: HashMap<EntityPair, f64> = HashMap::new();
    for (pair, count) in &entity_turn_count {
        let type_w = entity_weight(&pair.0);
        let itf = (n_f / *count as f64).ln();
        let max_pos = entity_max_position.get(pair).copied().unwrap_or(0);
        let proximity_mult = if max_pos >= boundary_start {
            let denom = (n.saturating_sub(boundary_start)).max(1) as f64;
            1.0 + 3.0 * ((max_pos - boundary_start) as f64 / denom)
        } else {
            1.0
        };
        entity_weight_map.insert(pair.clone(), type_w * itf * proximity_mult);
    }

    let long_system_set: HashSet<usize> = long_system_turns.iter().map(|t| t.index).collect();
    let mut covered: HashSet<EntityPair> = HashSet::new();
    for turn in full_turns {
        if !long_system_set.contains(&turn.index) {
            if let Some(pairs) = turn_entities.get(&turn.index) {
                covered.extend(pairs.iter().cloned());
            }
        }
    }

    let mut candidates: HashMap<usize, &Turn> =
        long_system_turns.iter().map(|t| (t.index, t)).collect();
    let mut selected_order: Vec<usize> = Vec::new();

    debug!(
        candidates = candidates.len(),
        "[setcover] running greedy set-cover"
    );

    while !candidates.is_empty() {
        let mut best_idx: Option<usize> = None;
        let mut best_score = f64::NEG_INFINITY;

        let mut ordered_candidates: Vec<usize> = candidates.keys().copied().collect();
        ordered_candidates.sort_unstable();

        for idx in ordered_candidates {
            let empty = HashSet::new();
            let turn_pairs = turn_entities.get(&idx).unwrap_or(&empty);
            let new_entities: Vec<&EntityPair> =
                turn_pairs.iter().filter(|p| !covered.contains(*p)).collect();
            if new_entities.is_empty() {
                continue;
            }

            let tokens = token_counts.get(&idx).copied().unwrap_or(1);
            let marginal_weight: f64 = new_entities
                .iter()
                .map(|p| entity_weight_map.get(*p).copied().unwrap_or(0.0))
                .sum();
            let efficiency = marginal_weight / (tokens.max(1) as f64).sqrt();

            let recency = idx as f64 / n_f;
            let score = efficiency + CANDIDATE_RECENCY_WEIGHT * recency;

            if score > best_score {
                best_score = score;
                best_idx = Some(idx);
            }
        }

        let Some(best_idx) = best_idx else { break };
        selected_order.push(best_idx);
        if let Some(pairs) = turn_entities.get(&best_idx) {
            covered.extend(pairs.iter().cloned());
        }
        candidates.remove(&best_idx);
    }

    debug!(
        selected = selected_order.len(),
        "[setcover] ordered turns by marginal coverage"
    );

    let n_selected = selected_order.len();
    let selection_rank: HashMap<usize, usize> = selected_order
        .iter()
        .enumerate()
        .map(|(rank, &idx)| (idx, rank))
        .collect();

    long_system_turns
        .iter()
        .map(|turn| {
            let tokens = token_counts.get(&turn.index).copied().unwrap_or(0);
            let score = match selection_rank.get(&turn.index) {
                Some(&rank) => {
                    let base_score = if n_selected > 1 {
                        1.0 - 0.9 * (rank as f64 / (n_selected - 1) as f64)
                    } else {
                        1.0
                    };
                    let recency = turn.index as f64 / n_f;
                    (base_score - RECENCY_PENALTY_WEIGHT * recency).max(0.01)
                }
                None => 0.0,
            };
            ScoredTurn {
                turn_index: turn.index,
                score,
                tokens,
            }
        })
        .collect()
}

/// Registered scorer wrapper implementing the [`Scorer`] trait contract.
pub struct SetCoverScorer;

impl Scorer for SetCoverScorer {
    fn name(&self) -> &'static str {
        "setcover"
    }

    fn score(
        &self,
        full_turns: &[Turn],
        long_system_turns: &[Turn],
        token_counts: &HashMap<usize, usize>,
        _options: &ScoreOptions,
    ) -> Result<Vec<ScoredTurn>, CompactionError> {
        Ok(setcover_scores(full_turns, long_system_turns, token_counts))
    }
}
