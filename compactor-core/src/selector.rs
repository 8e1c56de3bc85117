//! Budget-constrained turn selection.
//!
//! Three tiers, in order of priority:
//! 1. All user turns — always kept.
//! 2. Short system turns (tokens <= `short_threshold`) — always kept.
//! 3. The most recent system turn — always kept, regardless of length.
//! 4. Remaining long system turns — scored, recency-adjusted, greedily
//!    filled until the budget runs out.

use std::collections::{HashMap, HashSet};

use compactor_common::{SelectOptions, Turn, TurnKind};

use crate::scorer::ScoredTurn;

/// Recency bonus added to a scored turn's score before sorting for greedy
/// fill. Must be changed in lockstep with
/// `setcover::RECENCY_PENALTY_WEIGHT`, which subtracts the same amount so
/// the two cancel for the setcover scorer's own internal ordering.
pub const RECENCY_BONUS_WEIGHT: f64 = 0.15;

/// Result of budget-constrained turn selection.
#[derive(Debug, Clone)]
pub struct SelectionResult {
    /// Turns kept, in original conversation order.
    pub kept_turns: Vec<Turn>,
    /// Scored turns that were dropped for exceeding the remaining budget.
    pub dropped_turns: Vec<ScoredTurn>,
    /// Scored turns that were kept (including the always-kept most-recent
    /// system turn, if it happened to be a scored candidate).
    pub kept_scored: Vec<ScoredTurn>,

    /// Tokens spent on user turns.
    pub user_tokens: usize,
    /// Tokens spent on short system turns.
    pub short_system_tokens: usize,
    /// Tokens spent on scored turns that were kept.
    pub scored_kept_tokens: usize,
    /// Tokens that would have been spent on scored turns that were dropped.
    pub scored_dropped_tokens: usize,
    /// Total tokens across the entire input.
    pub total_input_tokens: usize,
    /// The budget this selection was run against.
    pub budget: usize,
}

/// Select turns to keep within a token budget.
///
/// `turns` is the full conversation in order; `scored` carries scores for
/// long system turns only; `token_counts` covers every turn.
pub fn select_turns(
    turns: &[Turn],
    scored: &[ScoredTurn],
    token_counts: &HashMap<usize, usize>,
    options: &SelectOptions,
) -> SelectionResult {
    let total_turns = turns.len();
    let mut result = SelectionResult {
        kept_turns: Vec::new(),
        dropped_turns: Vec::new(),
        kept_scored: Vec::new(),
        user_tokens: 0,
        short_system_tokens: 0,
        scored_kept_tokens: 0,
        scored_dropped_tokens: 0,
        total_input_tokens: 0,
        budget: options.budget,
    };

    let scored_map: HashMap<usize, &ScoredTurn> =
        scored.iter().map(|st| (st.turn_index, st)).collect();

    let mut kept_indices: HashSet<usize> = HashSet::new();

    for turn in turns {
        let tc = token_counts.get(&turn.index).copied().unwrap_or(0);
        result.total_input_tokens += tc;

        match turn.kind {
            TurnKind::User => {
                kept_indices.insert(turn.index);
                result.user_tokens += tc;
            }
            TurnKind::System if tc <= options.short_threshold => {
                kept_indices.insert(turn.index);
                result.short_system_tokens += tc;
            }
            TurnKind::System => {}
        }
    }

    let mut used_tokens = result.user_tokens + result.short_system_tokens;

    let last_system = turns.iter().rev().find(|t| t.kind == TurnKind::System);
    if let Some(last_system) = last_system {
        if !kept_indices.contains(&last_system.index) {
            let tc = token_counts.get(&last_system.index).copied().unwrap_or(0);
            kept_indices.insert(last_system.index);
            used_tokens += tc;
            if let Some(&st) = scored_map.get(&last_system.index) {
                result.kept_scored.push(st.clone());
            }
        }
    }

    let mut adjusted: Vec<(f64, &ScoredTurn)> = scored
        .iter()
        .filter(|st| !kept_indices.contains(&st.turn_index))
        .map(|st| {
            let recency = if total_turns > 0 {
                st.turn_index as f64 / total_turns as f64
            } else {
                0.0
            };
            (st.score + RECENCY_BONUS_WEIGHT * recency, st)
        })
        .collect();
    adjusted.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(b.1.turn_index.cmp(&a.1.turn_index))
    });

    let mut remaining = options.budget as i64 - used_tokens as i64;

    for (_, st) in adjusted {
        if (st.tokens as i64) <= remaining {
            kept_indices.insert(st.turn_index);
            result.kept_scored.push(st.clone());
            result.scored_kept_tokens += st.tokens;
            remaining -= st.tokens as i64;
        } else {
            result.dropped_turns.push(st.clone());
            result.scored_dropped_tokens += st.tokens;
        }
    }

    let mut kept: Vec<Turn> = turns
        .iter()
        .filter(|t| kept_indices.contains(&t.index))
        .cloned()
        .collect();
    kept.sort_by_key(|t| t.index);
    result.kept_turns = kept;

    result
}
