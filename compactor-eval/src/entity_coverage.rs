//! Entity/fact preservation metric for compaction evaluation.
//!
//! Bag-of-words overlap treats every token equally; this instead extracts
//! structured entities — file paths, errors, ports, URLs — from the
//! suffix of a conversation and measures what fraction survive in the
//! compacted prefix. Entity preservation is the most discriminating metric
//! for this kind of compression quality, more so than raw token overlap.

use std::collections::{HashMap, HashSet};

use compactor_common::{reindex, CompactionError, SelectOptions, Turn, TurnKind};
use compactor_core::entities::{extract_entities, EntitySet, ENTITY_TYPES};
use compactor_core::{Scorer, ScoredTurn};
use serde::Serialize;

/// Fraction of the conversation, by turn count, that forms the prefix under
/// evaluation; the remainder is the suffix whose entities must survive.
pub const DEFAULT_SPLIT_RATIO: f64 = 0.70;

/// Per-entity-type breakdown of coverage within one evaluation run.
#[derive(Debug, Clone, Serialize)]
pub struct TypeCoverage {
    pub covered: usize,
    pub total: usize,
    pub coverage: f64,
    pub weight: f64,
}

/// Full result of an entity-coverage evaluation run.
#[derive(Debug, Clone, Serialize)]
pub struct EntityCoverageResult {
    pub method: String,
    pub budget: usize,

    pub coverage: f64,
    pub weighted_coverage: f64,
    pub type_coverage: HashMap<String, TypeCoverage>,

    pub total_tokens: usize,
    pub kept_tokens: usize,
    pub compression: f64,

    pub suffix_entity_count: usize,
    pub prefix_entity_count: usize,
    pub covered_count: usize,
}

impl EntityCoverageResult {
    /// F1 of weighted entity coverage against compression efficiency
    /// (`1 - compression`): rewards methods that both preserve entities and
    /// shrink the input, penalizing a method that keeps everything.
    pub fn f1(&self) -> f64 {
        let compression_eff = 1.0 - self.compression;
        let denom = self.weighted_coverage + compression_eff;
        if denom == 0.0 {
            0.0
        } else {
            2.0 * self.weighted_coverage * compression_eff / denom
        }
    }
}

/// Compute unweighted and type-weighted coverage of `suffix_entities` by
/// `kept_entities`, plus a per-type breakdown.
pub fn compute_coverage(
    suffix_entities: &EntitySet,
    kept_entities: &EntitySet,
) -> (f64, f64, HashMap<String, TypeCoverage>) {
    let suffix_all = suffix_entities.all_entities();
    let kept_all = kept_entities.all_entities();

    if suffix_all.is_empty() {
        return (1.0, 1.0, HashMap::new());
    }

    let covered: HashSet<_> = suffix_all.intersection(&kept_all).cloned().collect();
    let unweighted = covered.len() as f64 / suffix_all.len() as f64;

    let mut total_weight = 0.0;
    let mut covered_weight = 0.0;
    let mut breakdown = HashMap::new();

    for &(etype, type_weight) in ENTITY_TYPES {
        let suffix_of_type: HashSet<&String> = suffix_all
            .iter()
            .filter(|(t, _)| t == etype)
            .map(|(_, v)| v)
            .collect();
        if suffix_of_type.is_empty() {
            continue;
        }
        let kept_of_type: HashSet<&String> = kept_all
            .iter()
            .filter(|(t, _)| t == etype)
            .map(|(_, v)| v)
            .collect();
        let covered_of_type = suffix_of_type.intersection(&kept_of_type).count();
        let type_cov = covered_of_type as f64 / suffix_of_type.len() as f64;

        total_weight += type_weight * suffix_of_type.len() as f64;
        covered_weight += type_weight * covered_of_type as f64;

        breakdown.insert(
            etype.to_string(),
            TypeCoverage {
                covered: covered_of_type,
                total: suffix_of_type.len(),
                coverage: type_cov,
                weight: type_weight,
            },
        );
    }

    let weighted = if total_weight > 0.0 { covered_weight / total_weight } else { 1.0 };
    (unweighted, weighted, breakdown)
}

/// Split `turns` at `split_ratio` (by turn count), snapping forward to the
/// next user turn so the prefix never ends mid-exchange.
fn split_at_ratio(turns: &[Turn], split_ratio: f64) -> Result<(Vec<Turn>, Vec<Turn>), CompactionError> {
    let mut split_idx = (turns.len() as f64 * split_ratio) as usize;
    while split_idx < turns.len() && turns[split_idx].kind != TurnKind::User {
        split_idx += 1;
    }

    let prefix = turns[..split_idx].to_vec();
    let suffix = turns[split_idx..].to_vec();

    if prefix.is_empty() || suffix.is_empty() {
        return Err(CompactionError::InputShape {
            message: format!(
                "split at {:.0}% ({split_idx}/{}) produced empty prefix or suffix",
                split_ratio * 100.0,
                turns.len()
            ),
        });
    }

    Ok((prefix, suffix))
}

/// Run a compaction method over `turns` and evaluate entity preservation.
///
/// Splits the conversation, compacts the prefix using `scorer`, then
/// measures what fraction of entities referenced in the (never-compacted)
/// suffix survive in the kept prefix turns.
#[allow(clippy::too_many_arguments)]
pub fn evaluate(
    turns: &[Turn],
    method: &str,
    scorer: &dyn Scorer,
    token_counts: &HashMap<usize, usize>,
    score_options: &compactor_common::ScoreOptions,
    select_options: &SelectOptions,
    split_ratio: f64,
) -> Result<EntityCoverageResult, CompactionError> {
    let (prefix_turns, suffix_turns) = split_at_ratio(turns, split_ratio)?;
    let prefix_turns = reindex(&prefix_turns);

    let suffix_text: String = suffix_turns
        .iter()
        .filter(|t| t.kind == TurnKind::System)
        .map(|t| t.text())
        .collect::<Vec<_>>()
        .join("\n");
    let suffix_entities = extract_entities(&suffix_text);
    if suffix_entities.total_count() == 0 {
        return Err(CompactionError::EntityExtractionEmpty { turns: suffix_turns.len() });
    }

    let prefix_token_counts: HashMap<usize, usize> = prefix_turns
        .iter()
        .map(|t| (t.index, token_counts.get(&t.index).copied().unwrap_or(0)))
        .collect();
    let total_prefix_tokens: usize = prefix_token_counts.values().sum();

    let prefix_long: Vec<Turn> = prefix_turns
        .iter()
        .filter(|t| {
            t.kind == TurnKind::System
                && prefix_token_counts.get(&t.index).copied().unwrap_or(0) > select_options.short_threshold
        })
        .cloned()
        .collect();

    let scored: Vec<ScoredTurn> = scorer.score(&prefix_turns, &prefix_long, &prefix_token_counts, score_options)?;
    let result = compactor_core::select_turns(&prefix_turns, &scored, &prefix_token_counts, select_options);

    let kept_text: String = result.kept_turns.iter().map(|t| t.text()).collect::<Vec<_>>().join("\n");
    let kept_entities = extract_entities(&kept_text);

    let (coverage, weighted_coverage, type_coverage) = compute_coverage(&suffix_entities, &kept_entities);
    let kept_tokens: usize = result.kept_turns.iter().map(|t| prefix_token_counts[&t.index]).sum();
    let compression = if total_prefix_tokens > 0 {
        1.0 - (kept_tokens as f64 / total_prefix_tokens as f64)
    } else {
        0.0
    };

    Ok(EntityCoverageResult {
        method: method.to_string(),
        budget: select_options.budget,
        coverage,
        weighted_coverage,
        type_coverage,
        total_tokens: total_prefix_tokens,
        kept_tokens,
        compression,
        suffix_entity_count: suffix_entities.total_count(),
        prefix_entity_count: kept_entities.total_count(),
        covered_count: (coverage * suffix_entities.total_count() as f64).round() as usize,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use compactor_common::{RawRecord, RecordPart, Role};
    use compactor_core::dedup::DedupScorer;

    fn user(index: usize, text: &str) -> Turn {
        Turn {
            index,
            kind: TurnKind::User,
            records: vec![RawRecord { role: Role::User, part: RecordPart::Text { text: text.to_string() } }],
        }
    }

    fn system(index: usize, text: &str) -> Turn {
        Turn {
            index,
            kind: TurnKind::System,
            records: vec![RawRecord { role: Role::System, part: RecordPart::Text { text: text.to_string() } }],
        }
    }

    #[test]
    fn full_overlap_yields_coverage_one() {
        let suffix = extract_entities("error in /a/b.py ValueError");
        let kept = extract_entities("we saw /a/b.py raise a ValueError earlier");
        let (unweighted, weighted, _) = compute_coverage(&suffix, &kept);
        assert!((unweighted - 1.0).abs() < 1e-9);
        assert!((weighted - 1.0).abs() < 1e-9);
    }

    #[test]
    fn no_overlap_yields_coverage_zero() {
        let suffix = extract_entities("error in /a/b.py ValueError");
        let kept = extract_entities("totally unrelated content about cooking");
        let (unweighted, _, _) = compute_coverage(&suffix, &kept);
        assert_eq!(unweighted, 0.0);
    }

    #[test]
    fn empty_suffix_entities_yields_perfect_coverage() {
        let suffix = EntitySet::default();
        let kept = extract_entities("anything at all");
        let (unweighted, weighted, breakdown) = compute_coverage(&suffix, &kept);
        assert_eq!(unweighted, 1.0);
        assert_eq!(weighted, 1.0);
        assert!(breakdown.is_empty());
    }

    #[test]
    fn evaluate_end_to_end_with_dedup_scorer() {
        let mut turns = vec![user(0, "start debugging")];
        for i in 1..=8 {
            turns.push(system(i, &format!("note about /src/file_{i}.py and ValueError")));
        }
        turns.push(user(9, "continue"));
        turns.push(system(10, "references /src/file_3.py again, still a ValueError"));

        let token_counts: HashMap<usize, usize> = turns.iter().map(|t| (t.index, t.text().len())).collect();
        let score_options = compactor_common::ScoreOptions::default();
        let select_options = SelectOptions { budget: 100_000, short_threshold: 10 };

        let scorer = DedupScorer;
        let result = evaluate(&turns, "dedup", &scorer, &token_counts, &score_options, &select_options, 0.70)
            .expect("evaluation succeeds");
        assert!(result.coverage >= 0.0 && result.coverage <= 1.0);
    }
}
