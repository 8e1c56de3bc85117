//! Evidence turn coverage: what fraction of a probe's cited evidence turns
//! survived compaction.
//!
//! Each cached [`Probe`] names the turns that contain the evidence needed to
//! answer it; after compaction we only need to check set membership against
//! the kept turn indices — no LLM calls, no re-reading the conversation.

use std::collections::HashSet;

use serde::Serialize;

use crate::probes::{ProbeSet, DIMENSIONS};

/// Difficulty multipliers used by the NDCG composite.
pub const DIFFICULTY_WEIGHTS: &[(&str, f64)] = &[("easy", 1.0), ("medium", 2.0), ("hard", 3.0)];

fn difficulty_weight(difficulty: &str) -> f64 {
    DIFFICULTY_WEIGHTS
        .iter()
        .find(|(name, _)| *name == difficulty)
        .map(|(_, w)| *w)
        .unwrap_or(1.0)
}

/// Coverage result for a single probe.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeCoverage {
    pub probe_id: String,
    pub dimension: String,
    pub difficulty: String,
    pub evidence_turns: Vec<usize>,
    pub kept_evidence: Vec<usize>,
    pub dropped_evidence: Vec<usize>,
    pub coverage: f64,
}

/// Aggregated coverage across all probes in one dimension.
#[derive(Debug, Clone, Serialize)]
pub struct DimensionCoverage {
    pub dimension: String,
    pub weight: f64,
    pub mean_coverage: f64,
    pub probe_count: usize,
    pub coverages: Vec<f64>,
}

/// Full evidence-coverage result for one compaction run.
#[derive(Debug, Clone, Serialize)]
pub struct EvidenceCoverageResult {
    pub method: String,
    pub budget: usize,
    pub dimensions: Vec<DimensionCoverage>,
    pub composite: f64,
    pub ndcg: f64,
    pub probe_details: Vec<ProbeCoverage>,
}

/// Discounted cumulative gain over `(coverage, difficulty_weight)` pairs,
/// ranked hardest-first.
fn dcg(scores_with_weights: &[(f64, f64)]) -> f64 {
    let mut items: Vec<(f64, f64)> = scores_with_weights.to_vec();
    items.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    items
        .iter()
        .enumerate()
        .map(|(i, (score, weight))| (score * weight) / ((i as f64 + 2.0).log2()))
        .sum()
}

/// Compute per-probe, per-dimension, and composite evidence coverage.
pub fn compute_evidence_coverage(
    probe_set: &ProbeSet,
    kept_turn_indices: &HashSet<usize>,
    method: &str,
    budget: usize,
) -> EvidenceCoverageResult {
    let mut probe_details: Vec<ProbeCoverage> = Vec::new();
    let mut by_dim: std::collections::HashMap<String, Vec<usize>> = std::collections::HashMap::new();

    for probe in &probe_set.probes {
        if probe.evidence_turns.is_empty() {
            continue;
        }
        let kept: Vec<usize> = probe.evidence_turns.iter().copied().filter(|i| kept_turn_indices.contains(i)).collect();
        let dropped: Vec<usize> =
            probe.evidence_turns.iter().copied().filter(|i| !kept_turn_indices.contains(i)).collect();
        let coverage = kept.len() as f64 / probe.evidence_turns.len() as f64;

        by_dim.entry(probe.dimension.clone()).or_default().push(probe_details.len());
        probe_details.push(ProbeCoverage {
            probe_id: probe.id.clone(),
            dimension: probe.dimension.clone(),
            difficulty: probe.difficulty.clone(),
            evidence_turns: probe.evidence_turns.clone(),
            kept_evidence: kept,
            dropped_evidence: dropped,
            coverage,
        });
    }

    let mut dimensions = Vec::new();
    let mut all_scored: Vec<(f64, f64)> = Vec::new();

    for &(dim_name, dim_weight) in DIMENSIONS {
        let indices = by_dim.get(dim_name).cloned().unwrap_or_default();
        if indices.is_empty() {
            dimensions.push(DimensionCoverage {
                dimension: dim_name.to_string(),
                weight: dim_weight,
                mean_coverage: 0.0,
                probe_count: 0,
                coverages: Vec::new(),
            });
            continue;
        }

        let coverages: Vec<f64> = indices.iter().map(|&i| probe_details[i].coverage).collect();
        let mean_cov = coverages.iter().sum::<f64>() / coverages.len() as f64;

        for &i in &indices {
            all_scored.push((probe_details[i].coverage, difficulty_weight(&probe_details[i].difficulty)));
        }

        dimensions.push(DimensionCoverage {
            dimension: dim_name.to_string(),
            weight: dim_weight,
            mean_coverage: mean_cov,
            probe_count: coverages.len(),
            coverages,
        });
    }

    let composite: f64 = dimensions.iter().map(|d| d.weight * d.mean_coverage).sum();

    let ndcg = if all_scored.is_empty() {
        0.0
    } else {
        let actual = dcg(&all_scored);
        let ideal: Vec<(f64, f64)> = all_scored.iter().map(|&(_, w)| (1.0, w)).collect();
        let ideal_dcg = dcg(&ideal);
        if ideal_dcg > 0.0 {
            actual / ideal_dcg
        } else {
            0.0
        }
    };

    EvidenceCoverageResult {
        method: method.to_string(),
        budget,
        dimensions,
        composite,
        ndcg,
        probe_details,
    }
}
