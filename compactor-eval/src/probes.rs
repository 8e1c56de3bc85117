//! Probe types for the evidence-coverage evaluator.
//!
//! Probe *generation* (an LLM reading the full conversation and proposing
//! judge questions) is an offline, human-in-the-loop step that lives outside
//! this crate; what lives here is the on-disk shape a generated probe set
//! takes and the dimension weights [`evidence_coverage`] scores against.

use serde::{Deserialize, Serialize};

/// Scoring dimensions and their composite weights. Must sum to 1.0.
pub const DIMENSIONS: &[(&str, f64)] = &[
    ("error_solution", 0.30),
    ("instruction", 0.25),
    ("progress", 0.25),
    ("environment", 0.15),
    ("noise", 0.05),
];

/// A single evaluation probe: a question answerable from the prefix, with
/// the turns that contain the evidence needed to answer it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Probe {
    pub id: String,
    pub dimension: String,
    pub tier: String,
    pub question: String,
    pub gold_answer: String,
    #[serde(default)]
    pub evidence_turns: Vec<usize>,
    #[serde(default = "default_difficulty")]
    pub difficulty: String,
}

fn default_difficulty() -> String {
    "medium".to_string()
}

/// A generated, cacheable set of probes for one (conversation, split_ratio)
/// pair.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProbeSet {
    #[serde(default)]
    pub probes: Vec<Probe>,
    #[serde(default)]
    pub conv_hash: String,
    #[serde(default = "default_split_ratio")]
    pub split_ratio: f64,
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_split_ratio() -> f64 {
    0.70
}

fn default_version() -> String {
    "1".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_weights_sum_to_one() {
        let sum: f64 = DIMENSIONS.iter().map(|(_, w)| w).sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn probe_set_round_trips_through_json() {
        let set = ProbeSet {
            probes: vec![Probe {
                id: "esr_001".to_string(),
                dimension: "error_solution".to_string(),
                tier: "factual".to_string(),
                question: "What port failed?".to_string(),
                gold_answer: "8080".to_string(),
                evidence_turns: vec![3, 5],
                difficulty: "easy".to_string(),
            }],
            conv_hash: "abc123".to_string(),
            split_ratio: 0.70,
            version: "1".to_string(),
        };
        let json = serde_json::to_string(&set).expect("serializes");
        let back: ProbeSet = serde_json::from_str(&json).expect("deserializes");
        assert_eq!(back.probes.len(), 1);
        assert_eq!(back.probes[0].evidence_turns, vec![3, 5]);
    }
}
