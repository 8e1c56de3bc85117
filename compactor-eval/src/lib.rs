//! Extractive-compaction evaluation: entity-coverage (suffix entity
//! preservation) and evidence-coverage (probe evidence-turn retention).

pub mod cache;
pub mod entity_coverage;
pub mod evidence_coverage;
pub mod probes;

pub use entity_coverage::{compute_coverage, evaluate, EntityCoverageResult, DEFAULT_SPLIT_RATIO};
pub use evidence_coverage::{compute_evidence_coverage, EvidenceCoverageResult};
pub use probes::{Probe, ProbeSet, DIMENSIONS};
