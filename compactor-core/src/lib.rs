//! Extractive scoring and selection: entity extraction, the suffix
//! automaton, the three local scorers (dedup, EITF, setcover), and the
//! budget-constrained selector.

pub mod automaton;
pub mod dedup;
pub mod eitf;
pub mod entities;
pub mod scorer;
pub mod selector;
pub mod setcover;

pub use entities::{entity_weight, extract_entities, EntitySet, ENTITY_TYPES};
pub use scorer::{build_query, local_registry, Scorer, ScorerRegistry, ScoredTurn};
pub use selector::{select_turns, SelectionResult};
