//! Shared types, tokenizer, error taxonomy, logging, and configuration for
//! the extractive conversation-compaction workspace.

pub mod error;
pub mod logging;
pub mod options;
pub mod tokenizer;
pub mod types;

pub use error::CompactionError;
pub use options::{RemoteOptions, ScoreOptions, SelectOptions};
pub use types::{build_turns, reindex, RawRecord, RecordPart, Role, Turn, TurnKind};
