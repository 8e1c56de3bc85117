//! Error taxonomy shared by every crate in the workspace.
//!
//! One enum covers every failure mode a caller can hit across parsing,
//! tokenizing, scoring, selecting, and evaluating. Variants carry enough
//! structured context for a host to format its own message; nothing here
//! calls `std::process::exit` or prints to stdout.

use thiserror::Error;

/// Unified error type for the compaction pipeline.
#[derive(Debug, Error)]
pub enum CompactionError {
    /// Input did not have the shape an operation requires.
    #[error("input shape error: {message}")]
    InputShape { message: String },

    /// A scorer method name was requested that is not in the registry.
    #[error("unknown scoring method: {method}")]
    UnknownMethod { method: String },

    /// A remote scorer adapter failed after exhausting its retries.
    #[error("remote scorer '{adapter}' failed: {message}")]
    RemoteScorerError { adapter: &'static str, message: String },

    /// Entity extraction over the evaluation suffix produced no entities.
    #[error("no entities found in evaluation suffix ({turns} turns)")]
    EntityExtractionEmpty { turns: usize },

    /// The reference tokenizer could not be loaded.
    #[error("tokenizer unavailable: {message}")]
    TokenizerUnavailable { message: String },

    /// A probe cache file was present but could not be parsed.
    #[error("probe cache corrupt at {path}: {message}")]
    CacheCorrupt { path: String, message: String },

    /// A registered method name has no in-core scorer and requires a
    /// caller-supplied producer (e.g. `claude-code`'s external summarizer).
    #[error("method '{method}' is registered but requires a caller-supplied producer")]
    ExternalProducerRequired { method: &'static str },
}

impl CompactionError {
    /// Whether a caller might reasonably retry the operation unchanged.
    ///
    /// Only remote-scorer failures are retryable; everything else depends on
    /// the input or configuration and will fail again identically.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CompactionError::RemoteScorerError { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_scorer_error_is_retryable() {
        let err = CompactionError::RemoteScorerError {
            adapter: "llama-embed",
            message: "connection reset".to_string(),
        };
        assert!(err.is_retryable());
        assert!(err.to_string().contains("llama-embed"));
    }

    #[test]
    fn unknown_method_is_not_retryable() {
        let err = CompactionError::UnknownMethod {
            method: "bogus".to_string(),
        };
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("bogus"));
    }
}
