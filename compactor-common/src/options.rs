//! Flat, explicit configuration records.
//!
//! The original implementation passes scorer knobs as `**kwargs`; here every
//! recognized option is a named field on one of two structs so a host can
//! deserialize them from TOML/JSON/env without the core knowing about any
//! particular config format.

use serde::{Deserialize, Serialize};

/// Default minimum repeated-substring length the dedup scorer treats as
/// "duplicated content" (characters).
pub const DEFAULT_MIN_REPEAT_LEN: usize = 64;

/// Default token threshold below which a system turn is always kept.
pub const DEFAULT_SHORT_THRESHOLD: usize = 300;

/// Default per-request timeout for remote scorer adapters, in seconds.
pub const DEFAULT_REMOTE_TIMEOUT_SECS: u64 = 120;

/// Default concurrency for remote scorer adapter batch requests.
pub const DEFAULT_REMOTE_CONCURRENCY: usize = 1;

/// Knobs recognized by one of the registered scorers.
///
/// Fields not relevant to the selected method are ignored by that method.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreOptions {
    /// Minimum repeated-substring length the dedup scorer treats as
    /// duplicated (characters).
    pub min_repeat_len: usize,
    /// Token budget the setcover scorer's recency weighting is aware of.
    /// Scoring itself does not enforce the budget — the selector does.
    pub budget: Option<usize>,
    /// Token threshold below which a system turn is always kept.
    pub short_threshold: usize,
    /// Device hint forwarded to a remote scorer (e.g. `"cpu"`, `"cuda:0"`).
    pub device: Option<String>,
    /// Batch size for remote scorer requests.
    pub batch_size: usize,
    /// Base URL of the remote embedding server.
    pub embed_url: Option<String>,
    /// Base URL of the remote rerank server.
    pub rerank_url: Option<String>,
}

impl Default for ScoreOptions {
    fn default() -> Self {
        Self {
            min_repeat_len: DEFAULT_MIN_REPEAT_LEN,
            budget: None,
            short_threshold: DEFAULT_SHORT_THRESHOLD,
            device: None,
            batch_size: 16,
            embed_url: None,
            rerank_url: None,
        }
    }
}

/// Knobs recognized by the selector.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectOptions {
    /// Total token budget the selected turns must fit within.
    pub budget: usize,
    /// Token threshold below which a system turn is always kept.
    pub short_threshold: usize,
}

impl Default for SelectOptions {
    fn default() -> Self {
        Self {
            budget: 0,
            short_threshold: DEFAULT_SHORT_THRESHOLD,
        }
    }
}

/// Remote scorer adapter network settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteOptions {
    /// Per-request timeout, in seconds.
    pub timeout_secs: u64,
    /// Maximum concurrent in-flight batch requests.
    pub concurrency: usize,
    /// Retry attempts before surfacing a `RemoteScorerError`.
    pub max_retries: u32,
    /// Base backoff delay between retries, in milliseconds; doubled each
    /// attempt.
    pub backoff_base_ms: u64,
}

impl Default for RemoteOptions {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_REMOTE_TIMEOUT_SECS,
            concurrency: DEFAULT_REMOTE_CONCURRENCY,
            max_retries: 3,
            backoff_base_ms: 2_000,
        }
    }
}
