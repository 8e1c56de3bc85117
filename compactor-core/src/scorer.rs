//! The scorer contract and method registry.
//!
//! Every scoring method — local or remote — implements [`Scorer`] and is
//! registered under a name; callers look methods up by name rather than by
//! concrete type, mirroring the registry-of-callables pattern the reference
//! implementation uses (`SCORERS: dict[str, Scorer]`).

use std::collections::HashMap;

use compactor_common::{CompactionError, ScoreOptions, Turn};

/// A turn paired with its relevance score and token count.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredTurn {
    /// Index of the scored turn.
    pub turn_index: usize,
    /// Relevance score, normalized to `[0, 1]` by convention (scorers are
    /// responsible for their own normalization).
    pub score: f64,
    /// Token count of the scored turn.
    pub tokens: usize,
}

/// Uniform contract every scoring method satisfies.
///
/// `score` receives the full turn sequence (for corpus-wide statistics like
/// ITF), the subset of long system turns actually being scored, and their
/// token counts, and returns one [`ScoredTurn`] per long system turn in the
/// same order it was given.
pub trait Scorer: Send + Sync {
    /// The name this scorer is registered under.
    fn name(&self) -> &'static str;

    /// Score `long_system_turns` using `full_turns` for corpus statistics.
    fn score(
        &self,
        full_turns: &[Turn],
        long_system_turns: &[Turn],
        token_counts: &HashMap<usize, usize>,
        options: &ScoreOptions,
    ) -> Result<Vec<ScoredTurn>, CompactionError>;
}

/// Method-name-keyed registry of scorers.
#[derive(Default)]
pub struct ScorerRegistry {
    scorers: HashMap<&'static str, Box<dyn Scorer>>,
}

impl ScorerRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a scorer under its own `name()`.
    pub fn register(&mut self, scorer: Box<dyn Scorer>) -> &mut Self {
        self.scorers.insert(scorer.name(), scorer);
        self
    }

    /// Look up a scorer by method name.
    ///
    /// # Errors
    /// Returns [`CompactionError::UnknownMethod`] if `method` was never
    /// registered.
    pub fn get(&self, method: &str) -> Result<&dyn Scorer, CompactionError> {
        self.scorers
            .get(method)
            .map(|b| b.as_ref())
            .ok_or_else(|| CompactionError::UnknownMethod {
                method: method.to_string(),
            })
    }

    /// Names of every registered scorer.
    pub fn methods(&self) -> Vec<&'static str> {
        self.scorers.keys().copied().collect()
    }
}

/// Marker registration for `claude-code`: an out-of-scope LLM summarizer
/// that wraps its output as a synthetic single-turn result. The registry
/// recognizes the name so lookups don't produce `UnknownMethod`, but the
/// core ships no implementation — invoking it without a caller-supplied
/// producer is a caller error, surfaced as `ExternalProducerRequired`.
struct ClaudeCodePlaceholder;

impl Scorer for ClaudeCodePlaceholder {
    fn name(&self) -> &'static str {
        "claude-code"
    }

    fn score(
        &self,
        _full_turns: &[Turn],
        _long_system_turns: &[Turn],
        _token_counts: &HashMap<usize, usize>,
        _options: &ScoreOptions,
    ) -> Result<Vec<ScoredTurn>, CompactionError> {
        Err(CompactionError::ExternalProducerRequired { method: "claude-code" })
    }
}

/// Build the registry of local, non-network scorers: `dedup`, `eitf`,
/// `setcover`, plus the `claude-code` name marker (see
/// [`ClaudeCodePlaceholder`]).
pub fn local_registry() -> ScorerRegistry {
    let mut registry = ScorerRegistry::new();
    registry
        .register(Box::new(crate::dedup::DedupScorer))
        .register(Box::new(crate::eitf::EitfScorer))
        .register(Box::new(crate::setcover::SetCoverScorer))
        .register(Box::new(ClaudeCodePlaceholder));
    registry
}

/// Build a `(query, document)` pair from the conversation's most recent user
/// turns, for scorers that need a query string (remote embed/rerank
/// adapters).
///
/// Uses the last up to 3 user turns, joined with `\n---\n`, truncated from
/// the tail to `max_chars`.
pub fn build_query(user_turns: &[Turn], max_chars: usize) -> String {
    let recent: &[Turn] = if user_turns.len() >= 3 {
        &user_turns[user_turns.len() - 3..]
    } else {
        user_turns
    };
    let parts: Vec<String> = recent.iter().map(Turn::text).collect();
    let query = parts.join("\n---\n");
    if query.chars().count() > max_chars {
        let skip = query.chars().count() - max_chars;
        query.chars().skip(skip).collect()
    } else {
        query
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compactor_common::{RawRecord, RecordPart, Role};

    fn user_turn(index: usize, text: &str) -> Turn {
        Turn {
            index,
            kind: compactor_common::TurnKind::User,
            records: vec![RawRecord {
                role: Role::User,
                part: RecordPart::Text { text: text.to_string() },
            }],
        }
    }

    #[test]
    fn unknown_method_errors() {
        let registry = local_registry();
        let result = registry.get("bogus");
        assert!(matches!(result, Err(CompactionError::UnknownMethod { .. })));
    }

    #[test]
    fn known_methods_are_registered() {
        let registry = local_registry();
        let methods = registry.methods();
        assert!(methods.contains(&"dedup"));
        assert!(methods.contains(&"eitf"));
        assert!(methods.contains(&"setcover"));
        assert!(methods.contains(&"claude-code"));
    }

    #[test]
    fn claude_code_lookup_succeeds_but_scoring_requires_external_producer() {
        let registry = local_registry();
        let scorer = registry.get("claude-code").expect("name is registered");
        let err = scorer.score(&[], &[], &HashMap::new(), &ScoreOptions::default()).unwrap_err();
        assert!(matches!(err, CompactionError::ExternalProducerRequired { method: "claude-code" }));
    }

    #[test]
    fn build_query_uses_last_three_user_turns() {
        let turns = vec![
            user_turn(0, "first"),
            user_turn(2, "second"),
            user_turn(4, "third"),
            user_turn(6, "fourth"),
        ];
        let query = build_query(&turns, 4000);
        assert!(!query.contains("first"));
        assert!(query.contains("second"));
        assert!(query.contains("fourth"));
    }

    #[test]
    fn build_query_truncates_from_tail() {
        let turns = vec![user_turn(0, &"x".repeat(10))];
        let query = build_query(&turns, 5);
        assert_eq!(query.chars().count(), 5);
        assert!(query.chars().all(|c| c == 'x'));
    }
}
