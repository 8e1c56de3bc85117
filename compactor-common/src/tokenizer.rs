//! Token counting against a fixed reference vocabulary.
//!
//! Uses tiktoken-rs' cl100k_base encoding as the reference vocabulary — the
//! same one a reference sub-1B embedding model would see — so budgets
//! computed here match what a downstream consumer actually receives.

use once_cell::sync::Lazy;
use tiktoken_rs::CoreBPE;

use crate::error::CompactionError;

static ENCODER: Lazy<Result<CoreBPE, String>> =
    Lazy::new(|| tiktoken_rs::cl100k_base().map_err(|e| e.to_string()));

/// Count tokens in `text` using the global reference encoder.
///
/// # Errors
/// Returns [`CompactionError::TokenizerUnavailable`] if the reference
/// vocabulary failed to load. Unlike a heuristic byte-based estimator, this
/// never silently substitutes a cheaper approximation — callers depend on
/// the count matching what a real tokenizer would produce.
pub fn count_tokens(text: &str) -> Result<usize, CompactionError> {
    if text.is_empty() {
        return Ok(0);
    }
    match ENCODER.as_ref() {
        Ok(encoder) => Ok(encoder.encode_with_special_tokens(text).len()),
        Err(message) => Err(CompactionError::TokenizerUnavailable {
            message: message.clone(),
        }),
    }
}

/// Count tokens for every turn's text, in order.
///
/// # Errors
/// Propagates the first [`CompactionError::TokenizerUnavailable`] hit.
pub fn count_tokens_batch(texts: &[String]) -> Result<Vec<usize>, CompactionError> {
    texts.iter().map(|t| count_tokens(t)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_is_zero_tokens() {
        assert_eq!(count_tokens("").expect("tokenizer available"), 0);
    }

    #[test]
    fn nonempty_text_has_positive_tokens() {
        let n = count_tokens("Hello, world!").expect("tokenizer available");
        assert!(n > 0);
        assert!(n < 10);
    }

    #[test]
    fn deterministic_across_calls() {
        let a = count_tokens("fn main() { println!(\"hi\"); }").expect("ok");
        let b = count_tokens("fn main() { println!(\"hi\"); }").expect("ok");
        assert_eq!(a, b);
    }

    #[test]
    fn batch_matches_individual_counts() {
        let texts = vec!["alpha".to_string(), "".to_string(), "beta gamma".to_string()];
        let batch = count_tokens_batch(&texts).expect("ok");
        for (t, expected) in texts.iter().zip(batch.iter()) {
            assert_eq!(count_tokens(t).expect("ok"), *expected);
        }
    }
}
