//! Reranking scorer backed by a llama.cpp server (`/v1/rerank`).
//!
//! Unlike [`crate::llama_embed::LlamaEmbedScorer`], the server computes
//! relevance directly from the `(query, document)` pair and returns a score
//! per document — no client-side similarity math.

use std::collections::HashMap;

use compactor_common::{CompactionError, RemoteOptions, ScoreOptions, Turn};
use compactor_core::ScoredTurn;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::retry::with_retry;

/// Characters a document is truncated to before sending.
const MAX_DOC_CHARS: usize = 2048;

/// Documents sent per rerank request.
const RERANK_BATCH: usize = 64;

#[derive(Serialize)]
struct RerankRequest<'a> {
    query: &'a str,
    documents: &'a [String],
}

#[derive(Deserialize)]
struct RerankResult {
    index: usize,
    relevance_score: f64,
}

#[derive(Deserialize)]
struct RerankResponse {
    results: Vec<RerankResult>,
}

/// Scores turns via a cross-encoder reranking server.
pub struct LlamaRerankScorer {
    url: String,
    health_url: String,
    client: reqwest::Client,
}

impl LlamaRerankScorer {
    /// Build a scorer targeting `base_url`. Does not contact the server.
    pub fn new(base_url: &str, options: &RemoteOptions) -> Result<Self, CompactionError> {
        let base = base_url.trim_end_matches('/');
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(options.timeout_secs))
            .build()
            .map_err(|e| CompactionError::RemoteScorerError { adapter: "llama-rerank", message: e.to_string() })?;
        Ok(Self { url: format!("{base}/v1/rerank"), health_url: format!("{base}/health"), client })
    }

    /// Confirm the server is reachable before sending scoring requests.
    pub async fn health_check(&self) -> Result<(), CompactionError> {
        let resp = self
            .client
            .get(&self.health_url)
            .send()
            .await
            .map_err(|e| CompactionError::RemoteScorerError { adapter: "llama-rerank", message: e.to_string() })?;
        if !resp.status().is_success() {
            return Err(CompactionError::RemoteScorerError {
                adapter: "llama-rerank",
                message: format!("health check returned {}", resp.status()),
            });
        }
        Ok(())
    }

    async fn rerank(&self, query: &str, documents: &[String]) -> Result<Vec<f64>, CompactionError> {
        let resp = self
            .client
            .post(&self.url)
            .json(&RerankRequest { query, documents })
            .send()
            .await
            .map_err(|e| CompactionError::RemoteScorerError { adapter: "llama-rerank", message: e.to_string() })?;

        if !resp.status().is_success() {
            return Err(CompactionError::RemoteScorerError {
                adapter: "llama-rerank",
                message: format!("rerank request returned {}", resp.status()),
            });
        }

        let mut body: RerankResponse = resp
            .json()
            .await
            .map_err(|e| CompactionError::RemoteScorerError { adapter: "llama-rerank", message: e.to_string() })?;
        body.results.sort_by_key(|r| r.index);
        Ok(body.results.into_iter().map(|r| r.relevance_score).collect())
    }

    /// Score `system_turns` against `query`, batching requests at
    /// [`RERANK_BATCH`] documents each, independent of `options.batch_size`.
    pub async fn score_turns(
        &self,
        system_turns: &[Turn],
        query: &str,
        token_counts: &HashMap<usize, usize>,
        _options: &ScoreOptions,
        remote_options: &RemoteOptions,
    ) -> Result<Vec<ScoredTurn>, CompactionError> {
        let mut scores: Vec<f64> = Vec::with_capacity(system_turns.len());

        for (done, batch) in system_turns.chunks(RERANK_BATCH).enumerate() {
            let documents: Vec<String> = batch
                .iter()
                .map(|t| t.text().chars().take(MAX_DOC_CHARS).collect())
                .collect();
            let batch_scores = with_retry("llama-rerank", remote_options, || {
                let documents = documents.clone();
                async move { self.rerank(query, &documents).await }
            })
            .await?;
            scores.extend(batch_scores);
            debug!(done = (done + 1) * RERANK_BATCH, total = system_turns.len(), "reranked batch");
        }

        Ok(system_turns
            .iter()
            .zip(scores.iter())
            .map(|(turn, &score)| ScoredTurn {
                turn_index: turn.index,
                score,
                tokens: token_counts.get(&turn.index).copied().unwrap_or(0),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let options = RemoteOptions::default();
        let scorer = LlamaRerankScorer::new("http://localhost:8081/", &options).expect("builds");
        assert_eq!(scorer.url, "http://localhost:8081/v1/rerank");
        assert_eq!(scorer.health_url, "http://localhost:8081/health");
    }
}
