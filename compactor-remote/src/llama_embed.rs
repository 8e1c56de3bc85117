//! Embedding scorer backed by a llama.cpp server (`/v1/embeddings`).
//!
//! Scores turns by cosine similarity between a query embedding (built from
//! the conversation's most recent user turns) and a document embedding for
//! each candidate turn. Similarity math happens client-side; the server only
//! returns vectors.

use std::collections::HashMap;

use compactor_common::{CompactionError, RemoteOptions, ScoreOptions, Turn};
use compactor_core::ScoredTurn;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::retry::with_retry;

const QUERY_INSTRUCTION: &str = "Find assistant responses from an AI coding conversation that contain information needed to continue the current task: code changes, decisions, errors, file paths, architectural context, or unfinished work.";
const DOC_INSTRUCTION: &str = "AI coding assistant response from a conversation history";

/// Characters a document is truncated to before sending — a rough proxy for
/// the server's own token-level truncation.
const MAX_DOC_CHARS: usize = 2048;

fn instruct(instruction: &str, text: &str) -> String {
    format!("Instruct: {instruction}\nQuery: {text}")
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a [String],
    model: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

/// Scores turns via cosine similarity using a llama.cpp embedding server.
pub struct LlamaEmbedScorer {
    url: String,
    health_url: String,
    client: reqwest::Client,
}

impl LlamaEmbedScorer {
    /// Build a scorer targeting `base_url` (e.g. `http://localhost:8080`).
    /// Does not contact the server — call [`LlamaEmbedScorer::health_check`]
    /// before first use.
    pub fn new(base_url: &str, options: &RemoteOptions) -> Result<Self, CompactionError> {
        let base = base_url.trim_end_matches('/');
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(options.timeout_secs))
            .build()
            .map_err(|e| CompactionError::RemoteScorerError { adapter: "llama-embed", message: e.to_string() })?;
        Ok(Self { url: format!("{base}/v1/embeddings"), health_url: format!("{base}/health"), client })
    }

    /// Confirm the server is reachable before sending scoring requests.
    pub async fn health_check(&self) -> Result<(), CompactionError> {
        let resp = self
            .client
            .get(&self.health_url)
            .send()
            .await
            .map_err(|e| CompactionError::RemoteScorerError { adapter: "llama-embed", message: e.to_string() })?;
        if !resp.status().is_success() {
            return Err(CompactionError::RemoteScorerError {
                adapter: "llama-embed",
                message: format!("health check returned {}", resp.status()),
            });
        }
        Ok(())
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CompactionError> {
        let resp = self
            .client
            .post(&self.url)
            .json(&EmbeddingRequest { input: texts, model: "qwen3" })
            .send()
            .await
            .map_err(|e| CompactionError::RemoteScorerError { adapter: "llama-embed", message: e.to_string() })?;

        if !resp.status().is_success() {
            return Err(CompactionError::RemoteScorerError {
                adapter: "llama-embed",
                message: format!("embeddings request returned {}", resp.status()),
            });
        }

        let mut body: EmbeddingResponse = resp
            .json()
            .await
            .map_err(|e| CompactionError::RemoteScorerError { adapter: "llama-embed", message: e.to_string() })?;
        body.data.sort_by_key(|d| d.index);
        Ok(body.data.into_iter().map(|d| d.embedding).collect())
    }

    /// Score `system_turns` against `query`, batching document encoding at
    /// `options.batch_size`.
    pub async fn score_turns(
        &self,
        system_turns: &[Turn],
        query: &str,
        token_counts: &HashMap<usize, usize>,
        options: &ScoreOptions,
        remote_options: &RemoteOptions,
    ) -> Result<Vec<ScoredTurn>, CompactionError> {
        let query_text = instruct(QUERY_INSTRUCTION, query);
        let query_emb = with_retry("llama-embed", remote_options, || {
            let texts = vec![query_text.clone()];
            async move { self.embed(&texts).await }
        })
        .await?;
        let query_vec = normalize(query_emb.into_iter().next().unwrap_or_default());

        let batch_size = options.batch_size.max(1);
        let mut doc_vecs: Vec<Vec<f32>> = Vec::with_capacity(system_turns.len());

        for (done, batch) in system_turns.chunks(batch_size).enumerate() {
            let texts: Vec<String> = batch
                .iter()
                .map(|t| {
                    let text = t.text();
                    let truncated: String = text.chars().take(MAX_DOC_CHARS).collect();
                    instruct(DOC_INSTRUCTION, &truncated)
                })
                .collect();
            let embeddings = with_retry("llama-embed", remote_options, || {
                let texts = texts.clone();
                async move { self.embed(&texts).await }
            })
            .await?;
            doc_vecs.extend(embeddings.into_iter().map(normalize));
            debug!(done = (done + 1) * batch_size, total = system_turns.len(), "encoded batch");
        }

        Ok(system_turns
            .iter()
            .zip(doc_vecs.iter())
            .map(|(turn, doc_vec)| {
                let sim = cosine(&query_vec, doc_vec);
                ScoredTurn {
                    turn_index: turn.index,
                    score: ((sim + 1.0) / 2.0) as f64,
                    tokens: token_counts.get(&turn.index).copied().unwrap_or(0),
                }
            })
            .collect())
    }
}

fn normalize(mut vec: Vec<f32>) -> Vec<f32> {
    let norm: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut vec {
            *x /= norm;
        }
    }
    vec
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_produces_unit_vector() {
        let v = normalize(vec![3.0, 4.0]);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_of_identical_normalized_vectors_is_one() {
        let v = normalize(vec![1.0, 2.0, 3.0]);
        let sim = cosine(&v, &v);
        assert!((sim - 1.0).abs() < 1e-5);
    }

    #[test]
    fn instruct_wraps_query_with_prefix() {
        let s = instruct("do X", "find Y");
        assert!(s.starts_with("Instruct: do X"));
        assert!(s.ends_with("find Y"));
    }
}
