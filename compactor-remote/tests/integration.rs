//! Wiremock-backed integration tests for the llama.cpp adapters: success
//! paths, batch ordering, and retry-then-fail-then-succeed sequences.

use std::collections::HashMap;

use compactor_common::{RawRecord, RecordPart, RemoteOptions, Role, ScoreOptions, Turn, TurnKind};
use compactor_remote::{LlamaEmbedScorer, LlamaRerankScorer};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn system(index: usize, text: &str) -> Turn {
    Turn {
        index,
        kind: TurnKind::System,
        records: vec![RawRecord { role: Role::System, part: RecordPart::Text { text: text.to_string() } }],
    }
}

fn token_counts(turns: &[Turn]) -> HashMap<usize, usize> {
    turns.iter().map(|t| (t.index, t.text().chars().count())).collect()
}

fn fast_remote_options() -> RemoteOptions {
    RemoteOptions { max_retries: 3, backoff_base_ms: 1, ..Default::default() }
}

#[tokio::test]
async fn embed_scorer_scores_turns_by_cosine_similarity() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(move |req: &wiremock::Request| {
            let body: serde_json::Value = req.body_json().unwrap();
            let count = body["input"].as_array().unwrap().len();
            let data: Vec<_> = (0..count)
                .map(|i| json!({"index": i, "embedding": [1.0, 0.0]}))
                .collect();
            ResponseTemplate::new(200).set_body_json(json!({"data": data}))
        })
        .mount(&server)
        .await;

    let scorer = LlamaEmbedScorer::new(&server.uri(), &fast_remote_options()).expect("builds");
    let turns = vec![system(0, "one"), system(1, "two")];
    let counts = token_counts(&turns);
    let result = scorer
        .score_turns(&turns, "query", &counts, &ScoreOptions::default(), &fast_remote_options())
        .await
        .expect("scores");

    assert_eq!(result.len(), 2);
    for scored in &result {
        assert!((scored.score - 1.0).abs() < 1e-6);
    }
}

#[tokio::test]
async fn embed_scorer_preserves_turn_order_across_batches() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(move |req: &wiremock::Request| {
            let body: serde_json::Value = req.body_json().unwrap();
            let inputs = body["input"].as_array().unwrap();
            // Return indices reversed from request order to prove the
            // scorer re-sorts by the server's reported index.
            let data: Vec<_> = inputs
                .iter()
                .enumerate()
                .map(|(i, _)| json!({"index": inputs.len() - 1 - i, "embedding": [(i as f64), 1.0]}))
                .collect();
            ResponseTemplate::new(200).set_body_json(json!({"data": data}))
        })
        .mount(&server)
        .await;

    let options = ScoreOptions { batch_size: 2, ..Default::default() };
    let scorer = LlamaEmbedScorer::new(&server.uri(), &fast_remote_options()).expect("builds");
    let turns = vec![system(0, "a"), system(1, "b")];
    let counts = token_counts(&turns);
    let result = scorer.score_turns(&turns, "query", &counts, &options, &fast_remote_options()).await.expect("scores");

    assert_eq!(result[0].turn_index, 0);
    assert_eq!(result[1].turn_index, 1);
}

#[tokio::test]
async fn rerank_scorer_returns_server_relevance_scores() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/rerank"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                {"index": 0, "relevance_score": 0.2},
                {"index": 1, "relevance_score": 0.9},
            ]
        })))
        .mount(&server)
        .await;

    let scorer = LlamaRerankScorer::new(&server.uri(), &fast_remote_options()).expect("builds");
    let turns = vec![system(0, "low relevance"), system(1, "high relevance")];
    let counts = token_counts(&turns);
    let result = scorer
        .score_turns(&turns, "query", &counts, &ScoreOptions::default(), &fast_remote_options())
        .await
        .expect("scores");

    assert_eq!(result[0].score, 0.2);
    assert_eq!(result[1].score, 0.9);
}

#[tokio::test]
async fn embed_scorer_retries_transient_server_errors() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [{"index": 0, "embedding": [1.0, 0.0]}]})))
        .mount(&server)
        .await;

    let scorer = LlamaEmbedScorer::new(&server.uri(), &fast_remote_options()).expect("builds");
    let turns = vec![system(0, "one")];
    let counts = token_counts(&turns);
    let result = scorer
        .score_turns(&turns, "query", &counts, &ScoreOptions::default(), &fast_remote_options())
        .await
        .expect("eventually succeeds");

    assert_eq!(result.len(), 1);
}

#[tokio::test]
async fn health_check_fails_when_server_unhealthy() {
    let server = MockServer::start().await;

    Mock::given(method("GET")).and(path("/health")).respond_with(ResponseTemplate::new(500)).mount(&server).await;

    let scorer = LlamaEmbedScorer::new(&server.uri(), &fast_remote_options()).expect("builds");
    let result = scorer.health_check().await;
    assert!(result.is_err());
}

#[tokio::test]
async fn health_check_succeeds_when_server_ready() {
    let server = MockServer::start().await;

    Mock::given(method("GET")).and(path("/health")).respond_with(ResponseTemplate::new(200)).mount(&server).await;

    let scorer = LlamaRerankScorer::new(&server.uri(), &fast_remote_options()).expect("builds");
    scorer.health_check().await.expect("healthy server reports ok");
}
