//! HTTP scorer adapters for llama.cpp embedding and reranking servers.
//!
//! These are not [`compactor_core::Scorer`] trait implementations — the
//! trait is synchronous and these adapters are inherently network-bound.
//! Each exposes an async `score_turns` with the same input/output shape as
//! `Scorer::score`, so a host can call whichever it needs without the core
//! crate depending on an HTTP client.

pub mod llama_embed;
pub mod llama_rerank;
pub mod retry;

pub use llama_embed::LlamaEmbedScorer;
pub use llama_rerank::LlamaRerankScorer;
pub use retry::with_retry;
