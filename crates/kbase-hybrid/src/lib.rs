//! Hybrid retrieval and answering.
//!
//! Candidates from the lexical and vector retrievers are merged with
//! reciprocal rank fusion, reranked pairwise against the query, and
//! either synthesized into an answer by the completion service or
//! returned as an extractive fallback.

pub mod answer;
pub mod fuse;
pub mod ingest;
pub mod rerank;

pub use answer::AnswerEngine;
pub use ingest::KnowledgeBase;
pub use rerank::Reranker;
