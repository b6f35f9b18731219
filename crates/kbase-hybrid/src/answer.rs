//! Query orchestration: retrieve, fuse, rerank, then either synthesize
//! an answer with the completion service or fall back to an extractive
//! one. Every degradation short of total retrieval failure still
//! produces a normal result.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use kbase_core::config::{GenerationSettings, RetrievalSettings};
use kbase_core::error::{Error, Result};
use kbase_core::normalize::normalize_cjk_spacing;
use kbase_core::traits::{Embedder, Retriever, TextCompleter, VectorStore};
use kbase_core::types::{Passage, QueryResult};
use kbase_text::LexicalCatalog;
use kbase_vector::VectorRetriever;

use crate::fuse;
use crate::rerank::Reranker;

pub const NO_RESULTS_ANSWER: &str = "no relevant information found in the knowledge base";
pub const EXTRACTIVE_INTRO: &str = "Relevant information from the knowledge base:";
pub const RETRIEVAL_ONLY_NOTICE: &str =
    "[notice: no generation service configured; returning retrieved passages directly]";

const SNIPPET_CHAR_LIMIT: usize = 500;

pub struct AnswerEngine {
    retrievers: Vec<Arc<dyn Retriever>>,
    reranker: Reranker,
    completer: Option<Arc<dyn TextCompleter>>,
    retrieval: RetrievalSettings,
    generation: GenerationSettings,
}

impl AnswerEngine {
    pub fn new(
        vector: Arc<dyn Retriever>,
        lexical: Arc<dyn Retriever>,
        reranker: Reranker,
        completer: Option<Arc<dyn TextCompleter>>,
        retrieval: RetrievalSettings,
        generation: GenerationSettings,
    ) -> Self {
        Self { retrievers: vec![vector, lexical], reranker, completer, retrieval, generation }
    }

    /// Wires the usual composition: a `VectorRetriever` over the given
    /// store and encoder, plus the lexical catalog.
    pub fn hybrid(
        store: Arc<dyn VectorStore>,
        encoder: Arc<dyn Embedder>,
        lexical: Arc<LexicalCatalog>,
        reranker: Reranker,
        completer: Option<Arc<dyn TextCompleter>>,
        retrieval: RetrievalSettings,
        generation: GenerationSettings,
    ) -> Self {
        let vector = Arc::new(VectorRetriever::new(store, encoder));
        Self::new(vector, lexical, reranker, completer, retrieval, generation)
    }

    /// Answers one question against a collection.
    ///
    /// Fails only when every retriever is unavailable; a single failed or
    /// timed-out retriever, a poisoned reranker, and a failed or
    /// timed-out generation all degrade inside a normal `QueryResult`.
    pub async fn answer(&self, question: &str, collection: &str) -> Result<QueryResult> {
        let k = self.retrieval.candidates;
        let per_call = Duration::from_secs(self.retrieval.timeout_secs);

        let gathered = futures::future::join_all(self.retrievers.iter().map(|retriever| async move {
            match timeout(per_call, retriever.retrieve(collection, question, k)).await {
                Ok(Ok(list)) => Some(list),
                Ok(Err(e)) => {
                    tracing::warn!(retriever = retriever.name(), error = %e, "retriever failed; continuing without it");
                    None
                }
                Err(_) => {
                    tracing::warn!(retriever = retriever.name(), "retriever timed out; continuing without it");
                    None
                }
            }
        }))
        .await;

        let lists: Vec<Vec<Passage>> = gathered.into_iter().flatten().collect();
        if lists.is_empty() {
            return Err(Error::AnswerFailed("all retrieval backends are unavailable".into()));
        }

        let fused = fuse::fuse(&lists);
        let reranked = self.reranker.rerank(question, fused, self.retrieval.context_passages);
        let context: Vec<Passage> = reranked
            .into_iter()
            .map(|mut p| {
                p.text = normalize_cjk_spacing(&p.text);
                p
            })
            .collect();

        if context.is_empty() {
            return Ok(QueryResult { answer: NO_RESULTS_ANSWER.to_string(), sources: BTreeSet::new() });
        }

        let sources: BTreeSet<String> = context.iter().map(|p| p.source.clone()).collect();

        let Some(completer) = &self.completer else {
            let answer = format!("{RETRIEVAL_ONLY_NOTICE}\n\n{}", extractive_answer(&context));
            return Ok(QueryResult { answer, sources });
        };

        let prompt = build_prompt(question, &context);
        let deadline = Duration::from_secs(self.generation.timeout_secs);
        match timeout(deadline, completer.complete(&prompt)).await {
            Ok(Ok(answer)) => Ok(QueryResult { answer, sources }),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "generation failed; falling back to extractive answer");
                Ok(QueryResult { answer: extractive_answer(&context), sources })
            }
            Err(_) => {
                tracing::warn!(timeout_secs = self.generation.timeout_secs, "generation timed out; falling back to extractive answer");
                Ok(QueryResult { answer: extractive_answer(&context), sources })
            }
        }
    }
}

fn build_prompt(question: &str, context: &[Passage]) -> String {
    let context_text = context.iter().map(|p| p.text.as_str()).collect::<Vec<_>>().join("\n\n");
    format!(
        "You are a knowledge base assistant. Answer the question concisely and accurately, using only the context below.\n\
        \n\
        Rules:\n\
        1. Answer only from the context. If it does not cover the question, say the answer is unknown rather than inventing one.\n\
        2. Use a numbered list (1. 2. 3.) when the answer has multiple steps.\n\
        3. The context may contain stray spaces inside words left over from document parsing; read through them.\n\
        \n\
        Context:\n{context_text}\n\nQuestion:\n{question}\n\nAnswer:"
    )
}

/// Up to three labeled passage excerpts under a fixed introductory line.
fn extractive_answer(context: &[Passage]) -> String {
    let mut parts = vec![EXTRACTIVE_INTRO.to_string()];
    for (i, passage) in context.iter().take(3).enumerate() {
        let trimmed = passage.text.trim();
        let text = if trimmed.chars().count() > SNIPPET_CHAR_LIMIT {
            let cut: String = trimmed.chars().take(SNIPPET_CHAR_LIMIT).collect();
            format!("{cut}...")
        } else {
            trimmed.to_string()
        };
        parts.push(format!("\nFragment {}:\n{}", i + 1, text));
    }
    parts.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extractive_answer_labels_and_truncates() {
        let long = "x".repeat(600);
        let context = vec![
            Passage::new("1", "first snippet", "a.txt", 0),
            Passage::new("2", long, "b.txt", 0),
        ];
        let answer = extractive_answer(&context);
        assert!(answer.starts_with(EXTRACTIVE_INTRO));
        assert!(answer.contains("Fragment 1:\nfirst snippet"));
        assert!(answer.contains("Fragment 2:"));
        assert!(answer.contains(&format!("{}...", "x".repeat(500))));
        assert!(!answer.contains(&"x".repeat(501)));
    }

    #[test]
    fn prompt_embeds_context_and_question() {
        let context = vec![Passage::new("1", "the cellar stays at twelve degrees", "a.txt", 0)];
        let prompt = build_prompt("how cold is the cellar?", &context);
        assert!(prompt.contains("the cellar stays at twelve degrees"));
        assert!(prompt.contains("how cold is the cellar?"));
        assert!(prompt.contains("numbered list"));
    }
}
