//! Contracts for the external collaborators the pipeline is composed
//! from. All handles are constructed once at process start and passed in
//! by reference; none of them lazy-load on first call.

use async_trait::async_trait;
use std::path::Path;

use crate::types::{Passage, Segment};

/// Turns a document file into ordered plain-text segments with
/// provenance. Parsing of concrete formats happens behind this seam.
pub trait DocumentLoader: Send + Sync {
    fn load(&self, path: &Path) -> crate::error::Result<Vec<Segment>>;
}

/// The vector encoder: text in, fixed-length float vector out.
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;

    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

/// Tokenizer of the vector encoder. Chunk lengths are measured in its
/// tokens so every chunk fits the encoder's context window.
pub trait Tokenizer: Send + Sync {
    /// Byte offsets of each token in `text`, in order.
    fn offsets(&self, text: &str) -> Vec<(usize, usize)>;

    fn count(&self, text: &str) -> usize {
        self.offsets(text).len()
    }
}

/// Pairwise relevance scorer: `(query, passage text)` in, scalar out.
/// Stateless and batchable from the caller's point of view.
pub trait PairwiseScorer: Send + Sync {
    fn score(&self, query: &str, text: &str) -> anyhow::Result<f32>;
}

/// The text completion service, reached over the network with its own
/// retry policy. Callers impose their own deadline on top.
#[async_trait]
pub trait TextCompleter: Send + Sync {
    async fn complete(&self, prompt: &str) -> anyhow::Result<String>;
}

/// Persistent vector storage keyed by collection name.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn add(&self, collection: &str, entries: Vec<(Passage, Vec<f32>)>) -> anyhow::Result<()>;
    async fn search(&self, collection: &str, query: &[f32], k: usize) -> anyhow::Result<Vec<Passage>>;
    async fn get_all(&self, collection: &str) -> anyhow::Result<Vec<Passage>>;
    async fn delete_collection(&self, collection: &str) -> anyhow::Result<()>;
    async fn list_collections(&self) -> anyhow::Result<Vec<String>>;
}

/// One source of ranked candidate passages. The returned order is the
/// ranking: rank of a passage is its position in the list.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(&self, collection: &str, query: &str, k: usize) -> anyhow::Result<Vec<Passage>>;
    fn name(&self) -> &'static str;
}
