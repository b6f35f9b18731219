use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use kbase_core::error::Error;
use kbase_core::traits::{Embedder, Retriever, VectorStore};
use kbase_core::types::Passage;

/// Nearest-neighbor retrieval: embeds the query and delegates to the
/// collection's vector store. Transport failures from either handle
/// surface as `RetrievalUnavailable`.
pub struct VectorRetriever {
    store: Arc<dyn VectorStore>,
    encoder: Arc<dyn Embedder>,
}

impl VectorRetriever {
    pub fn new(store: Arc<dyn VectorStore>, encoder: Arc<dyn Embedder>) -> Self {
        Self { store, encoder }
    }
}

#[async_trait]
impl Retriever for VectorRetriever {
    async fn retrieve(&self, collection: &str, query: &str, k: usize) -> Result<Vec<Passage>> {
        let query_vector = self
            .encoder
            .embed(query)
            .map_err(|e| Error::RetrievalUnavailable(format!("query embedding: {e}")))?;
        let hits = self
            .store
            .search(collection, &query_vector, k)
            .await
            .map_err(|e| Error::RetrievalUnavailable(format!("vector store search: {e}")))?;
        tracing::debug!(collection, hits = hits.len(), "vector retrieval");
        Ok(hits)
    }

    fn name(&self) -> &'static str {
        "vector"
    }
}
