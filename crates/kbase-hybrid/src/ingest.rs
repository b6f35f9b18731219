//! Ingestion facade: chunk, embed, store, and reindex in one call.

use std::collections::BTreeMap;
use std::sync::Arc;

use kbase_core::chunk::Chunker;
use kbase_core::error::{Error, Result};
use kbase_core::normalize::normalize_cjk_spacing;
use kbase_core::traits::{Embedder, VectorStore};
use kbase_core::types::{DocumentSummary, Passage, Segment};
use kbase_text::LexicalCatalog;

/// Largest page size served by the passage listing.
const MAX_PASSAGE_PAGE: usize = 50;

pub struct KnowledgeBase {
    chunker: Chunker,
    encoder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    lexical: Arc<LexicalCatalog>,
}

impl KnowledgeBase {
    pub fn new(
        chunker: Chunker,
        encoder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        lexical: Arc<LexicalCatalog>,
    ) -> Self {
        Self { chunker, encoder, store, lexical }
    }

    /// Chunks the loaded segments, embeds them in one batch, appends them
    /// to the collection's vector store, and rebuilds the collection's
    /// lexical index from the stored passages. Returns the number of
    /// passages produced.
    ///
    /// A lexical rebuild failure is not fatal: the collection then serves
    /// vector-only retrieval until the next successful ingest.
    pub async fn ingest(&self, segments: &[Segment], collection: &str) -> Result<usize> {
        let passages = self.chunker.split(segments);
        if passages.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = passages.iter().map(|p| p.text.clone()).collect();
        let embeddings = self
            .encoder
            .embed_batch(&texts)
            .map_err(|e| Error::Operation(format!("embedding failed: {e}")))?;
        for embedding in &embeddings {
            if embedding.len() != self.encoder.dim() {
                return Err(Error::Operation(format!(
                    "encoder returned a {}-dim vector, expected {}",
                    embedding.len(),
                    self.encoder.dim()
                )));
            }
        }

        let count = passages.len();
        let entries: Vec<(Passage, Vec<f32>)> = passages.into_iter().zip(embeddings).collect();
        self.store
            .add(collection, entries)
            .await
            .map_err(|e| Error::Operation(format!("vector store add failed: {e}")))?;

        match self.store.get_all(collection).await {
            Ok(stored) => {
                if let Err(e) = self.lexical.rebuild(collection, &stored) {
                    tracing::warn!(collection, error = %e, "lexical indexing failed; collection degrades to vector-only retrieval");
                    self.lexical.remove(collection);
                }
            }
            Err(e) => {
                tracing::warn!(collection, error = %e, "could not read back passages; lexical index left unchanged");
            }
        }

        tracing::info!(collection, passages = count, "ingested document");
        Ok(count)
    }

    pub async fn list_collections(&self) -> Result<Vec<String>> {
        self.store
            .list_collections()
            .await
            .map_err(|e| Error::Operation(format!("listing collections failed: {e}")))
    }

    pub async fn delete_collection(&self, collection: &str) -> Result<()> {
        let known = self.list_collections().await?;
        if !known.iter().any(|c| c == collection) {
            return Err(Error::NotFound(format!("collection '{collection}'")));
        }
        self.store
            .delete_collection(collection)
            .await
            .map_err(|e| Error::Operation(format!("deleting collection failed: {e}")))?;
        self.lexical.remove(collection);
        Ok(())
    }

    /// Paged passage listing for inspection. Served normalized, like
    /// every other read path.
    pub async fn passages(&self, collection: &str, limit: usize, offset: usize) -> Result<Vec<Passage>> {
        let limit = limit.min(MAX_PASSAGE_PAGE);
        let all = self
            .store
            .get_all(collection)
            .await
            .map_err(|e| Error::Operation(format!("reading passages failed: {e}")))?;
        Ok(all
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|mut p| {
                p.text = normalize_cjk_spacing(&p.text);
                p
            })
            .collect())
    }

    /// Distinct sources in a collection with their passage counts.
    pub async fn documents(&self, collection: &str) -> Result<Vec<DocumentSummary>> {
        let all = self
            .store
            .get_all(collection)
            .await
            .map_err(|e| Error::Operation(format!("reading passages failed: {e}")))?;
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for passage in &all {
            *counts.entry(passage.source.clone()).or_default() += 1;
        }
        Ok(counts
            .into_iter()
            .map(|(source, passages)| DocumentSummary { source, passages })
            .collect())
    }
}
