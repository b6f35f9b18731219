use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use kbase_core::traits::Retriever;
use kbase_core::types::Passage;

use crate::index::LexicalIndex;

/// Collection name → current lexical index. Rebuilds replace the whole
/// index under the lock, so concurrent queries observe either the
/// pre-ingest or the post-ingest index, never a partial one.
#[derive(Default)]
pub struct LexicalCatalog {
    collections: RwLock<HashMap<String, Arc<LexicalIndex>>>,
}

impl LexicalCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rebuild(&self, collection: &str, passages: &[Passage]) -> Result<()> {
        let built = Arc::new(LexicalIndex::build(passages)?);
        tracing::debug!(collection, passages = built.len(), "rebuilt lexical index");
        self.write_guard().insert(collection.to_string(), built);
        Ok(())
    }

    pub fn remove(&self, collection: &str) {
        self.write_guard().remove(collection);
    }

    pub fn get(&self, collection: &str) -> Option<Arc<LexicalIndex>> {
        self.read_guard().get(collection).cloned()
    }

    fn read_guard(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Arc<LexicalIndex>>> {
        self.collections.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_guard(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Arc<LexicalIndex>>> {
        self.collections.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Retriever for LexicalCatalog {
    /// A collection without an index degrades to an empty ranked list so
    /// fusion can continue on the remaining retrievers.
    async fn retrieve(&self, collection: &str, query: &str, k: usize) -> Result<Vec<Passage>> {
        let Some(index) = self.get(collection) else {
            tracing::debug!(collection, "no lexical index for collection");
            return Ok(Vec::new());
        };
        index.search(query, k)
    }

    fn name(&self) -> &'static str {
        "lexical"
    }
}
