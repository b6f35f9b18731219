use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use kbase_core::traits::VectorStore;
use kbase_core::types::Passage;

/// In-memory vector store keyed by collection name.
///
/// Each `add` appends its whole batch inside one write-lock section, so
/// readers see either none or all of an upload's passages.
#[derive(Default)]
pub struct MemoryVectorStore {
    collections: RwLock<HashMap<String, Vec<(Passage, Vec<f32>)>>>,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn add(&self, collection: &str, entries: Vec<(Passage, Vec<f32>)>) -> Result<()> {
        let mut guard = self.collections.write().await;
        guard.entry(collection.to_string()).or_default().extend(entries);
        Ok(())
    }

    async fn search(&self, collection: &str, query: &[f32], k: usize) -> Result<Vec<Passage>> {
        let guard = self.collections.read().await;
        let Some(entries) = guard.get(collection) else {
            return Ok(Vec::new());
        };
        let mut scored: Vec<(f32, &Passage)> = entries
            .iter()
            .map(|(p, v)| (cosine_similarity(query, v), p))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        Ok(scored
            .into_iter()
            .take(k)
            .map(|(score, p)| {
                let mut passage = p.clone();
                passage.score_metadata.insert("vector_score".to_string(), score);
                passage
            })
            .collect())
    }

    async fn get_all(&self, collection: &str) -> Result<Vec<Passage>> {
        let guard = self.collections.read().await;
        Ok(guard
            .get(collection)
            .map(|entries| entries.iter().map(|(p, _)| p.clone()).collect())
            .unwrap_or_default())
    }

    async fn delete_collection(&self, collection: &str) -> Result<()> {
        self.collections.write().await.remove(collection);
        Ok(())
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        let guard = self.collections.read().await;
        let mut names: Vec<String> = guard.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
