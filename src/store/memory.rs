//! In-memory [`ChunkStore`] for tests.
//!
//! Search is keyword matching: a chunk's distance is `1 / (1 + matched terms)`,
//! so chunks sharing no term with the query are never returned.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::models::{owning_document_id, ChunkRecord, SearchResult};

use super::{query_terms, ChunkStore};

#[derive(Default)]
struct Inner {
    chunks: Vec<ChunkRecord>,
    by_document: HashMap<String, Vec<String>>,
}

#[derive(Default)]
pub struct InMemoryChunkStore {
    inner: RwLock<Inner>,
}

impl InMemoryChunkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|i| i.chunks.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("in-memory chunk store lock poisoned")
}

#[async_trait]
impl ChunkStore for InMemoryChunkStore {
    async fn add(&self, records: &[ChunkRecord]) -> Result<()> {
        let mut inner = self.inner.write().map_err(poisoned)?;
        for record in records {
            let doc = owning_document_id(&record.id)
                .ok_or_else(|| anyhow!("malformed chunk id: {}", record.id))?
                .to_string();
            inner.chunks.retain(|c| c.id != record.id);
            inner.chunks.push(record.clone());
            let ids = inner.by_document.entry(doc).or_default();
            if !ids.contains(&record.id) {
                ids.push(record.id.clone());
            }
        }
        Ok(())
    }

    async fn query(&self, text: &str, top_k: usize) -> Result<Vec<SearchResult>> {
        let terms = query_terms(text);
        if terms.is_empty() {
            return Ok(Vec::new());
        }
        let inner = self.inner.read().map_err(poisoned)?;
        let mut results: Vec<SearchResult> = inner
            .chunks
            .iter()
            .filter_map(|c| {
                let haystack = c.text.to_lowercase();
                let matches = terms.iter().filter(|t| haystack.contains(t.as_str())).count();
                if matches == 0 {
                    return None;
                }
                Some(SearchResult {
                    chunk_id: c.id.clone(),
                    content: c.text.clone(),
                    source: c.metadata.filename.clone(),
                    distance: 1.0 / (1.0 + matches as f64),
                })
            })
            .collect();
        results.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(top_k);
        Ok(results)
    }

    async fn ids(&self) -> Result<Vec<String>> {
        let inner = self.inner.read().map_err(poisoned)?;
        Ok(inner.chunks.iter().map(|c| c.id.clone()).collect())
    }

    async fn chunk_ids_for_document(&self, document_id: &str) -> Result<Vec<String>> {
        let inner = self.inner.read().map_err(poisoned)?;
        Ok(inner
            .by_document
            .get(document_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn delete(&self, ids: &[String]) -> Result<()> {
        let mut inner = self.inner.write().map_err(poisoned)?;
        inner.chunks.retain(|c| !ids.contains(&c.id));
        for chunk_ids in inner.by_document.values_mut() {
            chunk_ids.retain(|id| !ids.contains(id));
        }
        inner.by_document.retain(|_, chunk_ids| !chunk_ids.is_empty());
        Ok(())
    }
}
