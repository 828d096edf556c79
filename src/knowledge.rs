//! Knowledge-base adapter over a [`ChunkStore`].
//!
//! This is the only layer the document pipeline and chat endpoint talk to.
//! Retrieval and purge failures stop here: searches degrade to "no context"
//! and purges report a [`PurgeOutcome`] instead of an error, with the cause
//! logged.

use anyhow::Result;
use std::sync::Arc;

use crate::models::{chunk_id, ChunkMetadata, ChunkRecord, SearchResult};
use crate::store::ChunkStore;

/// Result of removing a document's chunks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurgeOutcome {
    Removed(usize),
    Failed(String),
}

#[derive(Clone)]
pub struct KnowledgeBase {
    store: Arc<dyn ChunkStore>,
}

impl KnowledgeBase {
    pub fn new(store: Arc<dyn ChunkStore>) -> Self {
        Self { store }
    }

    /// Stores one record per chunk with ids `{document_id}_{index}`.
    /// Returns the number of chunks written.
    pub async fn add_document_chunks(
        &self,
        document_id: &str,
        filename: &str,
        chunks: &[String],
    ) -> Result<usize> {
        let records: Vec<ChunkRecord> = chunks
            .iter()
            .enumerate()
            .map(|(i, text)| ChunkRecord {
                id: chunk_id(document_id, i),
                text: text.clone(),
                metadata: ChunkMetadata {
                    filename: filename.to_string(),
                    chunk_index: i,
                },
            })
            .collect();

        self.store.add(&records).await?;
        tracing::debug!(document_id, chunks = records.len(), "stored document chunks");
        Ok(records.len())
    }

    /// Most similar chunks first. Store failures yield an empty result.
    pub async fn search(&self, text: &str, top_k: usize) -> Vec<SearchResult> {
        match self.store.query(text, top_k).await {
            Ok(results) => results,
            Err(e) => {
                tracing::warn!(error = %e, "knowledge base search failed; continuing without context");
                Vec::new()
            }
        }
    }

    /// Removes every chunk recorded for `document_id`. Never fails.
    pub async fn delete_by_document(&self, document_id: &str) -> PurgeOutcome {
        let ids = match self.store.chunk_ids_for_document(document_id).await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!(document_id, error = %e, "could not look up document chunks");
                return PurgeOutcome::Failed(e.to_string());
            }
        };
        if ids.is_empty() {
            return PurgeOutcome::Removed(0);
        }
        match self.store.delete(&ids).await {
            Ok(()) => {
                tracing::debug!(document_id, chunks = ids.len(), "purged document chunks");
                PurgeOutcome::Removed(ids.len())
            }
            Err(e) => {
                tracing::warn!(document_id, error = %e, "could not delete document chunks");
                PurgeOutcome::Failed(e.to_string())
            }
        }
    }

    /// Total number of stored chunks.
    pub async fn chunk_count(&self) -> Result<usize> {
        Ok(self.store.ids().await?.len())
    }
}
