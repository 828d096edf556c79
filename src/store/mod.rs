//! Similarity-store abstraction.
//!
//! The [`ChunkStore`] trait is the whole contract the gateway needs from a
//! vector store: insert chunks (the store embeds text itself), query by
//! free text, enumerate ids, and delete by id. Each store also keeps an
//! explicit document → chunk index, populated from the chunk id at insert
//! time, so a document's chunks can be removed without scanning every id.
//!
//! | Implementation | Backing |
//! |----------------|---------|
//! | [`sqlite::SqliteChunkStore`] | SQLite (FTS5 keyword search or cosine over stored vectors) |
//! | [`memory::InMemoryChunkStore`] | `HashMap` + `Vec`, keyword matching; used in tests |

pub mod memory;
pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{ChunkRecord, SearchResult};

#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Insert chunks. Ids must be `{document_id}_{index}`.
    async fn add(&self, records: &[ChunkRecord]) -> Result<()>;

    /// Up to `top_k` chunks ordered by increasing distance.
    async fn query(&self, text: &str, top_k: usize) -> Result<Vec<SearchResult>>;

    /// Every stored chunk id.
    async fn ids(&self) -> Result<Vec<String>>;

    /// Chunk ids recorded for one document.
    async fn chunk_ids_for_document(&self, document_id: &str) -> Result<Vec<String>>;

    /// Remove the given chunks. Unknown ids are ignored.
    async fn delete(&self, ids: &[String]) -> Result<()>;
}

/// Splits free text into lowercase alphanumeric terms for keyword matching.
pub(crate) fn query_terms(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_terms_drop_punctuation() {
        assert_eq!(
            query_terms("What's up? \"Rust\" (async)-runtime"),
            vec!["what", "s", "up", "rust", "async", "runtime"]
        );
        assert!(query_terms("?!  ...").is_empty());
    }
}
