//! Core data models shared by the document pipeline, the knowledge store,
//! and the chat endpoint.

use serde::{Deserialize, Serialize};

/// Separator between a generated id (UUIDv4, never contains `_`) and whatever
/// follows it, in both stored file names (`{id}_{filename}`) and chunk ids (`{id}_{index}`).
pub const ID_SEPARATOR: char = '_';

/// Builds the on-disk name for a document.
pub fn stored_name(document_id: &str, filename: &str) -> String {
    format!("{}{}{}", document_id, ID_SEPARATOR, filename)
}

/// Document id of a stored file name: everything before the first `_`.
pub fn document_id_of_stored_name(stored_name: &str) -> &str {
    stored_name
        .split_once(ID_SEPARATOR)
        .map(|(id, _)| id)
        .unwrap_or(stored_name)
}

/// Display name of a stored file name: everything after the first `_`.
pub fn display_name_of_stored_name(stored_name: &str) -> &str {
    stored_name
        .split_once(ID_SEPARATOR)
        .map(|(_, rest)| rest)
        .unwrap_or("")
}

/// Identifier of the `index`-th chunk of a document.
pub fn chunk_id(document_id: &str, index: usize) -> String {
    format!("{}{}{}", document_id, ID_SEPARATOR, index)
}

/// Recovers the owning document id from a chunk id (prefix before the last
/// `_`, provided the suffix is a chunk index).
pub fn owning_document_id(chunk_id: &str) -> Option<&str> {
    let (doc, index) = chunk_id.rsplit_once(ID_SEPARATOR)?;
    if doc.is_empty() || index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(doc)
}

/// Per-chunk metadata handed to the similarity store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub filename: String,
    pub chunk_index: usize,
}

/// One `(id, text, metadata)` tuple for [`ChunkStore::add`](crate::store::ChunkStore::add).
#[derive(Debug, Clone)]
pub struct ChunkRecord {
    pub id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// A retrieved chunk.
///
/// `distance` is non-negative and lower means more similar. Vector search
/// reports `1 - cosine` (range `[0, 2]`); keyword search reports
/// `1 / (1 + bm25)` (range `(0, 1]`).
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub chunk_id: String,
    pub content: String,
    pub source: String,
    pub distance: f64,
}

/// A single caller-supplied conversation turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: String,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }

    /// Anything that is not `user` is rendered as the assistant.
    pub fn is_user(&self) -> bool {
        self.role == "user"
    }
}
