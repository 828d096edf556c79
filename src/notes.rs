//! Notes kept alongside the chat.
//!
//! Storage is behind [`NoteStore`] so the server can be handed any backend;
//! [`InMemoryNoteStore`] is the one wired in by default.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::RwLock;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Note {
    pub id: String,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields a caller supplies when creating or replacing a note.
#[derive(Debug, Clone, Deserialize)]
pub struct NoteInput {
    pub title: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, thiserror::Error)]
pub enum NoteError {
    #[error("Note not found")]
    NotFound(String),
    #[error("Note title must not be empty")]
    EmptyTitle,
    #[error("note store unavailable: {0}")]
    Backend(String),
}

#[async_trait]
pub trait NoteStore: Send + Sync {
    async fn add(&self, input: NoteInput) -> Result<Note, NoteError>;
    async fn list(&self) -> Result<Vec<Note>, NoteError>;
    async fn get(&self, id: &str) -> Result<Note, NoteError>;
    async fn update(&self, id: &str, input: NoteInput) -> Result<Note, NoteError>;
    async fn delete(&self, id: &str) -> Result<(), NoteError>;
}

#[derive(Default)]
pub struct InMemoryNoteStore {
    notes: RwLock<Vec<Note>>,
}

impl InMemoryNoteStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> NoteError {
    NoteError::Backend("lock poisoned".to_string())
}

fn checked_title(input: &NoteInput) -> Result<String, NoteError> {
    let title = input.title.trim();
    if title.is_empty() {
        return Err(NoteError::EmptyTitle);
    }
    Ok(title.to_string())
}

#[async_trait]
impl NoteStore for InMemoryNoteStore {
    async fn add(&self, input: NoteInput) -> Result<Note, NoteError> {
        let title = checked_title(&input)?;
        let now = Utc::now();
        let note = Note {
            id: uuid::Uuid::new_v4().to_string(),
            title,
            content: input.content,
            created_at: now,
            updated_at: now,
        };
        self.notes.write().map_err(poisoned)?.push(note.clone());
        Ok(note)
    }

    async fn list(&self) -> Result<Vec<Note>, NoteError> {
        Ok(self.notes.read().map_err(poisoned)?.clone())
    }

    async fn get(&self, id: &str) -> Result<Note, NoteError> {
        self.notes
            .read()
            .map_err(poisoned)?
            .iter()
            .find(|n| n.id == id)
            .cloned()
            .ok_or_else(|| NoteError::NotFound(id.to_string()))
    }

    async fn update(&self, id: &str, input: NoteInput) -> Result<Note, NoteError> {
        let title = checked_title(&input)?;
        let mut notes = self.notes.write().map_err(poisoned)?;
        let note = notes
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| NoteError::NotFound(id.to_string()))?;
        note.title = title;
        note.content = input.content;
        note.updated_at = Utc::now();
        Ok(note.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), NoteError> {
        let mut notes = self.notes.write().map_err(poisoned)?;
        let before = notes.len();
        notes.retain(|n| n.id != id);
        if notes.len() == before {
            return Err(NoteError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(title: &str, content: &str) -> NoteInput {
        NoteInput {
            title: title.to_string(),
            content: content.to_string(),
        }
    }

    #[tokio::test]
    async fn add_update_delete() {
        let store = InMemoryNoteStore::new();
        let note = store.add(input("Groceries", "milk")).await.unwrap();
        assert_eq!(store.list().await.unwrap().len(), 1);

        let updated = store
            .update(&note.id, input("Groceries", "milk, eggs"))
            .await
            .unwrap();
        assert_eq!(updated.content, "milk, eggs");
        assert_eq!(updated.created_at, note.created_at);
        assert!(updated.updated_at >= note.updated_at);
        assert_eq!(store.get(&note.id).await.unwrap(), updated);

        store.delete(&note.id).await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let store = InMemoryNoteStore::new();
        assert!(matches!(store.get("nope").await, Err(NoteError::NotFound(_))));
        assert!(matches!(
            store.update("nope", input("t", "")).await,
            Err(NoteError::NotFound(_))
        ));
        assert!(matches!(store.delete("nope").await, Err(NoteError::NotFound(_))));
    }

    #[tokio::test]
    async fn blank_title_is_rejected() {
        let store = InMemoryNoteStore::new();
        assert!(matches!(
            store.add(input("   ", "body")).await,
            Err(NoteError::EmptyTitle)
        ));
    }
}
