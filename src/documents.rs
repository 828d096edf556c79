//! Document lifecycle: upload, listing, and deletion of originals.
//!
//! Originals are kept under `paths.documents_dir` as `{uuid}_{filename}`;
//! their chunks live in the [`KnowledgeBase`]. Upload writes the file first
//! and removes it again if extraction or indexing fails, so a rejected
//! upload leaves neither a file nor chunks behind.

use serde::Serialize;
use std::path::{Component, Path, PathBuf};
use std::time::UNIX_EPOCH;

use crate::chunk::chunk_text;
use crate::config::ChunkingConfig;
use crate::extract::{self, ExtractError, SUPPORTED_EXTENSIONS};
use crate::knowledge::{KnowledgeBase, PurgeOutcome};
use crate::models::{display_name_of_stored_name, document_id_of_stored_name, stored_name};

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("File type {0} not supported. Allowed: {allowed}", allowed = allowed_extensions())]
    UnsupportedExtension(String),
    #[error("{0}")]
    Extraction(#[from] ExtractError),
    #[error("Document not found")]
    NotFound(String),
    #[error("Invalid document name: {0}")]
    InvalidName(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Could not index document: {0}")]
    Store(anyhow::Error),
}

impl DocumentError {
    /// HTTP status code for this failure.
    pub fn status_code(&self) -> u16 {
        match self {
            DocumentError::UnsupportedExtension(_)
            | DocumentError::Extraction(_)
            | DocumentError::InvalidName(_) => 400,
            DocumentError::NotFound(_) => 404,
            DocumentError::Io(_) | DocumentError::Store(_) => 500,
        }
    }
}

fn allowed_extensions() -> String {
    SUPPORTED_EXTENSIONS
        .iter()
        .map(|e| format!(".{}", e))
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadOutcome {
    pub message: String,
    pub chunks_created: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentInfo {
    pub filename: String,
    pub stored_name: String,
    pub size: u64,
    /// Seconds since the Unix epoch.
    pub upload_date: f64,
}

#[derive(Clone)]
pub struct DocumentManager {
    documents_dir: PathBuf,
    knowledge: KnowledgeBase,
    chunking: ChunkingConfig,
}

impl DocumentManager {
    pub fn new(documents_dir: PathBuf, knowledge: KnowledgeBase, chunking: ChunkingConfig) -> Self {
        Self {
            documents_dir,
            knowledge,
            chunking,
        }
    }

    pub fn documents_dir(&self) -> &Path {
        &self.documents_dir
    }

    /// Stores, extracts, chunks, and indexes one uploaded file.
    pub async fn upload(&self, filename: &str, bytes: Vec<u8>) -> Result<UploadOutcome, DocumentError> {
        let filename = base_name(filename);
        if filename.is_empty() {
            return Err(DocumentError::InvalidName("empty filename".to_string()));
        }
        if !extract::is_supported(&filename) {
            let ext = extract::file_extension(&filename);
            let shown = if ext.is_empty() { String::new() } else { format!(".{}", ext) };
            tracing::info!(filename = %filename, "rejected upload with unsupported extension");
            return Err(DocumentError::UnsupportedExtension(shown));
        }

        let document_id = uuid::Uuid::new_v4().to_string();
        let path = self.documents_dir.join(stored_name(&document_id, &filename));
        tokio::fs::create_dir_all(&self.documents_dir).await?;
        tokio::fs::write(&path, &bytes).await?;

        let name_for_extract = filename.clone();
        let extracted = tokio::task::spawn_blocking(move || {
            extract::extract_text(&bytes, &name_for_extract)
        })
        .await
        .map_err(|e| ExtractError::Text(format!("extraction task failed: {}", e)));

        let text = match extracted.and_then(|r| r) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(filename = %filename, error = %e, "extraction failed; discarding upload");
                remove_quietly(&path).await;
                return Err(DocumentError::Extraction(e));
            }
        };

        let chunks = chunk_text(&text, self.chunking.chunk_size, self.chunking.overlap);
        let created = match self
            .knowledge
            .add_document_chunks(&document_id, &filename, &chunks)
            .await
        {
            Ok(n) => n,
            Err(e) => {
                tracing::error!(filename = %filename, error = %e, "indexing failed; discarding upload");
                remove_quietly(&path).await;
                return Err(DocumentError::Store(e));
            }
        };

        tracing::info!(filename = %filename, document_id = %document_id, chunks = created, "document uploaded");
        Ok(UploadOutcome {
            message: format!("Successfully processed {}", filename),
            chunks_created: created,
        })
    }

    /// Every stored original, oldest first.
    pub async fn list(&self) -> Result<Vec<DocumentInfo>, DocumentError> {
        let mut documents = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.documents_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(documents),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let meta = entry.metadata().await?;
            if !meta.is_file() {
                continue;
            }
            let stored = entry.file_name().to_string_lossy().into_owned();
            let timestamp = meta.created().or_else(|_| meta.modified()).ok();
            let upload_date = timestamp
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_secs_f64())
                .unwrap_or(0.0);
            documents.push(DocumentInfo {
                filename: display_name_of_stored_name(&stored).to_string(),
                stored_name: stored,
                size: meta.len(),
                upload_date,
            });
        }

        documents.sort_by(|a, b| {
            a.upload_date
                .partial_cmp(&b.upload_date)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.stored_name.cmp(&b.stored_name))
        });
        Ok(documents)
    }

    /// Removes a stored original and its chunks. Returns the success message.
    pub async fn delete(&self, stored: &str) -> Result<String, DocumentError> {
        if !is_plain_file_name(stored) {
            return Err(DocumentError::InvalidName(stored.to_string()));
        }
        let path = self.documents_dir.join(stored);
        if !tokio::fs::try_exists(&path).await? {
            return Err(DocumentError::NotFound(stored.to_string()));
        }

        let document_id = document_id_of_stored_name(stored);
        match self.knowledge.delete_by_document(document_id).await {
            PurgeOutcome::Removed(n) => {
                tracing::debug!(document_id, chunks = n, "purged chunks for deleted document")
            }
            PurgeOutcome::Failed(cause) => {
                tracing::warn!(document_id, cause = %cause, "chunk purge failed; removing file anyway")
            }
        }

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(DocumentError::NotFound(stored.to_string()))
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!(stored_name = stored, "document deleted");
        Ok(format!("Successfully deleted {}", stored))
    }
}

/// Last path component of an uploader-supplied name, either separator style.
fn base_name(filename: &str) -> String {
    filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or("")
        .trim()
        .to_string()
}

/// True when `name` is a single ordinary path component (no separators, not `.` or `..`).
fn is_plain_file_name(name: &str) -> bool {
    if name.contains('\\') {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains('/')
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        tracing::warn!(path = %path.display(), error = %e, "could not remove discarded upload");
    }
}
