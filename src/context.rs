//! Wiring of the long-lived services shared by the CLI and the HTTP server.

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::chat::ChatDeps;
use crate::completion::{CompletionService, OllamaClient};
use crate::config::Config;
use crate::documents::DocumentManager;
use crate::knowledge::KnowledgeBase;
use crate::notes::{InMemoryNoteStore, NoteStore};
use crate::prompt::PromptComposer;
use crate::store::sqlite::SqliteChunkStore;
use crate::store::ChunkStore;
use crate::{db, migrate};

#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub knowledge: KnowledgeBase,
    pub documents: DocumentManager,
    pub completion: Arc<dyn CompletionService>,
    pub composer: PromptComposer,
    pub notes: Arc<dyn NoteStore>,
}

impl AppContext {
    /// Creates the data directories, opens and migrates the knowledge
    /// database, and connects the completion client.
    pub async fn open(config: &Config) -> Result<Self> {
        std::fs::create_dir_all(&config.paths.documents_dir).with_context(|| {
            format!(
                "Failed to create documents directory: {}",
                config.paths.documents_dir.display()
            )
        })?;

        let pool = db::connect(config).await?;
        migrate::run_migrations(&pool).await?;
        let store: Arc<dyn ChunkStore> =
            Arc::new(SqliteChunkStore::new(pool, config.embedding.clone()));

        let completion: Arc<dyn CompletionService> = Arc::new(OllamaClient::new(&config.ollama)?);
        Ok(Self::with_services(
            config,
            store,
            completion,
            Arc::new(InMemoryNoteStore::new()),
        ))
    }

    /// Assembles a context from already-built backends.
    pub fn with_services(
        config: &Config,
        store: Arc<dyn ChunkStore>,
        completion: Arc<dyn CompletionService>,
        notes: Arc<dyn NoteStore>,
    ) -> Self {
        let knowledge = KnowledgeBase::new(store);
        let documents = DocumentManager::new(
            config.paths.documents_dir.clone(),
            knowledge.clone(),
            config.chunking.clone(),
        );
        Self {
            config: Arc::new(config.clone()),
            knowledge,
            documents,
            completion,
            composer: PromptComposer::new(&config.prompt, &config.retrieval),
            notes,
        }
    }

    pub fn chat_deps(&self) -> ChatDeps<'_> {
        ChatDeps {
            knowledge: &self.knowledge,
            completion: self.completion.as_ref(),
            composer: &self.composer,
            default_model: &self.config.ollama.default_model,
            top_k: self.config.retrieval.top_k,
        }
    }
}
