//! TOML configuration.
//!
//! Every section carries serde defaults, so an empty file (or
//! [`Config::default`]) reproduces the stock gateway: Ollama on
//! `localhost:11434`, 1000/200 character chunks, three retrieved snippets of
//! at most 500 characters, and a six-turn history window.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub prompt: PromptConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PathsConfig {
    /// Uploaded originals, stored as `{id}_{filename}`.
    #[serde(default = "default_documents_dir")]
    pub documents_dir: PathBuf,
    /// Backing directory of the similarity store.
    #[serde(default = "default_vector_db_dir")]
    pub vector_db_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            documents_dir: default_documents_dir(),
            vector_db_dir: default_vector_db_dir(),
        }
    }
}

impl PathsConfig {
    /// SQLite file holding the single knowledge collection.
    pub fn knowledge_db(&self) -> PathBuf {
        self.vector_db_dir.join("knowledge.sqlite")
    }
}

fn default_documents_dir() -> PathBuf {
    PathBuf::from("./knowledge_base/documents")
}
fn default_vector_db_dir() -> PathBuf {
    PathBuf::from("./knowledge_base/vector_db")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8000".to_string()
}
fn default_max_upload_bytes() -> usize {
    50 * 1024 * 1024
}

#[derive(Debug, Deserialize, Clone)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_url")]
    pub url: String,
    #[serde(default = "default_model")]
    pub default_model: String,
    /// Upper bound for a single generate call.
    #[serde(default = "default_generate_timeout")]
    pub timeout_secs: u64,
    /// Upper bound for model listing and health probes.
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            url: default_ollama_url(),
            default_model: default_model(),
            timeout_secs: default_generate_timeout(),
            probe_timeout_secs: default_probe_timeout(),
        }
    }
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_model() -> String {
    "phi3:3.8b".to_string()
}
fn default_generate_timeout() -> u64 {
    60
}
fn default_probe_timeout() -> u64 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    /// Window size in characters.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Characters shared by consecutive chunks.
    #[serde(default = "default_chunk_overlap")]
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap: default_chunk_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    1000
}
fn default_chunk_overlap() -> usize {
    200
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Per-snippet character budget inside the prompt.
    #[serde(default = "default_snippet_chars")]
    pub snippet_chars: usize,
    /// Most recent conversation turns forwarded to the model.
    #[serde(default = "default_history_turns")]
    pub history_turns: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            snippet_chars: default_snippet_chars(),
            history_turns: default_history_turns(),
        }
    }
}

fn default_top_k() -> usize {
    3
}
fn default_snippet_chars() -> usize {
    500
}
fn default_history_turns() -> usize {
    6
}

#[derive(Debug, Deserialize, Clone)]
pub struct PromptConfig {
    #[serde(default = "default_system_prompt")]
    pub default_system_prompt: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            default_system_prompt: default_system_prompt(),
        }
    }
}

fn default_system_prompt() -> String {
    "You are a helpful AI assistant.".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Base URL for the `ollama` provider; falls back to `[ollama].url`.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: None,
            url: None,
            batch_size: default_batch_size(),
            timeout_secs: default_embedding_timeout(),
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_batch_size() -> usize {
    32
}
fn default_embedding_timeout() -> u64 {
    30
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config: Config =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.embedding.provider == "ollama" && config.embedding.url.is_none() {
        config.embedding.url = Some(config.ollama.url.clone());
    }

    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    if config.chunking.chunk_size == 0 {
        anyhow::bail!("chunking.chunk_size must be > 0");
    }
    if config.chunking.overlap >= config.chunking.chunk_size {
        anyhow::bail!(
            "chunking.overlap ({}) must be smaller than chunking.chunk_size ({})",
            config.chunking.overlap,
            config.chunking.chunk_size
        );
    }

    if config.retrieval.top_k == 0 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }
    if config.retrieval.history_turns == 0 {
        anyhow::bail!("retrieval.history_turns must be >= 1");
    }

    if config.ollama.timeout_secs == 0 || config.ollama.probe_timeout_secs == 0 {
        anyhow::bail!("ollama timeouts must be > 0");
    }

    match config.embedding.provider.as_str() {
        "disabled" | "local" => {}
        "ollama" => {
            if config.embedding.model.is_none() {
                anyhow::bail!("embedding.model must be specified when provider is 'ollama'");
            }
        }
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled, ollama, or local.",
            other
        ),
    }
    if config.embedding.is_enabled() && config.embedding.batch_size == 0 {
        anyhow::bail!("embedding.batch_size must be > 0");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(content: &str) -> (tempfile::TempDir, PathBuf) {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("buddy.toml");
        std::fs::write(&path, content).unwrap();
        (tmp, path)
    }

    #[test]
    fn empty_file_yields_stock_defaults() {
        let (_tmp, path) = write_config("");
        let config = load_config(&path).unwrap();
        assert_eq!(config.chunking.chunk_size, 1000);
        assert_eq!(config.chunking.overlap, 200);
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.retrieval.snippet_chars, 500);
        assert_eq!(config.retrieval.history_turns, 6);
        assert_eq!(config.ollama.default_model, "phi3:3.8b");
        assert_eq!(config.ollama.timeout_secs, 60);
        assert!(!config.embedding.is_enabled());
    }

    #[test]
    fn sections_override_defaults() {
        let (_tmp, path) = write_config(
            r#"
[ollama]
url = "http://10.0.0.5:11434"
default_model = "llama3"

[retrieval]
history_turns = 10
"#,
        );
        let config = load_config(&path).unwrap();
        assert_eq!(config.ollama.url, "http://10.0.0.5:11434");
        assert_eq!(config.ollama.default_model, "llama3");
        assert_eq!(config.retrieval.history_turns, 10);
        assert_eq!(config.retrieval.top_k, 3);
    }

    #[test]
    fn overlap_must_be_smaller_than_chunk_size() {
        let (_tmp, path) = write_config("[chunking]\nchunk_size = 100\noverlap = 100\n");
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("overlap"));
    }

    #[test]
    fn unknown_embedding_provider_rejected() {
        let (_tmp, path) = write_config("[embedding]\nprovider = \"chroma\"\n");
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn ollama_embeddings_inherit_service_url() {
        let (_tmp, path) = write_config(
            r#"
[ollama]
url = "http://gpu-box:11434"

[embedding]
provider = "ollama"
model = "nomic-embed-text"
"#,
        );
        let config = load_config(&path).unwrap();
        assert_eq!(config.embedding.url.as_deref(), Some("http://gpu-box:11434"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = load_config(Path::new("/nonexistent/buddy.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
