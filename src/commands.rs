//! Implementations of the `buddy` subcommands that do not start the server.
//!
//! Each command opens an [`AppContext`], performs one operation, and prints
//! a plain-text result to stdout.

use anyhow::{bail, Context, Result};
use std::path::Path;

use crate::chat::{self, ChatRequest};
use crate::config::Config;
use crate::context::AppContext;

pub async fn run_init(config: &Config) -> Result<()> {
    let ctx = AppContext::open(config).await?;
    let chunks = ctx.knowledge.chunk_count().await?;
    println!("Database initialized successfully.");
    println!("  documents: {}", config.paths.documents_dir.display());
    println!("  knowledge: {}", config.paths.knowledge_db().display());
    println!("  chunks:    {}", chunks);
    Ok(())
}

pub async fn run_upload(config: &Config, path: &Path) -> Result<()> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("Not a file path: {}", path.display()))?;

    let ctx = AppContext::open(config).await?;
    let outcome = ctx.documents.upload(&filename, bytes).await?;
    println!("{} ({} chunks)", outcome.message, outcome.chunks_created);
    Ok(())
}

pub async fn run_documents(config: &Config) -> Result<()> {
    let ctx = AppContext::open(config).await?;
    let documents = ctx.documents.list().await?;
    if documents.is_empty() {
        println!("No documents.");
        return Ok(());
    }
    for doc in documents {
        let uploaded = chrono::DateTime::from_timestamp(doc.upload_date as i64, 0)
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        println!("{}\t{} bytes\t{}\t{}", doc.stored_name, doc.size, uploaded, doc.filename);
    }
    Ok(())
}

pub async fn run_delete(config: &Config, stored_name: &str) -> Result<()> {
    let ctx = AppContext::open(config).await?;
    let message = ctx.documents.delete(stored_name).await?;
    println!("{}", message);
    Ok(())
}

pub async fn run_search(config: &Config, query: &str, limit: Option<usize>) -> Result<()> {
    if query.trim().is_empty() {
        bail!("query must not be empty");
    }
    let ctx = AppContext::open(config).await?;
    let top_k = limit.unwrap_or(config.retrieval.top_k);
    let results = ctx.knowledge.search(query, top_k).await;

    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }
    for (i, result) in results.iter().enumerate() {
        let snippet: String = result
            .content
            .chars()
            .take(160)
            .collect::<String>()
            .replace('\n', " ");
        println!(
            "{}. [{:.3}] {} ({})",
            i + 1,
            result.distance,
            result.source,
            result.chunk_id
        );
        println!("   {}", snippet);
    }
    Ok(())
}

pub async fn run_chat(
    config: &Config,
    message: &str,
    use_rag: bool,
    model: Option<String>,
) -> Result<()> {
    let ctx = AppContext::open(config).await?;
    let mut request = ChatRequest::new(message);
    request.use_rag = use_rag;
    request.model = model;

    let reply = chat::respond(&ctx.chat_deps(), &request).await;
    println!("{}", reply.response);
    if !reply.sources.is_empty() {
        println!();
        println!("Sources: {}", reply.sources.join(", "));
    }
    Ok(())
}

pub async fn run_models(config: &Config) -> Result<()> {
    let ctx = AppContext::open(config).await?;
    match ctx.completion.list_models().await {
        Ok(models) if models.is_empty() => {
            println!("No models installed (default: {}).", config.ollama.default_model)
        }
        Ok(models) => {
            for name in models {
                let marker = if name == config.ollama.default_model { "*" } else { " " };
                println!("{} {}", marker, name);
            }
        }
        Err(e) => bail!("{}", e),
    }
    Ok(())
}
