//! # Buddy CLI (`buddy`)
//!
//! ```bash
//! buddy --config ./config/buddy.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `buddy init` | Create data directories and the knowledge database |
//! | `buddy serve` | Start the HTTP API |
//! | `buddy upload <path>` | Upload and index a document |
//! | `buddy documents` | List stored documents |
//! | `buddy delete <stored_name>` | Delete a document and its chunks |
//! | `buddy search "<query>"` | Query the knowledge base |
//! | `buddy chat "<message>"` | One chat turn against the local model |
//! | `buddy models` | List models offered by Ollama |

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use buddy::{commands, config, logging, server};

/// Buddy: a local chat gateway with document retrieval.
#[derive(Parser)]
#[command(
    name = "buddy",
    about = "Buddy: a local-first chat gateway with retrieval over your documents",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/buddy.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the data directories and knowledge database. Idempotent.
    Init,

    /// Start the HTTP API on `[server].bind`.
    Serve,

    /// Upload a .pdf, .docx, .doc, or .txt file into the knowledge base.
    Upload {
        path: PathBuf,
    },

    /// List stored documents.
    Documents,

    /// Delete a stored document by its stored name (`{id}_{filename}`).
    Delete {
        stored_name: String,
    },

    /// Search the knowledge base.
    Search {
        query: String,

        /// Maximum number of results (defaults to `[retrieval].top_k`).
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Send one message to the model.
    Chat {
        message: String,

        /// Ground the answer in uploaded documents.
        #[arg(long)]
        rag: bool,

        /// Model to use instead of `[ollama].default_model`.
        #[arg(long)]
        model: Option<String>,
    },

    /// List models available from Ollama.
    Models,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init("info");

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => commands::run_init(&cfg).await?,
        Commands::Serve => server::run_server(&cfg).await?,
        Commands::Upload { path } => commands::run_upload(&cfg, &path).await?,
        Commands::Documents => commands::run_documents(&cfg).await?,
        Commands::Delete { stored_name } => commands::run_delete(&cfg, &stored_name).await?,
        Commands::Search { query, limit } => commands::run_search(&cfg, &query, limit).await?,
        Commands::Chat {
            message,
            rag,
            model,
        } => commands::run_chat(&cfg, &message, rag, model).await?,
        Commands::Models => commands::run_models(&cfg).await?,
    }

    Ok(())
}
