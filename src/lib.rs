//! # Buddy Gateway
//!
//! A local-first backend for chatting with a locally hosted model (Ollama),
//! optionally grounded in documents the user has uploaded.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌─────────────┐   ┌──────────────┐
//! │  Upload  │──▶│ Extract +   │──▶│   SQLite      │
//! │ pdf/docx │   │ Chunk       │   │ FTS5 + Vec    │
//! └──────────┘   └─────────────┘   └──────┬───────┘
//!                                         │ retrieve
//!                 ┌──────────┐     ┌──────▼───────┐     ┌────────┐
//!                 │  HTTP /  │────▶│ Prompt +     │────▶│ Ollama │
//!                 │   CLI    │     │ Chat         │     │        │
//!                 └──────────┘     └──────────────┘     └────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types and id conventions |
//! | [`extract`] | PDF / Word / text extraction |
//! | [`chunk`] | Overlapping text chunking |
//! | [`embedding`] | Optional embedding providers |
//! | [`store`] | Chunk store trait, SQLite and in-memory backends |
//! | [`knowledge`] | Knowledge-base adapter used by the pipeline |
//! | [`prompt`] | Prompt composition |
//! | [`completion`] | Completion service client |
//! | [`documents`] | Upload, listing, and deletion of documents |
//! | [`chat`] | Chat orchestration |
//! | [`notes`] | Notes storage |
//! | [`weather`] | Mock weather |
//! | [`server`] | HTTP API |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod chat;
pub mod chunk;
pub mod commands;
pub mod completion;
pub mod config;
pub mod context;
pub mod db;
pub mod documents;
pub mod embedding;
pub mod extract;
pub mod knowledge;
pub mod logging;
pub mod migrate;
pub mod models;
pub mod notes;
pub mod prompt;
pub mod server;
pub mod store;
pub mod weather;
