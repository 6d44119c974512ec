//! # Context AI
//!
//! Retrieval-augmented question answering over uploaded PDF and DOCX files.
//!
//! Documents are split into semantically coherent chunks, embedded, and
//! stored in a vector index. Questions retrieve the closest chunks, which are
//! placed into a fixed prompt for a hosted language model (Perplexity
//! `sonar-pro` by default). The answer is returned with the metadata of
//! the chunks it was grounded on.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌──────────┐   ┌──────────────┐
//! │  Loader  │──▶│ Chunker  │──▶│ Embedder │──▶│ Vector Index │
//! │ PDF/DOCX │   │ semantic │   │          │   │   (SQLite)   │
//! └──────────┘   └──────────┘   └──────────┘   └──────┬───────┘
//!                                                     │ top-k
//!                                                     ▼
//!                 ┌──────────┐   ┌──────────┐   ┌──────────────┐
//!                 │ CLI/HTTP │◀──│   LLM    │◀──│    Prompt    │
//!                 └──────────┘   └──────────┘   └──────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`error`] | Pipeline error taxonomy |
//! | [`loader`] | PDF/DOCX text extraction |
//! | [`chunker`] | Semantic chunking |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`store`] | Vector store backends |
//! | [`index`] | Embedder-bound vector index |
//! | [`prompt`] | Prompt template |
//! | [`llm`] | Language-model providers |
//! | [`answer`] | Answer composition |
//! | [`pipeline`] | Ingest and ask orchestration |
//! | [`server`] | HTTP server |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod answer;
pub mod chunker;
pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod index;
pub mod llm;
pub mod loader;
pub mod migrate;
pub mod models;
pub mod pipeline;
pub mod prompt;
pub mod server;
pub mod store;
