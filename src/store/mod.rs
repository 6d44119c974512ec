//! Storage abstraction for the vector index.
//!
//! The [`VectorStore`] trait is the persistence boundary of the pipeline:
//! [`SqliteStore`](sqlite::SqliteStore) is the durable backend and
//! [`InMemoryStore`](memory::InMemoryStore) serves tests and throwaway runs.
//!
//! Implementations must be `Send + Sync` and safe for concurrent append and
//! search without external locking. A batch passed to
//! [`append`](VectorStore::append) becomes visible all at once or not at all.

pub mod memory;
pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;
use std::cmp::Ordering;

use crate::models::{IndexEntry, SearchHit};

/// Abstract persistence backend for [`IndexEntry`] rows.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`bind_model`](VectorStore::bind_model) | Record or verify the embedding model |
/// | [`append`](VectorStore::append) | Atomically add a batch of entries |
/// | [`nearest`](VectorStore::nearest) | Top-k cosine similarity search |
/// | [`count`](VectorStore::count) | Number of stored entries |
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Record the embedding model for this store, or fail if the store was
    /// built with a different model or dimensionality.
    async fn bind_model(&self, model: &str, dims: usize) -> Result<()>;

    /// Append all entries as one atomic batch. Returns the number stored.
    async fn append(&self, entries: &[IndexEntry]) -> Result<usize>;

    /// Return up to `k` entries ordered by descending cosine similarity.
    async fn nearest(&self, query_vec: &[f32], k: usize) -> Result<Vec<SearchHit>>;

    async fn count(&self) -> Result<usize>;
}

/// Error text for a model mismatch; shared by both backends.
pub(crate) fn model_mismatch(stored: &str, stored_dims: usize, model: &str, dims: usize) -> String {
    format!(
        "index was built with embedding model '{}' ({} dims) but '{}' ({} dims) is configured; \
         rebuild the index or switch the embedding model back",
        stored, stored_dims, model, dims
    )
}

/// Sort by descending score, keeping insertion order for ties, and keep `k`.
pub(crate) fn rank_hits(mut hits: Vec<SearchHit>, k: usize) -> Vec<SearchHit> {
    hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    hits.truncate(k);
    hits
}
