//! In-memory [`VectorStore`] for tests and ephemeral runs.
//!
//! Entries live in a `Vec` behind an `RwLock`; search is brute-force cosine
//! similarity. A batch is appended under a single write lock, so readers see
//! all of it or none of it.

use std::sync::RwLock;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use crate::embedding::cosine_similarity;
use crate::models::{IndexEntry, SearchHit};

use super::{model_mismatch, rank_hits, VectorStore};

#[derive(Default)]
pub struct InMemoryStore {
    entries: RwLock<Vec<IndexEntry>>,
    model: RwLock<Option<(String, usize)>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("in-memory store lock poisoned")
}

#[async_trait]
impl VectorStore for InMemoryStore {
    async fn bind_model(&self, model: &str, dims: usize) -> Result<()> {
        let mut bound = self.model.write().map_err(poisoned)?;
        match bound.as_ref() {
            Some((m, d)) if m != model || *d != dims => {
                bail!(model_mismatch(m, *d, model, dims))
            }
            Some(_) => Ok(()),
            None => {
                *bound = Some((model.to_string(), dims));
                Ok(())
            }
        }
    }

    async fn append(&self, entries: &[IndexEntry]) -> Result<usize> {
        let mut stored = self.entries.write().map_err(poisoned)?;
        stored.extend_from_slice(entries);
        Ok(entries.len())
    }

    async fn nearest(&self, query_vec: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        let stored = self.entries.read().map_err(poisoned)?;
        let hits = stored
            .iter()
            .map(|e| SearchHit {
                id: e.id.clone(),
                text: e.text.clone(),
                metadata: e.metadata.clone(),
                score: cosine_similarity(query_vec, &e.embedding) as f64,
            })
            .collect();
        Ok(rank_hits(hits, k))
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.entries.read().map_err(poisoned)?.len())
    }
}
