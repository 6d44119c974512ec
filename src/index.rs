//! The vector index: one embedder bound to one [`VectorStore`].
//!
//! The same [`Embedder`] vectorizes chunks at ingestion time and questions
//! at query time, and [`VectorIndex::open`] refuses a store built with a
//! different model. Scores from mixed models would be meaningless.
//!
//! Constructed once per process and shared behind an `Arc`.

use std::sync::Arc;

use uuid::Uuid;

use crate::embedding::Embedder;
use crate::error::RagError;
use crate::models::{Chunk, IndexEntry, SearchHit};
use crate::store::VectorStore;

pub struct VectorIndex {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
}

impl VectorIndex {
    /// Bind `embedder` to `store`, failing on an embedding-model mismatch.
    pub async fn open(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
    ) -> anyhow::Result<Self> {
        store
            .bind_model(embedder.model_name(), embedder.dims())
            .await?;
        Ok(Self { embedder, store })
    }

    /// Embed and store every chunk as one batch; returns the number stored.
    ///
    /// All-or-nothing: if any embedding or the write fails, nothing from
    /// this call is visible in the index.
    pub async fn add(&self, chunks: &[Chunk]) -> Result<usize, RagError> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self
            .embedder
            .embed_texts(&texts)
            .await
            .map_err(|e| RagError::Indexing(e.to_string()))?;
        if vectors.len() != chunks.len() {
            return Err(RagError::Indexing(format!(
                "embedder returned {} vectors for {} chunks",
                vectors.len(),
                chunks.len()
            )));
        }
        let dims = self.embedder.dims();
        if let Some(bad) = vectors.iter().find(|v| v.len() != dims) {
            return Err(RagError::Indexing(format!(
                "embedder {} returned a {}-dim vector, expected {}",
                self.embedder.model_name(),
                bad.len(),
                dims
            )));
        }

        let now = chrono::Utc::now().timestamp();
        let entries: Vec<IndexEntry> = chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, embedding)| IndexEntry {
                id: Uuid::new_v4().to_string(),
                text: chunk.text.clone(),
                metadata: chunk.metadata.clone(),
                embedding,
                hash: chunk.hash.clone(),
                created_at: now,
            })
            .collect();

        let stored = self
            .store
            .append(&entries)
            .await
            .map_err(|e| RagError::Indexing(e.to_string()))?;
        tracing::debug!(stored, "appended batch to vector index");
        Ok(stored)
    }

    /// Return up to `k` chunks closest to `query`, most similar first.
    ///
    /// An empty index yields an empty list.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>, RagError> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let query_vec = self
            .embedder
            .embed_query(query)
            .await
            .map_err(|e| RagError::Retrieval(e.to_string()))?;
        if query_vec.len() != self.embedder.dims() {
            return Err(RagError::Retrieval(format!(
                "embedder {} returned a {}-dim query vector, expected {}",
                self.embedder.model_name(),
                query_vec.len(),
                self.embedder.dims()
            )));
        }
        self.store
            .nearest(&query_vec, k)
            .await
            .map_err(|e| RagError::Retrieval(e.to_string()))
    }

    pub async fn len(&self) -> Result<usize, RagError> {
        self.store
            .count()
            .await
            .map_err(|e| RagError::Retrieval(e.to_string()))
    }

    pub async fn is_empty(&self) -> Result<bool, RagError> {
        Ok(self.len().await? == 0)
    }
}
