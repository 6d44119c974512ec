//! SQLite-backed [`VectorStore`].
//!
//! Embeddings are stored as little-endian f32 BLOBs in the `entries` table;
//! search is a brute-force cosine scan. Each batch append runs in one
//! transaction, and the database runs in WAL mode so searches never block on
//! (or observe part of) an in-flight batch.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use std::path::Path;

use crate::db;
use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use crate::migrate;
use crate::models::{IndexEntry, SearchHit, SourceMetadata};

use super::{model_mismatch, rank_hits, VectorStore};

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect to the database at `path` and ensure the schema exists.
    pub async fn open(path: &Path) -> Result<Self> {
        let pool = db::connect(path)
            .await
            .with_context(|| format!("Failed to open vector index at {}", path.display()))?;
        migrate::run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

async fn meta_value(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
    let row = sqlx::query("SELECT value FROM index_meta WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|r| r.get("value")))
}

#[async_trait]
impl VectorStore for SqliteStore {
    async fn bind_model(&self, model: &str, dims: usize) -> Result<()> {
        let stored_model = meta_value(&self.pool, "embedding_model").await?;
        let stored_dims = meta_value(&self.pool, "embedding_dims").await?;

        if let (Some(m), Some(d)) = (stored_model, stored_dims) {
            let d: usize = d.parse().unwrap_or(0);
            if m != model || d != dims {
                bail!(model_mismatch(&m, d, model, dims));
            }
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for (key, value) in [
            ("embedding_model", model.to_string()),
            ("embedding_dims", dims.to_string()),
        ] {
            sqlx::query(
                "INSERT INTO index_meta (key, value) VALUES (?, ?) \
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            )
            .bind(key)
            .bind(value)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn append(&self, entries: &[IndexEntry]) -> Result<usize> {
        let mut tx = self.pool.begin().await?;

        for entry in entries {
            let metadata_json = serde_json::to_string(&entry.metadata)?;
            sqlx::query(
                r#"
                INSERT INTO entries (id, text, metadata_json, filename, page, hash,
                                     dims, embedding, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&entry.id)
            .bind(&entry.text)
            .bind(&metadata_json)
            .bind(&entry.metadata.filename)
            .bind(entry.metadata.page.map(i64::from))
            .bind(&entry.hash)
            .bind(entry.embedding.len() as i64)
            .bind(vec_to_blob(&entry.embedding))
            .bind(entry.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(entries.len())
    }

    async fn nearest(&self, query_vec: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        let rows = sqlx::query(
            "SELECT id, text, metadata_json, embedding FROM entries ORDER BY rowid ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut hits = Vec::with_capacity(rows.len());
        for row in &rows {
            let blob: Vec<u8> = row.get("embedding");
            let metadata_json: String = row.get("metadata_json");
            let metadata: SourceMetadata = serde_json::from_str(&metadata_json)
                .with_context(|| "Corrupt metadata_json in entries table")?;
            hits.push(SearchHit {
                id: row.get("id"),
                text: row.get("text"),
                metadata,
                score: cosine_similarity(query_vec, &blob_to_vec(&blob)) as f64,
            });
        }

        Ok(rank_hits(hits, k))
    }

    async fn count(&self) -> Result<usize> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM entries")
            .fetch_one(&self.pool)
            .await?;
        Ok(n as usize)
    }
}
