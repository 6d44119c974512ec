//! Ingestion and question-answering orchestration.
//!
//! ```text
//! upload ──► save ──► load ──► chunk ──► embed + append (one batch)
//! question ──► embed ──► top-k ──► prompt ──► model ──► Answer
//! ```
//!
//! [`RagPipeline`] is built once per process and shared behind an `Arc` by
//! the HTTP server; the CLI builds one per command. It takes no locks of its
//! own; concurrency is the store's concern.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::answer::AnswerComposer;
use crate::chunker::SemanticChunker;
use crate::config::Config;
use crate::embedding::{create_embedder, Embedder};
use crate::error::RagError;
use crate::index::VectorIndex;
use crate::llm::{create_model, require_api_key, LanguageModel};
use crate::loader;
use crate::models::{display_suffix, Answer, Document, DocumentFormat, SearchHit, SourceMetadata};
use crate::store::sqlite::SqliteStore;
use crate::store::VectorStore;

/// Outcome of one successful ingestion.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub filename: String,
    pub chunks: usize,
}

pub struct RagPipeline {
    config: Config,
    index: VectorIndex,
    chunker: SemanticChunker,
    composer: Option<AnswerComposer>,
}

impl RagPipeline {
    /// Assemble a pipeline from already-constructed components.
    ///
    /// The chunker and the index share `embedder`. Without a `model` the
    /// pipeline can ingest and search, but [`ask`](Self::ask) fails.
    pub async fn new(
        config: Config,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        model: Option<Arc<dyn LanguageModel>>,
    ) -> anyhow::Result<Self> {
        let index = VectorIndex::open(embedder.clone(), store).await?;
        let chunker = SemanticChunker::new(embedder, config.chunking.clone());
        Ok(Self {
            config,
            index,
            chunker,
            composer: model.map(AnswerComposer::new),
        })
    }

    /// Build the embedder, SQLite store and language model named by `config`.
    ///
    /// The language model is skipped when its credential is absent; callers
    /// that need answers should check [`require_api_key`] first.
    pub async fn from_config(config: Config) -> anyhow::Result<Self> {
        let embedder = create_embedder(&config.embedding)?;
        let store = SqliteStore::open(&config.db.path).await?;
        let model = match require_api_key(&config.llm) {
            Ok(_) => Some(create_model(&config.llm)?),
            Err(e) => {
                tracing::debug!(error = %e, "language model not configured");
                None
            }
        };
        tracing::info!(
            embedder = embedder.model_name(),
            llm = model.as_ref().map(|m| m.model_name()).unwrap_or("none"),
            db = %config.db.path.display(),
            "pipeline ready"
        );
        Self::new(config, embedder, Arc::new(store), model).await
    }

    pub fn uploads_dir(&self) -> &Path {
        &self.config.uploads.dir
    }

    /// Persist an uploaded file and index its contents.
    ///
    /// The format is checked before anything touches disk, so an unsupported
    /// upload leaves both the uploads directory and the index unchanged.
    /// A file with the same name is overwritten.
    pub async fn ingest_upload(&self, filename: &str, bytes: Vec<u8>) -> Result<IngestReport, RagError> {
        let name = sanitize_filename(filename)?;
        let format = DocumentFormat::from_filename(&name)
            .ok_or_else(|| RagError::UnsupportedFormat(display_suffix(&name)))?;

        let dir = self.uploads_dir();
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(RagError::SaveFailure)?;
        let dest = dir.join(&name);
        tokio::fs::write(&dest, &bytes)
            .await
            .map_err(RagError::SaveFailure)?;
        tracing::info!(file = %dest.display(), bytes = bytes.len(), "saved upload");

        let doc = Document {
            filename: name,
            format,
            bytes,
        };
        self.ingest_document(doc, dest).await
    }

    /// Index a file already on disk (CLI ingestion). Nothing is copied.
    pub async fn ingest_path(&self, path: &Path) -> Result<IngestReport, RagError> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        let format = DocumentFormat::from_filename(&name)
            .ok_or_else(|| RagError::UnsupportedFormat(display_suffix(&name)))?;
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            RagError::Extraction(format!("failed to read {}: {}", path.display(), e))
        })?;

        let doc = Document {
            filename: name,
            format,
            bytes,
        };
        self.ingest_document(doc, path.to_path_buf()).await
    }

    async fn ingest_document(&self, doc: Document, source: PathBuf) -> Result<IngestReport, RagError> {
        let filename = doc.filename.clone();
        let base = SourceMetadata {
            source: source.display().to_string(),
            filename: doc.filename.clone(),
            page: None,
        };

        let units = tokio::task::spawn_blocking(move || loader::load_bytes(&doc.bytes, doc.format, &base))
            .await
            .map_err(|e| RagError::Extraction(format!("loader task failed: {}", e)))??;

        let chunks = self
            .chunker
            .split_units(&units)
            .await
            .map_err(|e| RagError::Indexing(e.to_string()))?;
        let stored = self.index.add(&chunks).await?;

        tracing::info!(file = %filename, units = units.len(), chunks = stored, "indexed document");
        Ok(IngestReport {
            filename,
            chunks: stored,
        })
    }

    /// Top-`k` chunks for `query`; `None` uses `retrieval.k`.
    pub async fn search(&self, query: &str, k: Option<usize>) -> Result<Vec<SearchHit>, RagError> {
        let k = k.unwrap_or(self.config.retrieval.k);
        self.index.search(query, k).await
    }

    /// Retrieve context for `question` and have the model answer it.
    ///
    /// An empty index is not an error: the model is asked with an empty
    /// context and `source_docs` is empty.
    pub async fn ask(&self, question: &str) -> Result<Answer, RagError> {
        if question.trim().is_empty() {
            return Err(RagError::InvalidRequest("question must not be empty".to_string()));
        }

        let composer = self
            .composer
            .as_ref()
            .ok_or_else(|| RagError::MissingCredential(self.config.llm.api_key_env.clone()))?;

        let hits = self.search(question, None).await?;
        tracing::debug!(hits = hits.len(), "retrieved context");

        let texts: Vec<&str> = hits.iter().map(|h| h.text.as_str()).collect();
        let response = composer.answer(question, &texts).await?;

        Ok(Answer {
            response,
            source_docs: hits.into_iter().map(|h| h.metadata).collect(),
        })
    }
}

/// Reduce a client-supplied filename to its final path component.
///
/// Both `/` and `\` count as separators, so `../../etc/x.pdf` and
/// `C:\docs\x.pdf` become `x.pdf`.
pub fn sanitize_filename(filename: &str) -> Result<String, RagError> {
    let name = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if name.is_empty() || name == "." || name == ".." {
        return Err(RagError::InvalidRequest(format!(
            "invalid upload filename: {:?}",
            filename
        )));
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("report.pdf").unwrap(), "report.pdf");
        assert_eq!(sanitize_filename("../../etc/notes.docx").unwrap(), "notes.docx");
        assert_eq!(sanitize_filename("C:\\docs\\a.PDF").unwrap(), "a.PDF");
        assert!(sanitize_filename("uploads/").is_err());
        assert!(sanitize_filename("..").is_err());
        assert!(sanitize_filename("").is_err());
    }
}
