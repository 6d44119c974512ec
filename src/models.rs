//! Core data models used throughout Context AI.
//!
//! These types represent the documents, text units, chunks, and retrieval
//! results that flow through the ingestion and question-answering pipeline.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// File formats the loader knows how to extract text from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Docx,
}

impl DocumentFormat {
    /// Identify the format from a filename suffix (case-insensitive).
    ///
    /// Returns `None` for anything other than `.pdf` and `.docx`.
    pub fn from_filename(name: &str) -> Option<Self> {
        let ext = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())?
            .to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(DocumentFormat::Pdf),
            "docx" => Some(DocumentFormat::Docx),
            _ => None,
        }
    }
}

/// Returns the suffix of `name` as shown in error messages (e.g. `".txt"`),
/// or the whole name when it has no suffix.
pub fn display_suffix(name: &str) -> String {
    match Path::new(name).extension().and_then(|e| e.to_str()) {
        Some(ext) => format!(".{}", ext),
        None => name.to_string(),
    }
}

/// A raw uploaded file before text extraction.
#[derive(Debug, Clone)]
pub struct Document {
    pub filename: String,
    pub format: DocumentFormat,
    pub bytes: Vec<u8>,
}

/// Attribution carried from a text unit to every chunk cut from it, and
/// returned to callers as `source_docs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMetadata {
    /// Path the document was loaded from.
    pub source: String,
    /// Original filename of the upload.
    pub filename: String,
    /// Zero-based page index (PDF only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

/// An extracted page or section of a document.
#[derive(Debug, Clone)]
pub struct TextUnit {
    pub text: String,
    pub metadata: SourceMetadata,
}

/// A semantically coherent span of a text unit.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Position within the parent text unit, starting at 0.
    pub chunk_index: i64,
    pub text: String,
    /// SHA-256 of `text`, hex encoded.
    pub hash: String,
    pub metadata: SourceMetadata,
}

/// One persisted row of the vector index.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub id: String,
    pub text: String,
    pub metadata: SourceMetadata,
    pub embedding: Vec<f32>,
    pub hash: String,
    pub created_at: i64,
}

/// A chunk returned from similarity search, closest first.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub text: String,
    pub metadata: SourceMetadata,
    /// Cosine similarity in `[-1.0, 1.0]`.
    pub score: f64,
}

/// A generated answer with the metadata of the chunks it was grounded on.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub response: String,
    pub source_docs: Vec<SourceMetadata>,
}
