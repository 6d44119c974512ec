//! Error taxonomy surfaced by the ingestion and question-answering pipeline.
//!
//! Inner layers (stores, embedding providers, language models) work with
//! [`anyhow::Result`]; the pipeline maps their failures into a [`RagError`]
//! so that callers (the HTTP server and the CLI) can report each failure
//! class distinctly.

use thiserror::Error;

/// A failure reported to the caller of a single upload or chat request.
///
/// None of these are fatal to the process except [`RagError::MissingCredential`],
/// which is raised at startup.
#[derive(Debug, Error)]
pub enum RagError {
    /// The file suffix is not one of the supported formats (`.pdf`, `.docx`).
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// The uploaded file could not be written to the uploads directory.
    #[error("Failed to save file: {0}")]
    SaveFailure(#[source] std::io::Error),

    /// The file was readable but its text could not be extracted.
    #[error("Failed to extract text: {0}")]
    Extraction(String),

    /// Embedding or index write failed while ingesting a document.
    /// No entries from the failed batch are stored.
    #[error("Indexing failed: {0}")]
    Indexing(String),

    /// Embedding the query or reading the index failed.
    #[error("Retrieval failed: {0}")]
    Retrieval(String),

    /// The language model call failed (timeout, rate limit, auth, ...).
    #[error("Generation failed: {0}")]
    Generation(String),

    /// The language-model credential is absent from the environment.
    #[error("{0} environment variable not set")]
    MissingCredential(String),

    /// The request itself is malformed (e.g. an empty question).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl RagError {
    /// Machine-readable code used in logs.
    pub fn code(&self) -> &'static str {
        match self {
            RagError::UnsupportedFormat(_) => "unsupported_format",
            RagError::SaveFailure(_) => "save_failure",
            RagError::Extraction(_) => "extraction_error",
            RagError::Indexing(_) => "indexing_error",
            RagError::Retrieval(_) => "retrieval_error",
            RagError::Generation(_) => "generation_error",
            RagError::MissingCredential(_) => "missing_credential",
            RagError::InvalidRequest(_) => "bad_request",
        }
    }
}
