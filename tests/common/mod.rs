//! Fixtures shared by the integration tests: hand-built PDF/DOCX files,
//! a stub language model, and a pipeline wired to in-process components.

#![allow(dead_code)]

use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use async_trait::async_trait;
use context_ai::config::Config;
use context_ai::embedding::HashEmbedder;
use context_ai::llm::LanguageModel;
use context_ai::pipeline::RagPipeline;
use context_ai::store::memory::InMemoryStore;
use context_ai::store::VectorStore;

/// Multi-page PDF with one line of Helvetica text per page.
///
/// Object offsets and stream lengths are computed so the xref table is exact.
pub fn pdf_with_pages(pages: &[&str]) -> Vec<u8> {
    let n = pages.len();
    // 1: catalog, 2: pages, 3: font, then (page, contents) pairs.
    let page_id = |i: usize| 4 + 2 * i;
    let contents_id = |i: usize| 5 + 2 * i;

    let mut objects: Vec<Vec<u8>> = Vec::new();
    objects.push(b"<< /Type /Catalog /Pages 2 0 R >>".to_vec());
    let kids = (0..n)
        .map(|i| format!("{} 0 R", page_id(i)))
        .collect::<Vec<_>>()
        .join(" ");
    objects.push(format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids, n).into_bytes());
    objects.push(
        b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
            .to_vec(),
    );
    for (i, text) in pages.iter().enumerate() {
        objects.push(
            format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents {} 0 R \
                 /Resources << /Font << /F1 3 0 R >> >> >>",
                contents_id(i)
            )
            .into_bytes(),
        );
        let stream = format!("BT /F1 12 Tf 72 700 Td ({}) Tj ET", text);
        objects.push(
            format!(
                "<< /Length {} >>\nstream\n{}\nendstream",
                stream.len(),
                stream
            )
            .into_bytes(),
        );
    }

    let mut out = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n", i + 1).as_bytes());
        out.extend_from_slice(body);
        out.extend_from_slice(b"\nendobj\n");
    }
    let xref_start = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
    out.extend_from_slice(b"0000000000 65535 f \n");
    for off in offsets {
        out.extend_from_slice(format!("{:010} 00000 n \n", off).as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer << /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_start
        )
        .as_bytes(),
    );
    out
}

/// DOCX (ZIP) whose `word/document.xml` has one `<w:p>` per paragraph.
pub fn docx_with_paragraphs(paragraphs: &[&str]) -> Vec<u8> {
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", p))
        .collect();
    let xml = format!(
        "<?xml version=\"1.0\"?><w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"><w:body>{}</w:body></w:document>",
        body
    );

    let mut buf = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
        zip.start_file("word/document.xml", zip::write::SimpleFileOptions::default())
            .unwrap();
        zip.write_all(xml.as_bytes()).unwrap();
        zip.finish().unwrap();
    }
    buf
}

pub const VITALYZE_PARAGRAPHS: &[&str] = &[
    "The project name is Vitalyze.ai.",
    "It is an AI-powered health hub.",
    "The main goal is to simplify medical reports.",
];

/// Answers from its prompt: echoes the project name when the context holds it.
///
/// Every prompt it receives is recorded.
#[derive(Default)]
pub struct StubModel {
    pub prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl LanguageModel for StubModel {
    fn model_name(&self) -> &str {
        "stub"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if context_of(prompt).contains("Vitalyze.ai") {
            Ok("**The project name is Vitalyze.ai.**\n\n### Key Details\n* It is an AI-powered health hub.".to_string())
        } else {
            Ok("**No matching document found.**\n\nUsing general knowledge.".to_string())
        }
    }
}

/// The text between the context header and the question header.
pub fn context_of(prompt: &str) -> &str {
    let start = prompt
        .find("CONTEXT FROM DOCUMENTS:\n")
        .map(|i| i + "CONTEXT FROM DOCUMENTS:\n".len())
        .unwrap_or(0);
    let end = prompt.find("\n\nUSER QUESTION:").unwrap_or(prompt.len());
    &prompt[start..end.max(start)]
}

/// Always fails, like a provider returning 503.
pub struct FailingModel;

#[async_trait]
impl LanguageModel for FailingModel {
    fn model_name(&self) -> &str {
        "failing"
    }

    async fn generate(&self, _prompt: &str) -> Result<String> {
        bail!("perplexity returned 503 Service Unavailable")
    }
}

/// Pipeline over a fresh in-memory store with a hash embedder.
pub async fn memory_pipeline(
    data_dir: &Path,
    model: Arc<dyn LanguageModel>,
) -> (RagPipeline, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    let dyn_store: Arc<dyn VectorStore> = store.clone();
    let pipeline = RagPipeline::new(
        Config::minimal(data_dir),
        Arc::new(HashEmbedder::new(256)),
        dyn_store,
        Some(model),
    )
    .await
    .unwrap();
    (pipeline, store)
}
