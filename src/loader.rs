//! Document loading: PDF and DOCX files into page-attributed [`TextUnit`]s.
//!
//! PDFs produce one unit per page (with a zero-based `page` index); DOCX files
//! produce a single unit holding the whole body with one line per paragraph.
//! Loading only reads the file. It is blocking, so async callers should run it
//! on a blocking thread.

use std::io::Read;
use std::path::Path;

use crate::error::RagError;
use crate::models::{display_suffix, DocumentFormat, SourceMetadata, TextUnit};

/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Load a file, detecting its format from the filename suffix.
///
/// Fails with [`RagError::UnsupportedFormat`] for anything but `.pdf` / `.docx`.
pub fn load_path(path: &Path) -> Result<Vec<TextUnit>, RagError> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let format = DocumentFormat::from_filename(name)
        .ok_or_else(|| RagError::UnsupportedFormat(display_suffix(name)))?;
    load(path, format)
}

/// Load a file of a known format into text units.
pub fn load(path: &Path, format: DocumentFormat) -> Result<Vec<TextUnit>, RagError> {
    let bytes = std::fs::read(path).map_err(|e| {
        RagError::Extraction(format!("failed to read {}: {}", path.display(), e))
    })?;
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();
    let base = SourceMetadata {
        source: path.display().to_string(),
        filename,
        page: None,
    };
    load_bytes(&bytes, format, &base)
}

/// Extract text units from in-memory bytes, attributing each to `base`.
pub fn load_bytes(
    bytes: &[u8],
    format: DocumentFormat,
    base: &SourceMetadata,
) -> Result<Vec<TextUnit>, RagError> {
    match format {
        DocumentFormat::Pdf => {
            let pages = extract_pdf_pages(bytes)?;
            Ok(pages
                .into_iter()
                .enumerate()
                .map(|(i, text)| TextUnit {
                    text,
                    metadata: SourceMetadata {
                        page: Some(i as u32),
                        ..base.clone()
                    },
                })
                .collect())
        }
        DocumentFormat::Docx => {
            let text = extract_docx(bytes)?;
            Ok(vec![TextUnit {
                text,
                metadata: base.clone(),
            }])
        }
    }
}

fn extract_pdf_pages(bytes: &[u8]) -> Result<Vec<String>, RagError> {
    // pdf-extract panics on some malformed files.
    std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes))
        .map_err(|_| RagError::Extraction("PDF: parser panicked on malformed input".to_string()))?
        .map_err(|e| RagError::Extraction(format!("PDF: {}", e)))
}

fn ooxml_err(e: impl std::fmt::Display) -> RagError {
    RagError::Extraction(format!("DOCX: {}", e))
}

fn extract_docx(bytes: &[u8]) -> Result<String, RagError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).map_err(ooxml_err)?;
    let entry = archive
        .by_name("word/document.xml")
        .map_err(|_| ooxml_err("word/document.xml not found"))?;

    let mut doc_xml = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut doc_xml)
        .map_err(ooxml_err)?;
    if doc_xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(ooxml_err("word/document.xml exceeds size limit"));
    }
    extract_paragraphs(&doc_xml)
}

/// Collect `<w:t>` runs, ending a line at each `</w:p>` and honouring
/// `<w:tab/>` and `<w:br/>`.
fn extract_paragraphs(xml: &[u8]) -> Result<String, RagError> {
    use quick_xml::events::Event;

    let mut paragraphs: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_text = false;
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if e.local_name().as_ref() == b"t" {
                    in_text = true;
                }
            }
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"tab" => current.push('\t'),
                b"br" => current.push('\n'),
                _ => {}
            },
            Ok(Event::Text(te)) if in_text => {
                current.push_str(te.unescape().map_err(ooxml_err)?.as_ref());
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    let para = current.trim();
                    if !para.is_empty() {
                        paragraphs.push(para.to_string());
                    }
                    current.clear();
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ooxml_err(e)),
            _ => {}
        }
        buf.clear();
    }

    let tail = current.trim();
    if !tail.is_empty() {
        paragraphs.push(tail.to_string());
    }
    Ok(paragraphs.join("\n"))
}
