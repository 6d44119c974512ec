//! Document loading from files on disk.

mod common;

use std::fs;

use common::{docx_with_paragraphs, pdf_with_pages, VITALYZE_PARAGRAPHS};
use context_ai::error::RagError;
use context_ai::loader::{load, load_path};
use context_ai::models::DocumentFormat;
use tempfile::TempDir;

#[test]
fn pdf_yields_one_unit_per_page() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("report.pdf");
    fs::write(
        &path,
        pdf_with_pages(&["First page text", "Second page text", "Third page text"]),
    )
    .unwrap();

    let units = load_path(&path).unwrap();
    assert_eq!(units.len(), 3);
    for (i, unit) in units.iter().enumerate() {
        assert_eq!(unit.metadata.page, Some(i as u32));
        assert_eq!(unit.metadata.filename, "report.pdf");
        assert_eq!(unit.metadata.source, path.display().to_string());
    }
}

#[test]
fn docx_yields_single_unit_with_paragraph_lines() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("Vitalyze.DOCX");
    fs::write(&path, docx_with_paragraphs(VITALYZE_PARAGRAPHS)).unwrap();

    let units = load_path(&path).unwrap();
    assert_eq!(units.len(), 1);
    assert_eq!(units[0].metadata.page, None);
    assert_eq!(units[0].metadata.filename, "Vitalyze.DOCX");
    assert_eq!(units[0].text, VITALYZE_PARAGRAPHS.join("\n"));
}

#[test]
fn loading_does_not_modify_the_file() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("notes.docx");
    let bytes = docx_with_paragraphs(&["Unchanged."]);
    fs::write(&path, &bytes).unwrap();

    load(&path, DocumentFormat::Docx).unwrap();
    assert_eq!(fs::read(&path).unwrap(), bytes);
}

#[test]
fn corrupt_files_are_extraction_errors() {
    let tmp = TempDir::new().unwrap();
    let pdf = tmp.path().join("broken.pdf");
    fs::write(&pdf, b"%PDF-1.4\nthis is not really a pdf").unwrap();
    assert!(matches!(load_path(&pdf), Err(RagError::Extraction(_))));

    let docx = tmp.path().join("broken.docx");
    fs::write(&docx, b"PK\x03\x04 truncated").unwrap();
    assert!(matches!(load_path(&docx), Err(RagError::Extraction(_))));
}

#[test]
fn docx_without_document_xml_is_rejected() {
    use std::io::Write;

    let mut buf = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
        zip.start_file("word/styles.xml", zip::write::SimpleFileOptions::default())
            .unwrap();
        zip.write_all(b"<styles/>").unwrap();
        zip.finish().unwrap();
    }
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("empty.docx");
    fs::write(&path, buf).unwrap();

    let err = load_path(&path).unwrap_err();
    assert!(err.to_string().contains("word/document.xml"));
}
