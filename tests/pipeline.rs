//! End-to-end ingestion and question answering with in-process components.

mod common;

use std::fs;
use std::sync::Arc;

use common::{
    context_of, docx_with_paragraphs, memory_pipeline, pdf_with_pages, FailingModel, StubModel,
    VITALYZE_PARAGRAPHS,
};
use context_ai::config::Config;
use context_ai::embedding::HashEmbedder;
use context_ai::error::RagError;
use context_ai::llm::LanguageModel;
use context_ai::pipeline::RagPipeline;
use context_ai::store::sqlite::SqliteStore;
use context_ai::store::VectorStore;
use tempfile::TempDir;

#[tokio::test]
async fn upload_then_ask_returns_grounded_answer() {
    let tmp = TempDir::new().unwrap();
    let model = Arc::new(StubModel::default());
    let (pipeline, store) = memory_pipeline(tmp.path(), model.clone()).await;

    let report = pipeline
        .ingest_upload("vitalyze.docx", docx_with_paragraphs(VITALYZE_PARAGRAPHS))
        .await
        .unwrap();
    assert!(report.chunks >= 1);
    assert_eq!(store.count().await.unwrap(), report.chunks);
    assert!(tmp.path().join("uploaded_files").join("vitalyze.docx").exists());

    let answer = pipeline.ask("What is the project name?").await.unwrap();
    assert!(answer.response.contains("Vitalyze.ai"));
    assert!(!answer.source_docs.is_empty());
    assert!(answer.source_docs.len() <= 3);
    assert!(answer
        .source_docs
        .iter()
        .all(|d| d.filename == "vitalyze.docx" && d.page.is_none()));

    let prompts = model.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("What is the project name?"));
    assert!(context_of(&prompts[0]).contains("Vitalyze.ai"));
}

#[tokio::test]
async fn single_page_pdf_upload_then_ask_cites_page_zero() {
    let tmp = TempDir::new().unwrap();
    let model = Arc::new(StubModel::default());
    let (pipeline, store) = memory_pipeline(tmp.path(), model.clone()).await;

    let page = VITALYZE_PARAGRAPHS.join(" ");
    let report = pipeline
        .ingest_upload("vitalyze.pdf", pdf_with_pages(&[page.as_str()]))
        .await
        .unwrap();
    assert!(report.chunks >= 1);
    assert_eq!(store.count().await.unwrap(), report.chunks);
    assert!(tmp.path().join("uploaded_files").join("vitalyze.pdf").exists());

    let answer = pipeline.ask("What is the project name?").await.unwrap();
    assert!(!answer.source_docs.is_empty());
    assert_eq!(answer.source_docs[0].page, Some(0));
    assert_eq!(answer.source_docs[0].filename, "vitalyze.pdf");
    assert_eq!(model.prompts.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn unsupported_upload_saves_and_indexes_nothing() {
    let tmp = TempDir::new().unwrap();
    let (pipeline, store) = memory_pipeline(tmp.path(), Arc::new(StubModel::default())).await;

    let err = pipeline
        .ingest_upload("notes.txt", b"plain text".to_vec())
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::UnsupportedFormat(ref s) if s == ".txt"));
    assert_eq!(err.to_string(), "Unsupported file format: .txt");

    assert_eq!(store.count().await.unwrap(), 0);
    assert!(!tmp.path().join("uploaded_files").join("notes.txt").exists());
}

#[tokio::test]
async fn corrupt_upload_is_saved_but_not_indexed() {
    let tmp = TempDir::new().unwrap();
    let (pipeline, store) = memory_pipeline(tmp.path(), Arc::new(StubModel::default())).await;

    let err = pipeline
        .ingest_upload("broken.docx", b"not a zip archive".to_vec())
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::Extraction(_)));
    assert_eq!(store.count().await.unwrap(), 0);
    assert!(tmp.path().join("uploaded_files").join("broken.docx").exists());
}

#[tokio::test]
async fn upload_filename_is_reduced_to_final_component() {
    let tmp = TempDir::new().unwrap();
    let (pipeline, _store) = memory_pipeline(tmp.path(), Arc::new(StubModel::default())).await;

    let report = pipeline
        .ingest_upload("../../escape.docx", docx_with_paragraphs(&["Contained."]))
        .await
        .unwrap();
    assert_eq!(report.filename, "escape.docx");
    assert!(tmp.path().join("uploaded_files").join("escape.docx").exists());
    assert!(!tmp.path().join("escape.docx").exists());
}

#[tokio::test]
async fn reupload_overwrites_file_and_appends_entries() {
    let tmp = TempDir::new().unwrap();
    let (pipeline, store) = memory_pipeline(tmp.path(), Arc::new(StubModel::default())).await;

    let first = pipeline
        .ingest_upload("a.docx", docx_with_paragraphs(&["Version one."]))
        .await
        .unwrap();
    let second = pipeline
        .ingest_upload("a.docx", docx_with_paragraphs(&["Version two."]))
        .await
        .unwrap();

    assert_eq!(
        store.count().await.unwrap(),
        first.chunks + second.chunks
    );
    let saved = fs::read(tmp.path().join("uploaded_files").join("a.docx")).unwrap();
    assert_eq!(saved, docx_with_paragraphs(&["Version two."]));
}

#[tokio::test]
async fn ask_on_empty_index_uses_empty_context() {
    let tmp = TempDir::new().unwrap();
    let model = Arc::new(StubModel::default());
    let (pipeline, _store) = memory_pipeline(tmp.path(), model.clone()).await;

    let answer = pipeline.ask("What is the project name?").await.unwrap();
    assert!(answer.source_docs.is_empty());
    assert!(answer.response.contains("general knowledge"));
    assert_eq!(context_of(&model.prompts.lock().unwrap()[0]), "");
}

#[tokio::test]
async fn empty_question_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let model = Arc::new(StubModel::default());
    let (pipeline, _store) = memory_pipeline(tmp.path(), model.clone()).await;

    let err = pipeline.ask("   ").await.unwrap_err();
    assert!(matches!(err, RagError::InvalidRequest(_)));
    assert!(model.prompts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn model_failure_is_generation_error_and_pipeline_survives() {
    let tmp = TempDir::new().unwrap();
    let (pipeline, _store) = memory_pipeline(tmp.path(), Arc::new(FailingModel)).await;

    pipeline
        .ingest_upload("vitalyze.docx", docx_with_paragraphs(VITALYZE_PARAGRAPHS))
        .await
        .unwrap();

    let err = pipeline.ask("What is the project name?").await.unwrap_err();
    assert!(matches!(err, RagError::Generation(_)));

    // Still usable afterwards.
    let hits = pipeline.search("project name", None).await.unwrap();
    assert!(!hits.is_empty());
}

#[tokio::test]
async fn search_respects_configured_k() {
    let tmp = TempDir::new().unwrap();
    let (pipeline, _store) = memory_pipeline(tmp.path(), Arc::new(StubModel::default())).await;

    for i in 0..5 {
        let body = format!("Document number {} body.", i);
        pipeline
            .ingest_upload(&format!("doc{}.docx", i), docx_with_paragraphs(&[body.as_str()]))
            .await
            .unwrap();
    }

    assert_eq!(pipeline.search("document body", None).await.unwrap().len(), 3);
    assert_eq!(pipeline.search("document body", Some(10)).await.unwrap().len(), 5);
}

#[tokio::test]
async fn ask_without_model_reports_missing_credential() {
    let tmp = TempDir::new().unwrap();
    let store: Arc<dyn VectorStore> = Arc::new(context_ai::store::memory::InMemoryStore::new());
    let pipeline = RagPipeline::new(
        Config::minimal(tmp.path()),
        Arc::new(HashEmbedder::new(64)),
        store,
        None,
    )
    .await
    .unwrap();

    let err = pipeline.ask("anything").await.unwrap_err();
    assert!(matches!(err, RagError::MissingCredential(ref v) if v == "PPLX_API_KEY"));
}

#[tokio::test]
async fn sqlite_index_survives_restart() {
    let tmp = TempDir::new().unwrap();
    let config = Config::minimal(tmp.path());

    {
        let store = SqliteStore::open(&config.db.path).await.unwrap();
        let pipeline = RagPipeline::new(
            config.clone(),
            Arc::new(HashEmbedder::new(128)),
            Arc::new(store),
            Some(Arc::new(StubModel::default()) as Arc<dyn LanguageModel>),
        )
        .await
        .unwrap();
        pipeline
            .ingest_upload("vitalyze.docx", docx_with_paragraphs(VITALYZE_PARAGRAPHS))
            .await
            .unwrap();
    }

    let store = SqliteStore::open(&config.db.path).await.unwrap();
    let pipeline = RagPipeline::new(
        config.clone(),
        Arc::new(HashEmbedder::new(128)),
        Arc::new(store),
        Some(Arc::new(StubModel::default()) as Arc<dyn LanguageModel>),
    )
    .await
    .unwrap();
    let answer = pipeline.ask("What is the project name?").await.unwrap();
    assert!(answer.response.contains("Vitalyze.ai"));

    // A different embedding model cannot open the same index.
    let store = SqliteStore::open(&config.db.path).await.unwrap();
    let res = RagPipeline::new(
        config,
        Arc::new(HashEmbedder::new(64)),
        Arc::new(store),
        None,
    )
    .await;
    assert!(res.is_err());
}

#[tokio::test]
async fn ingest_path_indexes_without_copying() {
    let tmp = TempDir::new().unwrap();
    let (pipeline, store) = memory_pipeline(tmp.path(), Arc::new(StubModel::default())).await;

    let src = tmp.path().join("local.docx");
    fs::write(&src, docx_with_paragraphs(VITALYZE_PARAGRAPHS)).unwrap();
    let report = pipeline.ingest_path(&src).await.unwrap();

    assert_eq!(store.count().await.unwrap(), report.chunks);
    assert!(!tmp.path().join("uploaded_files").join("local.docx").exists());

    let hits = pipeline.search("project name", Some(1)).await.unwrap();
    assert_eq!(hits[0].metadata.source, src.display().to_string());
}
