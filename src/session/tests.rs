use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;

use tempfile::TempDir;

use super::*;
use crate::chat::REFUSAL_ANSWER;
use crate::config::ProviderConfig;
use crate::embeddings::ChunkingConfig;

const DIM: usize = 16;

struct BucketEmbedder;

impl TextEmbedder for BucketEmbedder {
    fn model_id(&self) -> &str {
        "bucket-embedder"
    }

    fn dimension(&self) -> usize {
        DIM
    }

    fn embed_batch(&self, texts: &[String]) -> crate::Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed_query(t)).collect()
    }

    fn embed_query(&self, text: &str) -> crate::Result<Vec<f32>> {
        let mut vector = vec![0.0f32; DIM];
        for word in text.to_lowercase().split_whitespace() {
            let word = word.trim_matches(|c: char| !c.is_alphanumeric());
            if word.is_empty() {
                continue;
            }
            let mut hasher = DefaultHasher::new();
            word.hash(&mut hasher);
            vector[(hasher.finish() % DIM as u64) as usize] += 1.0;
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        Ok(vector)
    }
}

/// Echoes the whole prompt back, so the answer contains whatever context was
/// retrieved.
struct EchoModel;

impl ChatModel for EchoModel {
    fn generate(&self, prompt: &str) -> crate::Result<String> {
        Ok(prompt.to_string())
    }
}

/// Always honors the abstain instruction.
struct AbstainModel;

impl ChatModel for AbstainModel {
    fn generate(&self, _prompt: &str) -> crate::Result<String> {
        Ok(REFUSAL_ANSWER.to_string())
    }
}

fn test_config(base_dir: &Path) -> Config {
    Config {
        provider: ProviderConfig::default(),
        chunking: ChunkingConfig::default(),
        base_dir: base_dir.to_path_buf(),
    }
}

fn test_session(base_dir: &Path, model: Arc<dyn ChatModel>) -> ChatSession {
    ChatSession::new(test_config(base_dir), Arc::new(BucketEmbedder), model)
}

/// Build a one-page PDF whose content stream draws `text`, with a correct
/// cross-reference table.
fn minimal_pdf(text: &str) -> Vec<u8> {
    let stream = if text.is_empty() {
        "BT ET".to_string()
    } else {
        format!("BT /F1 12 Tf 72 720 Td ({text}) Tj ET")
    };

    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
         /Resources << /Font << /F1 5 0 R >> >> /Contents 4 0 R >>"
            .to_string(),
        format!(
            "<< /Length {} >>\nstream\n{}\nendstream",
            stream.len(),
            stream
        ),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
    ];

    let mut pdf = Vec::new();
    pdf.extend_from_slice(b"%PDF-1.4\n");

    let mut offsets = Vec::new();
    for (index, object) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", index + 1, object).as_bytes());
    }

    let xref_offset = pdf.len();
    let mut xref = String::from("xref\n0 6\n0000000000 65535 f \n");
    for offset in &offsets {
        xref.push_str(&format!("{offset:010} 00000 n \n"));
    }
    pdf.extend_from_slice(xref.as_bytes());
    pdf.extend_from_slice(
        format!("trailer\n<< /Size 6 /Root 1 0 R >>\nstartxref\n{xref_offset}\n%%EOF\n").as_bytes(),
    );
    pdf
}

fn pdf_source(name: &str, text: &str) -> PdfSource {
    PdfSource {
        name: name.to_string(),
        bytes: minimal_pdf(text),
    }
}

#[tokio::test]
async fn question_before_any_processing_fails() {
    let temp_dir = TempDir::new().expect("temp dir");
    let mut session = test_session(temp_dir.path(), Arc::new(EchoModel));

    let err = session
        .answer_question("Who founded Apple?")
        .await
        .expect_err("no index exists yet");
    assert!(matches!(err, PdfChatError::IndexNotBuilt));
}

#[tokio::test]
async fn processing_no_documents_fails_with_empty_corpus() {
    let temp_dir = TempDir::new().expect("temp dir");
    let mut session = test_session(temp_dir.path(), Arc::new(EchoModel));

    let err = session
        .process_documents(&[])
        .await
        .expect_err("nothing to index");
    assert!(matches!(err, PdfChatError::EmptyCorpus));
}

#[tokio::test]
async fn unreadable_pdf_propagates_extraction_error() {
    let temp_dir = TempDir::new().expect("temp dir");
    let mut session = test_session(temp_dir.path(), Arc::new(EchoModel));

    let garbage = PdfSource {
        name: "garbage.pdf".to_string(),
        bytes: b"definitely not a pdf".to_vec(),
    };

    let err = session
        .process_documents(&[garbage])
        .await
        .expect_err("garbage must fail");
    assert!(matches!(err, PdfChatError::Extraction(_, _)));
}

#[tokio::test]
async fn text_free_documents_leave_the_index_unbuilt() {
    let temp_dir = TempDir::new().expect("temp dir");
    let mut session = test_session(temp_dir.path(), Arc::new(EchoModel));

    let err = session
        .process_documents(&[pdf_source("scanned.pdf", "")])
        .await
        .expect_err("no extractable text");
    assert!(matches!(err, PdfChatError::EmptyCorpus));

    let err = session
        .answer_question("anything at all?")
        .await
        .expect_err("still no index");
    assert!(matches!(err, PdfChatError::IndexNotBuilt));
}

#[tokio::test]
async fn question_is_answered_from_the_matching_chunk() {
    let temp_dir = TempDir::new().expect("temp dir");
    let mut session = test_session(temp_dir.path(), Arc::new(EchoModel));

    let summary = session
        .process_documents(&[pdf_source(
            "apple.pdf",
            "Apple was founded in 1976 by Steve Jobs.",
        )])
        .await
        .expect("processing should succeed");
    assert!(summary.rebuilt);
    assert_eq!(summary.documents, 1);
    assert_eq!(summary.chunks, 1);

    let answer = session
        .answer_question("Who founded Apple?")
        .await
        .expect("answer should succeed");
    assert!(answer.text.contains("Steve Jobs"));

    let history = session.history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].question, "Who founded Apple?");
    assert_eq!(history[0].sources, vec!["apple.pdf".to_string()]);
}

#[tokio::test]
async fn unanswerable_question_returns_the_exact_refusal() {
    let temp_dir = TempDir::new().expect("temp dir");
    let mut session = test_session(temp_dir.path(), Arc::new(AbstainModel));

    session
        .process_documents(&[pdf_source(
            "apple.pdf",
            "Apple was founded in 1976 by Steve Jobs.",
        )])
        .await
        .expect("processing should succeed");

    let answer = session
        .answer_question("What is the boiling point of tungsten?")
        .await
        .expect("answer should succeed");
    assert_eq!(answer.text, REFUSAL_ANSWER);
}

#[tokio::test]
async fn unchanged_document_set_reuses_the_resident_index() {
    let temp_dir = TempDir::new().expect("temp dir");
    let mut session = test_session(temp_dir.path(), Arc::new(EchoModel));
    let sources = vec![pdf_source("apple.pdf", "Apple was founded in 1976.")];

    let first = session
        .process_documents(&sources)
        .await
        .expect("first processing");
    assert!(first.rebuilt);
    let version = session
        .document_set_version()
        .expect("version is set")
        .to_string();

    let second = session
        .process_documents(&sources)
        .await
        .expect("second processing");
    assert!(!second.rebuilt);
    assert_eq!(session.document_set_version(), Some(version.as_str()));
}

#[tokio::test]
async fn changed_document_set_triggers_a_rebuild() {
    let temp_dir = TempDir::new().expect("temp dir");
    let mut session = test_session(temp_dir.path(), Arc::new(EchoModel));

    session
        .process_documents(&[pdf_source("a.pdf", "First edition text.")])
        .await
        .expect("first processing");
    let before = session.document_set_version().map(str::to_string);

    let summary = session
        .process_documents(&[pdf_source("a.pdf", "Second edition text.")])
        .await
        .expect("second processing");
    assert!(summary.rebuilt);
    assert_ne!(session.document_set_version().map(str::to_string), before);
}

#[tokio::test]
async fn failed_reprocessing_keeps_the_prior_index_queryable() {
    let temp_dir = TempDir::new().expect("temp dir");
    let mut session = test_session(temp_dir.path(), Arc::new(EchoModel));

    session
        .process_documents(&[pdf_source(
            "apple.pdf",
            "Apple was founded in 1976 by Steve Jobs.",
        )])
        .await
        .expect("initial processing");

    let garbage = PdfSource {
        name: "broken.pdf".to_string(),
        bytes: vec![0u8; 32],
    };
    assert!(session.process_documents(&[garbage]).await.is_err());

    let answer = session
        .answer_question("Who founded Apple?")
        .await
        .expect("prior index still answers");
    assert!(answer.text.contains("Steve Jobs"));
}

#[tokio::test]
async fn a_new_session_loads_the_persisted_snapshot() {
    let temp_dir = TempDir::new().expect("temp dir");

    {
        let mut session = test_session(temp_dir.path(), Arc::new(EchoModel));
        session
            .process_documents(&[pdf_source(
                "apple.pdf",
                "Apple was founded in 1976 by Steve Jobs.",
            )])
            .await
            .expect("processing should succeed");
    }

    let mut session = test_session(temp_dir.path(), Arc::new(EchoModel));
    let answer = session
        .answer_question("Who founded Apple?")
        .await
        .expect("snapshot should be loadable");
    assert!(answer.text.contains("Steve Jobs"));
}

#[tokio::test]
async fn history_can_be_cleared_and_exported() {
    let temp_dir = TempDir::new().expect("temp dir");
    let mut session = test_session(temp_dir.path(), Arc::new(AbstainModel));

    session
        .process_documents(&[pdf_source("doc.pdf", "Some document content here.")])
        .await
        .expect("processing should succeed");
    session
        .answer_question("An unanswerable question?")
        .await
        .expect("answer should succeed");

    let mut buffer = Vec::new();
    session
        .export_history(&mut buffer)
        .expect("export should succeed");
    let csv = String::from_utf8(buffer).expect("valid utf-8");
    assert!(csv.starts_with("Question,Answer,Timestamp,PDF Name"));
    assert!(csv.contains("An unanswerable question?"));
    assert!(csv.contains("doc.pdf"));

    session.clear_history();
    assert!(session.history().is_empty());
}
