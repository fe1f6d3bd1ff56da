use super::*;

#[test]
fn empty_input_yields_empty_corpus() {
    let corpus = extract_corpus(&[]).expect("empty input should succeed");
    assert_eq!(corpus, "");
}

#[test]
fn invalid_pdf_is_an_extraction_error() {
    let source = PdfSource {
        name: "notes.pdf".to_string(),
        bytes: b"this is not a pdf".to_vec(),
    };

    let err = extract_document(&source).expect_err("garbage bytes should not parse");
    match err {
        PdfChatError::Extraction(name, _) => assert_eq!(name, "notes.pdf"),
        other => panic!("expected extraction error, got {other:?}"),
    }
}

#[test]
fn corpus_extraction_propagates_document_failure() {
    let sources = vec![PdfSource {
        name: "broken.pdf".to_string(),
        bytes: vec![0u8; 16],
    }];

    assert!(extract_corpus(&sources).is_err());
}

#[test]
fn from_path_missing_file() {
    let result = PdfSource::from_path("/nonexistent/definitely-missing.pdf");
    assert!(result.is_err());
}
