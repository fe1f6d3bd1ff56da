// PDF text extraction
// Turns uploaded PDF byte streams into one plain-text corpus

#[cfg(test)]
mod tests;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::PdfChatError;

/// An uploaded PDF: display name plus raw bytes.
#[derive(Debug, Clone)]
pub struct PdfSource {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl PdfSource {
    /// Read a PDF from disk, using the file name as the display name.
    #[inline]
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)
            .with_context(|| format!("Failed to read PDF file: {}", path.display()))?;
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        Ok(Self { name, bytes })
    }
}

/// Extracted text of a single document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub source: String,
    pub text: String,
}

/// Extract the plain text of one PDF.
///
/// Page texts are concatenated in document order. Pages without extractable
/// text (scanned images) contribute nothing and are not an error; a byte
/// stream that is not a parseable PDF is.
#[inline]
pub fn extract_document(source: &PdfSource) -> crate::Result<Document> {
    debug!("Extracting text from {} ({} bytes)", source.name, source.bytes.len());

    let text = pdf_extract::extract_text_from_mem(&source.bytes)
        .map_err(|e| PdfChatError::Extraction(source.name.clone(), e.to_string()))?;

    if text.trim().is_empty() {
        warn!("No extractable text in {}", source.name);
    }

    Ok(Document {
        source: source.name.clone(),
        text,
    })
}

/// Extract and concatenate the text of every document into one corpus string.
///
/// Input order is preserved; no separator is inserted between documents.
/// An empty input sequence yields an empty string.
#[inline]
pub fn extract_corpus(sources: &[PdfSource]) -> crate::Result<String> {
    let mut corpus = String::new();
    for source in sources {
        let document = extract_document(source)?;
        corpus.push_str(&document.text);
    }

    debug!(
        "Extracted {} characters of text from {} documents",
        corpus.chars().count(),
        sources.len()
    );
    Ok(corpus)
}
