use thiserror::Error;

pub type Result<T> = std::result::Result<T, PdfChatError>;

#[derive(Error, Debug)]
pub enum PdfChatError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to extract text from {0}: {1}")]
    Extraction(String, String),

    #[error("No extractable text found in the uploaded documents")]
    EmptyCorpus,

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("No document index has been built yet; process documents first")]
    IndexNotBuilt,

    #[error("Index snapshot is incompatible: {0}")]
    Snapshot(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod chat;
pub mod commands;
pub mod config;
pub mod embeddings;
pub mod extract;
pub mod gemini;
pub mod history;
pub mod index;
pub mod session;
