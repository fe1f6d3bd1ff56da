// Chat session
// Owns the pipeline state for one interactive session: the resident index,
// the document-set version, and the conversation log

#[cfg(test)]
mod tests;

use std::io::Write;
use std::sync::Arc;

use itertools::Itertools;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::chat::{Answer, ChatModel};
use crate::config::Config;
use crate::embeddings::{TextEmbedder, chunk_text};
use crate::extract::{PdfSource, extract_corpus};
use crate::history::{ConversationLog, ConversationTurn};
use crate::index::{DEFAULT_SNAPSHOT_NAME, VectorStore};
use crate::{PdfChatError, Result};

/// What a `process_documents` call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSummary {
    pub documents: usize,
    pub chunks: usize,
    /// False when the document set was unchanged and the resident index was
    /// reused instead of rebuilt.
    pub rebuilt: bool,
}

/// One user session over the pipeline.
///
/// The host constructs a session, calls `process_documents` at least once,
/// then asks questions. All mutable state lives here and is threaded through
/// explicitly; there are no globals. Questions are handled one at a time; a
/// running embed/index/answer cycle blocks the session until it completes.
pub struct ChatSession {
    config: Config,
    embedder: Arc<dyn TextEmbedder>,
    chat_model: Arc<dyn ChatModel>,
    store: Option<VectorStore>,
    document_set_version: Option<String>,
    current_sources: Vec<String>,
    log: ConversationLog,
}

impl ChatSession {
    #[inline]
    pub fn new(
        config: Config,
        embedder: Arc<dyn TextEmbedder>,
        chat_model: Arc<dyn ChatModel>,
    ) -> Self {
        Self {
            config,
            embedder,
            chat_model,
            store: None,
            document_set_version: None,
            current_sources: Vec::new(),
            log: ConversationLog::new(),
        }
    }

    /// Extract, chunk, embed, and index the given documents, persisting the
    /// snapshot.
    ///
    /// When the document set is byte-identical to what is already indexed,
    /// the resident index is reused and nothing is rebuilt. On failure the
    /// prior index (if any) remains the only queryable state.
    #[inline]
    pub async fn process_documents(&mut self, sources: &[PdfSource]) -> Result<ProcessSummary> {
        let version = document_set_digest(sources);

        if self.store.is_some() && self.document_set_version.as_deref() == Some(version.as_str()) {
            debug!("Document set unchanged, reusing resident index");
            let chunks = match &self.store {
                Some(store) => store.count().await?,
                None => 0,
            };
            return Ok(ProcessSummary {
                documents: sources.len(),
                chunks,
                rebuilt: false,
            });
        }

        let corpus = extract_corpus(sources)?;
        let names = sources.iter().map(|s| s.name.clone()).collect::<Vec<_>>();
        self.process_corpus(&corpus, version, names).await
    }

    /// Answer a question from the indexed documents and record the turn.
    ///
    /// Requires a built index: either one built in this session, or the
    /// snapshot a previous session persisted.
    #[inline]
    pub async fn answer_question(&mut self, question: &str) -> Result<Answer> {
        self.ensure_store().await?;
        let Some(store) = &self.store else {
            return Err(PdfChatError::IndexNotBuilt);
        };

        let answer = crate::chat::answer(
            question,
            store,
            self.embedder.as_ref(),
            self.chat_model.as_ref(),
            self.config.provider.top_k,
        )
        .await?;

        self.log.record(
            question.to_string(),
            answer.text.clone(),
            self.current_sources.clone(),
        );

        Ok(answer)
    }

    /// Digest of the currently indexed document set, when one exists. Hosts
    /// can compare this across calls to detect staleness.
    #[inline]
    pub fn document_set_version(&self) -> Option<&str> {
        self.document_set_version.as_deref()
    }

    #[inline]
    pub fn history(&self) -> &[ConversationTurn] {
        self.log.turns()
    }

    #[inline]
    pub fn clear_history(&mut self) {
        self.log.clear();
    }

    #[inline]
    pub fn export_history<W: Write>(&self, writer: W) -> Result<()> {
        self.log.export_csv(writer)
    }

    /// Chunk, embed, and index an already-extracted corpus.
    async fn process_corpus(
        &mut self,
        corpus: &str,
        version: String,
        source_names: Vec<String>,
    ) -> Result<ProcessSummary> {
        let chunks = chunk_text(corpus, &self.config.chunking);
        if chunks.is_empty() {
            return Err(PdfChatError::EmptyCorpus);
        }

        let sources_label = source_names.iter().join(", ");
        let store = VectorStore::build(
            &chunks,
            self.embedder.as_ref(),
            &self.config.vectors_path(),
            DEFAULT_SNAPSHOT_NAME,
            &sources_label,
        )
        .await?;

        info!(
            "Indexed {} chunks from {} documents",
            chunks.len(),
            source_names.len()
        );

        let summary = ProcessSummary {
            documents: source_names.len(),
            chunks: chunks.len(),
            rebuilt: true,
        };

        self.store = Some(store);
        self.document_set_version = Some(version);
        self.current_sources = source_names;

        Ok(summary)
    }

    /// Make sure an index is available, loading the persisted snapshot when
    /// this session has not built one yet.
    async fn ensure_store(&mut self) -> Result<()> {
        if self.store.is_none() {
            let store = VectorStore::load(
                &self.config.vectors_path(),
                DEFAULT_SNAPSHOT_NAME,
                self.embedder.as_ref(),
            )
            .await?;
            debug!("Loaded persisted index snapshot");
            self.store = Some(store);
        }
        Ok(())
    }
}

/// SHA-256 digest over the names and bytes of the document set.
fn document_set_digest(sources: &[PdfSource]) -> String {
    let mut hasher = Sha256::new();
    for source in sources {
        hasher.update(source.name.as_bytes());
        hasher.update([0u8]);
        hasher.update(&source.bytes);
    }
    format!("{:x}", hasher.finalize())
}
