// Conversation history
// Append-only log of question/answer turns, exportable as CSV


use std::io::Write;

use anyhow::Context;
use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// One answered question: what was asked, what came back, when, and which
/// documents were loaded at the time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub question: String,
    pub answer: String,
    pub timestamp: DateTime<Utc>,
    pub sources: Vec<String>,
}

/// The session's conversation log. Appended to by the single active request,
/// read for display and export, cleared only on explicit request.
#[derive(Debug, Clone, Default)]
pub struct ConversationLog {
    turns: Vec<ConversationTurn>,
}

impl ConversationLog {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record(&mut self, question: String, answer: String, sources: Vec<String>) {
        self.turns.push(ConversationTurn {
            question,
            answer,
            timestamp: Utc::now(),
            sources,
        });
    }

    #[inline]
    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    #[inline]
    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// Write the log as CSV with one row per turn.
    #[inline]
    pub fn export_csv<W: Write>(&self, writer: W) -> crate::Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer
            .write_record(["Question", "Answer", "Timestamp", "PDF Name"])
            .context("Failed to write history CSV header")?;

        for turn in &self.turns {
            let timestamp = turn.timestamp.format("%Y-%m-%d %H:%M:%S").to_string();
            let sources = turn.sources.iter().join(", ");
            csv_writer
                .write_record([
                    turn.question.as_str(),
                    turn.answer.as_str(),
                    timestamp.as_str(),
                    sources.as_str(),
                ])
                .context("Failed to write history CSV row")?;
        }

        csv_writer.flush().context("Failed to flush history CSV")?;
        Ok(())
    }
}
