
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Separators tried in priority order before falling back to a hard cut.
const SEPARATORS: &[&str] = &["\n\n", "\n", " "];

/// Configuration for corpus chunking. Both sizes are measured in characters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Upper bound on the length of any produced chunk.
    pub max_chunk_size: usize,
    /// Number of characters adjacent chunks share across a split point.
    pub overlap_size: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            max_chunk_size: 10000,
            overlap_size: 1000,
        }
    }
}

/// A contiguous text window ready for embedding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    pub ordinal: usize,
}

/// Split a corpus into overlapping chunks no longer than the configured
/// maximum.
///
/// The corpus is first cut into core segments of at most
/// `max_chunk_size - overlap_size` characters, preferring paragraph breaks,
/// then line breaks, then spaces, then a hard character cut. Each chunk after
/// the first is prefixed with the last `overlap_size` characters of the
/// previous core, so a concept spanning a split point survives in at least
/// one chunk. A corpus that already fits in one chunk is returned unchanged;
/// a corpus with no visible text yields no chunks.
#[inline]
pub fn chunk_text(text: &str, config: &ChunkingConfig) -> Vec<Chunk> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    if char_len(text) <= config.max_chunk_size {
        return vec![Chunk {
            text: text.to_string(),
            ordinal: 0,
        }];
    }

    let core_budget = config
        .max_chunk_size
        .saturating_sub(config.overlap_size)
        .max(1);

    let fragments = split_fragments(text, SEPARATORS, core_budget);
    let cores = merge_fragments(fragments, core_budget);

    let mut chunks = Vec::with_capacity(cores.len());
    for (ordinal, core) in cores.iter().enumerate() {
        let text = if ordinal == 0 {
            core.clone()
        } else {
            let mut with_overlap = char_tail(&cores[ordinal - 1], config.overlap_size).to_string();
            with_overlap.push_str(core);
            with_overlap
        };
        chunks.push(Chunk { text, ordinal });
    }

    debug!(
        "Chunked {} characters into {} chunks (max {}, overlap {})",
        char_len(text),
        chunks.len(),
        config.max_chunk_size,
        config.overlap_size
    );

    chunks
}

/// Recursively cut `text` into pieces of at most `budget` characters,
/// trying each separator in priority order. Pieces keep their trailing
/// separator, so concatenating them reproduces the input.
fn split_fragments(text: &str, separators: &[&str], budget: usize) -> Vec<String> {
    if char_len(text) <= budget {
        return vec![text.to_string()];
    }

    let Some((separator, rest)) = separators.split_first() else {
        return hard_cut(text, budget);
    };

    let mut fragments = Vec::new();
    for piece in text.split_inclusive(separator) {
        if char_len(piece) <= budget {
            fragments.push(piece.to_string());
        } else {
            fragments.extend(split_fragments(piece, rest, budget));
        }
    }
    fragments
}

/// Greedily merge adjacent fragments back together while they still fit the
/// budget, so cores stay as large as the bound allows.
fn merge_fragments(fragments: Vec<String>, budget: usize) -> Vec<String> {
    let mut cores: Vec<String> = Vec::new();
    for fragment in fragments {
        match cores.last_mut() {
            Some(last) if char_len(last) + char_len(&fragment) <= budget => {
                last.push_str(&fragment);
            }
            _ => cores.push(fragment),
        }
    }
    cores
}

/// Last-resort split into fixed character windows.
fn hard_cut(text: &str, budget: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::with_capacity(budget);
    let mut current_len = 0;
    for ch in text.chars() {
        current.push(ch);
        current_len += 1;
        if current_len == budget {
            pieces.push(std::mem::take(&mut current));
            current_len = 0;
        }
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

/// The last `count` characters of `text` (all of it when shorter).
fn char_tail(text: &str, count: usize) -> &str {
    if count == 0 {
        return "";
    }
    let total = char_len(text);
    if total <= count {
        return text;
    }
    let start = text
        .char_indices()
        .nth(total - count)
        .map_or(0, |(idx, _)| idx);
    &text[start..]
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}
