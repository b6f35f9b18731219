//! Token-aware document chunking.
//!
//! Text is split recursively on a priority-ordered list of boundary
//! markers and packed greedily into chunks measured in encoder tokens.
//! The trailing tokens of each chunk are re-included at the head of the
//! next one so context survives chunk boundaries.

use std::sync::Arc;

use crate::config::ChunkingSettings;
use crate::traits::Tokenizer;
use crate::types::{Passage, Segment};

/// Boundary markers, highest priority first: paragraph break, line
/// break, then sentence/clause punctuation for Latin and CJK scripts.
const BOUNDARIES: [&str; 10] = ["\n\n", "\n", ". ", "! ", "? ", "; ", "。", "！", "？", "；"];

pub struct Chunker {
    tokenizer: Arc<dyn Tokenizer>,
    settings: ChunkingSettings,
}

impl Chunker {
    pub fn new(tokenizer: Arc<dyn Tokenizer>, settings: ChunkingSettings) -> Self {
        Self { tokenizer, settings }
    }

    /// Split loader segments into overlapping passages.
    ///
    /// Deterministic for identical input. Empty input yields an empty
    /// sequence. A single unit that no boundary can bring under the
    /// maximum is emitted whole rather than truncated or dropped.
    pub fn split(&self, segments: &[Segment]) -> Vec<Passage> {
        let mut passages = Vec::new();
        for segment in segments {
            for text in self.chunk_text(&segment.text) {
                let sequence_index = passages.len();
                passages.push(Passage::new(
                    format!("{}:{}", segment.source, sequence_index),
                    text,
                    segment.source.clone(),
                    sequence_index,
                ));
            }
        }
        passages
    }

    fn chunk_text(&self, text: &str) -> Vec<String> {
        let max = self.settings.max_tokens;
        let mut units = Vec::new();
        self.collect_units(text, 0, &mut units);

        let mut chunks = Vec::new();
        let mut current = String::new();
        let mut current_tokens = 0usize;
        // Tokens in `current` that were carried over from the previous
        // chunk; a chunk is only emitted once it holds more than these.
        let mut carry_tokens = 0usize;

        for unit in units {
            let unit_tokens = self.tokenizer.count(&unit);
            if current_tokens + unit_tokens > max && current_tokens > carry_tokens {
                let tail = self.trailing_text(&current);
                carry_tokens = self.tokenizer.count(&tail);
                current_tokens = carry_tokens;
                chunks.push(std::mem::replace(&mut current, tail));
            }
            current.push_str(&unit);
            current_tokens += unit_tokens;
        }
        if current_tokens > carry_tokens && !current.trim().is_empty() {
            chunks.push(current);
        }
        chunks
    }

    fn collect_units(&self, text: &str, level: usize, out: &mut Vec<String>) {
        if text.trim().is_empty() {
            return;
        }
        if level >= BOUNDARIES.len() || self.tokenizer.count(text) <= self.settings.max_tokens {
            out.push(text.to_string());
            return;
        }
        let sep = BOUNDARIES[level];
        let pieces: Vec<&str> = text.split_inclusive(sep).collect();
        if pieces.len() <= 1 {
            self.collect_units(text, level + 1, out);
            return;
        }
        for piece in pieces {
            if self.tokenizer.count(piece) <= self.settings.max_tokens {
                if !piece.trim().is_empty() {
                    out.push(piece.to_string());
                }
            } else {
                self.collect_units(piece, level + 1, out);
            }
        }
    }

    /// The substring covering the trailing `overlap_tokens` tokens of
    /// `text`, used to seed the next chunk.
    fn trailing_text(&self, text: &str) -> String {
        let overlap = self.settings.overlap_tokens;
        if overlap == 0 {
            return String::new();
        }
        let offsets = self.tokenizer.offsets(text);
        if offsets.len() <= overlap {
            return text.to_string();
        }
        let mut start = offsets[offsets.len() - overlap].0.min(text.len());
        while start < text.len() && !text.is_char_boundary(start) {
            start += 1;
        }
        text[start..].to_string()
    }
}
