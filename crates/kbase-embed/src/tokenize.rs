use anyhow::{anyhow, Result};
use std::path::Path;
use tokenizers::Tokenizer as InnerTokenizer;

use kbase_core::traits::Tokenizer;

/// Tokenizer loaded from a HuggingFace `tokenizer.json`, shared with the
/// vector encoder so chunk budgets line up with its context window.
pub struct HfTokenizer {
    inner: InnerTokenizer,
}

impl HfTokenizer {
    pub fn from_file(path: &Path) -> Result<Self> {
        let inner = InnerTokenizer::from_file(path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", path.display(), e))?;
        Ok(Self { inner })
    }
}

impl Tokenizer for HfTokenizer {
    fn offsets(&self, text: &str) -> Vec<(usize, usize)> {
        // Special tokens are excluded: they carry no text span and would
        // inflate the chunk budget.
        match self.inner.encode(text, false) {
            Ok(encoding) => encoding.get_offsets().to_vec(),
            Err(_) => Vec::new(),
        }
    }
}

/// Whitespace token boundaries. Used when no encoder tokenizer is
/// available (offline mode, tests); intentionally conservative since
/// subword tokenizers only split words further.
pub struct WhitespaceTokenizer;

impl Tokenizer for WhitespaceTokenizer {
    fn offsets(&self, text: &str) -> Vec<(usize, usize)> {
        let mut offsets = Vec::new();
        let mut start = None;
        for (i, c) in text.char_indices() {
            if c.is_whitespace() {
                if let Some(s) = start.take() {
                    offsets.push((s, i));
                }
            } else if start.is_none() {
                start = Some(i);
            }
        }
        if let Some(s) = start {
            offsets.push((s, text.len()));
        }
        offsets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_offsets_cover_words() {
        let t = WhitespaceTokenizer;
        let text = "alpha  bravo\ncharlie";
        let offsets = t.offsets(text);
        let words: Vec<&str> = offsets.iter().map(|&(s, e)| &text[s..e]).collect();
        assert_eq!(words, vec!["alpha", "bravo", "charlie"]);
        assert_eq!(t.count(text), 3);
    }

    #[test]
    fn whitespace_count_empty() {
        assert_eq!(WhitespaceTokenizer.count(""), 0);
        assert_eq!(WhitespaceTokenizer.count("   "), 0);
    }
}
