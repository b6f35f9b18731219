use std::sync::Arc;

use kbase_core::chunk::Chunker;
use kbase_core::config::ChunkingSettings;
use kbase_core::traits::Tokenizer;
use kbase_core::types::Segment;

/// Whitespace token boundaries; stands in for the encoder tokenizer.
struct WordTokenizer;

impl Tokenizer for WordTokenizer {
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

fn chunker(max_tokens: usize, overlap_tokens: usize) -> Chunker {
    Chunker::new(Arc::new(WordTokenizer), ChunkingSettings { max_tokens, overlap_tokens })
}

fn segment(text: &str) -> Segment {
    Segment { text: text.to_string(), source: "doc.txt".to_string(), page: 1 }
}

fn sentences(count: usize, words_per_sentence: usize) -> String {
    (0..count)
        .map(|s| {
            let words: Vec<String> = (0..words_per_sentence).map(|w| format!("w{s}x{w}")).collect();
            words.join(" ")
        })
        .collect::<Vec<_>>()
        .join(". ")
}

fn tokens(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

#[test]
fn chunking_is_deterministic() {
    let text = sentences(40, 8);
    let segs = [segment(&text)];
    let c = chunker(50, 10);
    let a = c.split(&segs);
    let b = c.split(&segs);
    assert_eq!(a.len(), b.len());
    for (x, y) in a.iter().zip(&b) {
        assert_eq!(x.id, y.id);
        assert_eq!(x.text, y.text);
        assert_eq!(x.sequence_index, y.sequence_index);
    }
}

#[test]
fn adjacent_chunks_share_overlap_tokens() {
    let overlap = 5;
    let text = sentences(60, 10);
    let passages = chunker(40, overlap).split(&[segment(&text)]);
    assert!(passages.len() > 2, "expected several chunks, got {}", passages.len());

    for pair in passages.windows(2) {
        let prev = tokens(&pair[0].text);
        let next = tokens(&pair[1].text);
        let tail = &prev[prev.len() - overlap..];
        let head = &next[..overlap];
        assert_eq!(tail, head, "overlap mismatch between chunks {} and {}", pair[0].sequence_index, pair[1].sequence_index);
    }
}

#[test]
fn oversized_unit_is_emitted_whole() {
    let atom: String = (0..30).map(|i| format!("atom{i}")).collect::<Vec<_>>().join(" ");
    let text = format!("short one. {atom}. short two.");
    let passages = chunker(10, 2).split(&[segment(&text)]);

    let holding: Vec<_> = passages.iter().filter(|p| p.text.contains(&atom)).collect();
    assert_eq!(holding.len(), 1, "the oversized unit must land whole in exactly one chunk");
    assert!(tokens(&holding[0].text).len() > 10);
}

#[test]
fn empty_input_yields_no_passages() {
    let c = chunker(480, 80);
    assert!(c.split(&[]).is_empty());
    assert!(c.split(&[segment("")]).is_empty());
    assert!(c.split(&[segment("   \n\n  ")]).is_empty());
}

#[test]
fn passage_count_matches_size_formula() {
    // Three pages of 600 tokens each, default 480/80 chunking. Expected
    // count per the sizing formula: ceil((1800 - 80) / (480 - 80)) = 5,
    // accepted within one.
    let page = sentences(60, 10);
    let segs = [segment(&page), segment(&page), segment(&page)];
    let passages = chunker(480, 80).split(&segs);

    let expected = (1800usize - 80).div_ceil(480 - 80);
    let got = passages.len();
    assert!(
        got >= expected - 1 && got <= expected + 1,
        "expected {expected}±1 passages, got {got}"
    );
    for p in &passages {
        assert!(tokens(&p.text).len() <= 480, "passage {} exceeds the token budget", p.id);
    }
}

#[test]
fn sequence_indices_are_global_per_document() {
    let segs = [segment(&sentences(5, 4)), segment(&sentences(5, 4))];
    let passages = chunker(480, 80).split(&segs);
    for (i, p) in passages.iter().enumerate() {
        assert_eq!(p.sequence_index, i);
        assert_eq!(p.id, format!("doc.txt:{i}"));
    }
}
