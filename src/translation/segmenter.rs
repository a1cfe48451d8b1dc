/*!
 * Text segmentation for long document translation.
 *
 * Backends only accept a bounded amount of text per call, so long input is
 * split at the coarsest natural boundary that fits the token budget:
 *
 * 1. the whole text (`Full`)
 * 2. paragraphs separated by blank lines (`Paragraph`)
 * 3. sentences inside an oversized paragraph (`Sentence`)
 * 4. whitespace-delimited words inside an oversized sentence (`WordSplit`)
 *
 * Translated chunks are stitched back together with `reassemble`, which
 * restores paragraph breaks.
 */

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::sync::Arc;

/// Paragraph separator: a line break, optional blank space, another line break
static PARAGRAPH_BREAK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\n\s*\n").unwrap()
});

/// Tokens per word used by the word-count heuristic
const TOKENS_PER_WORD: f64 = 1.3;

/// Granularity a chunk was split at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkKind {
    Full,
    Paragraph,
    Sentence,
    WordSplit,
}

/// A bounded slice of the input text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Chunk text, trimmed
    pub text: String,
    /// Split granularity
    pub kind: ChunkKind,
    /// Zero-based index of the source paragraph
    pub paragraph: usize,
}

impl Chunk {
    fn new(text: impl Into<String>, kind: ChunkKind, paragraph: usize) -> Self {
        Self {
            text: text.into(),
            kind,
            paragraph,
        }
    }
}

/// Counts the tokens a backend would see for a piece of text
pub trait TokenEstimator: Send + Sync {
    fn estimate(&self, text: &str) -> usize;
}

impl<F> TokenEstimator for F
where
    F: Fn(&str) -> usize + Send + Sync,
{
    fn estimate(&self, text: &str) -> usize {
        self(text)
    }
}

/// Word-count heuristic: `round(words * 1.3)`
///
/// Over-estimates for most European languages, which errs toward more,
/// smaller chunks rather than backend overflow.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordCountEstimator;

impl TokenEstimator for WordCountEstimator {
    fn estimate(&self, text: &str) -> usize {
        let words = text.split_whitespace().count();
        (words as f64 * TOKENS_PER_WORD).round() as usize
    }
}

/// Summary of how a text was segmented
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SegmentationStats {
    pub total_chars: usize,
    pub estimated_tokens: usize,
    pub chunk_count: usize,
    pub full: usize,
    pub paragraph: usize,
    pub sentence: usize,
    pub word_split: usize,
}

/// Splits text into chunks that fit a token budget
#[derive(Clone)]
pub struct Segmenter {
    max_tokens: usize,
    pack_sentences: bool,
    estimator: Arc<dyn TokenEstimator>,
}

impl std::fmt::Debug for Segmenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Segmenter")
            .field("max_tokens", &self.max_tokens)
            .field("pack_sentences", &self.pack_sentences)
            .finish()
    }
}

impl Segmenter {
    /// Create a segmenter using the word-count heuristic
    pub fn new(max_tokens: usize) -> Self {
        Self {
            max_tokens,
            pack_sentences: false,
            estimator: Arc::new(WordCountEstimator),
        }
    }

    /// Use an exact tokenizer instead of the heuristic
    pub fn with_estimator(mut self, estimator: Arc<dyn TokenEstimator>) -> Self {
        self.estimator = estimator;
        self
    }

    /// Greedily pack consecutive sentences into one chunk while they fit
    pub fn with_sentence_packing(mut self, pack_sentences: bool) -> Self {
        self.pack_sentences = pack_sentences;
        self
    }

    /// Token budget per chunk
    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    /// Estimate the token count of a text
    pub fn estimate(&self, text: &str) -> usize {
        self.estimator.estimate(text)
    }

    /// Split text into ordered chunks
    pub fn segment(&self, text: &str) -> Vec<Chunk> {
        let text = text.trim();
        if text.is_empty() {
            return Vec::new();
        }

        if self.fits(text) {
            return vec![Chunk::new(text, ChunkKind::Full, 0)];
        }

        let mut chunks = Vec::new();
        for (index, paragraph) in split_paragraphs(text).into_iter().enumerate() {
            if self.fits(paragraph) {
                chunks.push(Chunk::new(paragraph, ChunkKind::Paragraph, index));
            } else {
                self.segment_paragraph(paragraph, index, &mut chunks);
            }
        }

        chunks
    }

    /// Segment a text and summarize the result
    pub fn stats(&self, text: &str) -> SegmentationStats {
        let chunks = self.segment(text);
        let mut stats = SegmentationStats {
            total_chars: text.chars().count(),
            estimated_tokens: self.estimate(text),
            chunk_count: chunks.len(),
            ..Default::default()
        };

        for chunk in &chunks {
            match chunk.kind {
                ChunkKind::Full => stats.full += 1,
                ChunkKind::Paragraph => stats.paragraph += 1,
                ChunkKind::Sentence => stats.sentence += 1,
                ChunkKind::WordSplit => stats.word_split += 1,
            }
        }

        stats
    }

    fn fits(&self, text: &str) -> bool {
        self.estimator.estimate(text) <= self.max_tokens
    }

    fn segment_paragraph(&self, paragraph: &str, index: usize, chunks: &mut Vec<Chunk>) {
        let mut packed = String::new();

        for sentence in split_sentences(paragraph) {
            if !self.fits(sentence) {
                if !packed.is_empty() {
                    chunks.push(Chunk::new(std::mem::take(&mut packed), ChunkKind::Sentence, index));
                }
                self.split_words(sentence, index, chunks);
                continue;
            }

            if !self.pack_sentences {
                chunks.push(Chunk::new(sentence, ChunkKind::Sentence, index));
                continue;
            }

            if packed.is_empty() {
                packed.push_str(sentence);
                continue;
            }

            let candidate = format!("{} {}", packed, sentence);
            if self.fits(&candidate) {
                packed = candidate;
            } else {
                chunks.push(Chunk::new(std::mem::replace(&mut packed, sentence.to_string()), ChunkKind::Sentence, index));
            }
        }

        if !packed.is_empty() {
            chunks.push(Chunk::new(packed, ChunkKind::Sentence, index));
        }
    }

    /// Greedy word accumulation; every step consumes at least one word
    fn split_words(&self, sentence: &str, index: usize, chunks: &mut Vec<Chunk>) {
        let mut current = String::new();

        for word in sentence.split_whitespace() {
            if current.is_empty() {
                current.push_str(word);
                continue;
            }

            let candidate = format!("{} {}", current, word);
            if self.fits(&candidate) {
                current = candidate;
            } else {
                chunks.push(Chunk::new(std::mem::replace(&mut current, word.to_string()), ChunkKind::WordSplit, index));
            }
        }

        if !current.is_empty() {
            chunks.push(Chunk::new(current, ChunkKind::WordSplit, index));
        }
    }
}

/// Split on blank lines, dropping empty paragraphs
pub fn split_paragraphs(text: &str) -> Vec<&str> {
    PARAGRAPH_BREAK
        .split(text)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

/// Split at `.`, `!` or `?` followed by whitespace and an uppercase letter
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }

        let end = i + c.len_utf8();
        let mut saw_space = false;
        while let Some(&(_, next)) = chars.peek() {
            if next.is_whitespace() {
                saw_space = true;
                chars.next();
            } else {
                break;
            }
        }

        match chars.peek() {
            Some(&(next_start, next)) if saw_space && next.is_uppercase() => {
                sentences.push(&text[start..end]);
                start = next_start;
            }
            _ => {}
        }
    }

    sentences.push(&text[start..]);
    sentences
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Stitch translated chunks back together in order.
///
/// A double line break separates chunks from different source paragraphs,
/// every other join is a single space.
pub fn reassemble(chunks: &[Chunk], translations: &[String]) -> String {
    let mut output = String::new();

    for (i, translation) in translations.iter().enumerate() {
        output.push_str(translation.trim());

        let Some(next) = chunks.get(i + 1) else {
            continue;
        };
        if i + 1 >= translations.len() {
            continue;
        }

        if chunks[i].paragraph != next.paragraph {
            output.push_str("\n\n");
        } else {
            output.push(' ');
        }
    }

    output.trim().to_string()
}
