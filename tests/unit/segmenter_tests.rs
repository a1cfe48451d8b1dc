/*!
 * Tests for text segmentation
 */

use std::sync::Arc;

use traductal::translation::segmenter::{reassemble, split_paragraphs, split_sentences};
use traductal::translation::{ChunkKind, Segmenter};

/// One token per character, to make budgets easy to reason about
fn char_budget(max_tokens: usize) -> Segmenter {
    Segmenter::new(max_tokens).with_estimator(Arc::new(|text: &str| text.chars().count()))
}

#[test]
fn test_segment_withShortText_shouldReturnSingleFullChunk() {
    let segmenter = Segmenter::new(400);
    let chunks = segmenter.segment("  Guten Morgen, wie geht es dir?  ");

    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].kind, ChunkKind::Full);
    assert_eq!(chunks[0].text, "Guten Morgen, wie geht es dir?");
}

#[test]
fn test_segment_withBlankInput_shouldReturnNoChunks() {
    assert!(Segmenter::new(400).segment("").is_empty());
    assert!(Segmenter::new(400).segment(" \n\n \t ").is_empty());
}

#[test]
fn test_segment_withLongText_shouldSplitOnParagraphs() {
    let segmenter = char_budget(30);
    let text = "The first paragraph is here.\n\nA second one follows.\n \nAnd a third.";
    let chunks = segmenter.segment(text);

    let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, vec!["The first paragraph is here.", "A second one follows.", "And a third."]);
    assert!(chunks.iter().all(|c| c.kind == ChunkKind::Paragraph));
    assert_eq!(chunks.iter().map(|c| c.paragraph).collect::<Vec<_>>(), vec![0, 1, 2]);
}

#[test]
fn test_segment_withOversizedParagraph_shouldSplitOnSentences() {
    let segmenter = char_budget(25);
    let text = "Short intro.\n\nThe cat sat down. Then it slept! Did it dream?";
    let chunks = segmenter.segment(text);

    assert_eq!(chunks[0].kind, ChunkKind::Paragraph);
    let sentences: Vec<&str> = chunks[1..].iter().map(|c| c.text.as_str()).collect();
    assert_eq!(sentences, vec!["The cat sat down.", "Then it slept!", "Did it dream?"]);
    assert!(chunks[1..].iter().all(|c| c.kind == ChunkKind::Sentence && c.paragraph == 1));
}

#[test]
fn test_segment_withSentencePacking_shouldJoinSentencesThatFit() {
    let segmenter = char_budget(35).with_sentence_packing(true);
    let text = "The cat sat down. Then it slept! Did it dream? Nobody knows.";
    let chunks = segmenter.segment(text);

    let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, vec!["The cat sat down. Then it slept!", "Did it dream? Nobody knows."]);
}

#[test]
fn test_segment_withOversizedSentence_shouldSplitOnWords() {
    let segmenter = char_budget(12);
    let chunks = segmenter.segment("alpha beta gamma delta epsilon");

    let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, vec!["alpha beta", "gamma delta", "epsilon"]);
    assert!(chunks.iter().all(|c| c.kind == ChunkKind::WordSplit));
}

#[test]
fn test_segment_everyChunk_shouldFitBudgetUnlessSingleWord() {
    let segmenter = Segmenter::new(8);
    let text = "Lorem ipsum dolor sit amet, consectetur adipiscing elit. Sed do eiusmod tempor \
                incididunt ut labore et dolore magna aliqua.\n\nUt enim ad minim veniam, quis \
                nostrud exercitation ullamco laboris nisi ut aliquip ex ea commodo consequat.";

    for chunk in segmenter.segment(text) {
        let single_word = chunk.text.split_whitespace().count() == 1;
        assert!(segmenter.estimate(&chunk.text) <= 8 || single_word, "chunk too large: {}", chunk.text);
    }
}

#[test]
fn test_segment_shouldPreserveEveryWordInOrder() {
    let segmenter = char_budget(20);
    let text = "One two three four five six.\n\nSeven eight nine. Ten eleven twelve thirteen fourteen.";
    let chunks = segmenter.segment(text);

    let rejoined: Vec<&str> = chunks.iter().flat_map(|c| c.text.split_whitespace()).collect();
    let original: Vec<&str> = text.split_whitespace().collect();
    assert_eq!(rejoined, original);
}

#[test]
fn test_reassemble_shouldRestoreParagraphBreaks() {
    let segmenter = char_budget(20);
    let text = "First part here.\n\nSecond part. Still second.";
    let chunks = segmenter.segment(text);
    let translations: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();

    assert_eq!(reassemble(&chunks, &translations), "First part here.\n\nSecond part. Still second.");
}

#[test]
fn test_splitSentences_withAbbreviationLikeDots_shouldNotSplitBeforeLowercase() {
    assert_eq!(split_sentences("It costs 3.50 francs. Really."), vec!["It costs 3.50 francs.", "Really."]);
    assert_eq!(split_sentences("see e.g. the notes"), vec!["see e.g. the notes"]);
}

#[test]
fn test_splitParagraphs_shouldDropEmptyParagraphs() {
    assert_eq!(split_paragraphs("a\n\n\n\nb\n  \nc"), vec!["a", "b", "c"]);
}

#[test]
fn test_stats_shouldCountChunkKinds() {
    let segmenter = char_budget(20);
    let stats = segmenter.stats("Tiny.\n\nThis one is longer. It has two parts.");

    assert_eq!(stats.chunk_count, 3);
    assert_eq!(stats.paragraph, 1);
    assert_eq!(stats.sentence, 2);
    assert_eq!(stats.full, 0);
}
