//! Reading-time estimation

use super::document::Document;
use super::rich_text::RichTextRenderer;

/// Assumed reading speed when none is configured
pub const DEFAULT_WORDS_PER_MINUTE: usize = 200;

/// Word counts behind a reading-time estimate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadingEstimate {
    pub title_words: usize,
    pub heading_words: usize,
    pub body_words: usize,
    pub minutes: u32,
}

impl ReadingEstimate {
    pub fn total_words(&self) -> usize {
        self.title_words + self.heading_words + self.body_words
    }
}

/// Count whitespace-separated words
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Estimate how long a document takes to read
///
/// `minutes = ceil((title + headings + bodies) / words_per_minute)`. Sums start
/// at zero, so a document without content blocks is still estimated from its
/// title alone.
pub fn estimate(
    document: &Document,
    words_per_minute: usize,
    renderer: &dyn RichTextRenderer,
) -> ReadingEstimate {
    let title_words = count_words(&document.data.title);
    let heading_words: usize = document
        .data
        .content
        .iter()
        .map(|block| count_words(&block.heading))
        .sum();
    let body_words: usize = document
        .data
        .content
        .iter()
        .map(|block| count_words(&renderer.to_plain_text(&block.body)))
        .sum();

    let mut estimate = ReadingEstimate {
        title_words,
        heading_words,
        body_words,
        minutes: 0,
    };
    let minutes = estimate.total_words().div_ceil(words_per_minute.max(1));
    estimate.minutes = u32::try_from(minutes).unwrap_or(u32::MAX);
    estimate
}

/// Shorthand for [`estimate`] when only the minutes matter
pub fn reading_minutes(
    document: &Document,
    words_per_minute: usize,
    renderer: &dyn RichTextRenderer,
) -> u32 {
    estimate(document, words_per_minute, renderer).minutes
}
