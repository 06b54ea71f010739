//! Content module - documents, rich text, reading time and view models

mod document;
pub mod reading_time;
mod rich_text;
mod view;

pub use document::{parse_timestamp, Banner, ContentBlock, Document, DocumentData};
pub use reading_time::{count_words, ReadingEstimate, DEFAULT_WORDS_PER_MINUTE};
pub use rich_text::{
    Embed, PrismicRenderer, RichText, RichTextBlock, RichTextRenderer, Span, SpanData,
};
pub use view::{ArticleView, ListItem, ListItemData};
