//! View models derived from documents

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::document::Document;
use super::reading_time;
use super::rich_text::RichTextRenderer;

/// A post as shown in the listing
///
/// The publication date stays a raw timestamp; it is formatted when the
/// listing is rendered, so the same item can be shown under any locale.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListItem {
    pub uid: String,
    pub first_publication_date: Option<DateTime<Utc>>,
    pub data: ListItemData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListItemData {
    pub title: String,
    pub subtitle: String,
    pub author: String,
}

impl From<&Document> for ListItem {
    fn from(document: &Document) -> Self {
        Self {
            uid: document.uid.clone(),
            first_publication_date: document.first_publication_date,
            data: ListItemData {
                title: document.data.title.clone(),
                subtitle: document.data.subtitle.clone(),
                author: document.data.author.clone(),
            },
        }
    }
}

/// A resolved article with its reading-time estimate
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleView {
    pub document: Document,
    pub reading_minutes: u32,
}

impl ArticleView {
    pub fn new(
        document: Document,
        words_per_minute: usize,
        renderer: &dyn RichTextRenderer,
    ) -> Self {
        let reading_minutes = reading_time::reading_minutes(&document, words_per_minute, renderer);
        Self {
            document,
            reading_minutes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{ContentBlock, DocumentData, PrismicRenderer, RichText, RichTextBlock};
    use chrono::TimeZone;

    fn document() -> Document {
        Document {
            id: Some("YF1".to_string()),
            uid: "hello-world".to_string(),
            document_type: "post".to_string(),
            first_publication_date: Some(Utc.with_ymd_and_hms(2021, 3, 15, 19, 25, 28).unwrap()),
            last_publication_date: Some(Utc.with_ymd_and_hms(2021, 4, 1, 8, 0, 0).unwrap()),
            data: DocumentData {
                title: "Hello World".to_string(),
                subtitle: "A first post".to_string(),
                author: "Ana".to_string(),
                banner: None,
                content: vec![ContentBlock {
                    heading: "A B C".to_string(),
                    body: RichText(vec![RichTextBlock::new(
                        "paragraph",
                        "one two three four",
                    )]),
                }],
            },
        }
    }

    #[test]
    fn test_list_item_keeps_fields() {
        let doc = document();
        let item = ListItem::from(&doc);
        assert_eq!(item.uid, "hello-world");
        assert_eq!(item.first_publication_date, doc.first_publication_date);
        assert_eq!(item.data.title, "Hello World");
        assert_eq!(item.data.subtitle, "A first post");
        assert_eq!(item.data.author, "Ana");
    }

    #[test]
    fn test_list_item_is_pure() {
        let doc = document();
        assert_eq!(ListItem::from(&doc), ListItem::from(&doc));
        assert_eq!(doc, document());
    }

    #[test]
    fn test_article_view_reading_minutes() {
        let view = ArticleView::new(document(), 200, &PrismicRenderer);
        assert_eq!(view.reading_minutes, 1);
        assert_eq!(view.document.uid, "hello-world");
    }
}
