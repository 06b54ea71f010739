//! Article controller - resolves a single post by slug

use crate::content::{ArticleView, RichTextRenderer};
use crate::source::{ContentClient, Query, Result};

/// Page size used when enumerating every slug
const SLUG_PAGE_SIZE: usize = 100;

/// What an article route resolves to
#[derive(Debug, Clone, PartialEq)]
pub enum ArticleState {
    /// The document exists and is ready to render
    Ready(Box<ArticleView>),
    /// Not generated yet; generation is in flight
    Pending,
    /// The source has no document with this slug
    NotFound,
}

/// Resolve `slug` to an article view with its reading time
pub async fn resolve(
    client: &dyn ContentClient,
    document_type: &str,
    slug: &str,
    words_per_minute: usize,
    renderer: &dyn RichTextRenderer,
) -> Result<ArticleState> {
    match client.get_by_uid(document_type, slug).await? {
        Some(document) => {
            let view = ArticleView::new(document, words_per_minute, renderer);
            tracing::debug!("Resolved {} ({} min read)", slug, view.reading_minutes);
            Ok(ArticleState::Ready(Box::new(view)))
        }
        None => {
            tracing::debug!("No {} with uid {}", document_type, slug);
            Ok(ArticleState::NotFound)
        }
    }
}

/// Every slug that can be generated ahead of time, in source order
///
/// `uid` is a top-level field, not part of `data`, so the query only asks
/// for the title, which every document must carry.
pub async fn known_slugs(client: &dyn ContentClient, document_type: &str) -> Result<Vec<String>> {
    let query = Query::document_type(document_type)
        .fetch([format!("{}.title", document_type)])
        .page_size(SLUG_PAGE_SIZE);

    let mut page = client.query(&query).await?;
    let mut slugs: Vec<String> = page.results.iter().map(|doc| doc.uid.clone()).collect();

    while let Some(cursor) = page.next_page.take() {
        page = client.fetch_page(&cursor).await?;
        slugs.extend(page.results.iter().map(|doc| doc.uid.clone()));
    }

    Ok(slugs)
}
