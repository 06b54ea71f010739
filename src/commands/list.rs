//! List posts from the content source

use anyhow::Result;
use std::io::Write;

use crate::content::ListItem;
use crate::helpers::DateFormatter;
use crate::listing::{Listing, NextPage};
use crate::source::ContentClient;
use crate::Blog;

/// Walk the whole listing, one "load more" at a time; Ctrl+C stops early
pub async fn run(blog: &Blog) -> Result<()> {
    let client = blog.client()?;
    let mut stdout = std::io::stdout();
    let count = list_posts(blog, client.as_ref(), &mut stdout, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await?;
    tracing::info!("Listed {} posts", count);
    Ok(())
}

/// Write every post to `out` as `date - title [uid]`
pub async fn list_posts<W, F>(
    blog: &Blog,
    client: &dyn ContentClient,
    out: &mut W,
    cancelled: F,
) -> Result<usize>
where
    W: Write,
    F: std::future::Future<Output = ()>,
{
    let config = &blog.config;
    let dates = DateFormatter::new(&config.date_format, &config.language, &config.timezone);
    let query = Listing::query(&config.source.document_type, config.per_page);

    let mut listing = Listing::initial_load(client, &query).await?;
    let mut printed = 0;
    tokio::pin!(cancelled);

    loop {
        for item in &listing.items()[printed..] {
            writeln!(out, "  {}", describe(item, &dates))?;
        }
        printed = listing.items().len();

        match listing
            .handle_next_page_until(client, &mut cancelled)
            .await?
        {
            NextPage::Appended(_) => {}
            NextPage::Cancelled => {
                tracing::info!("Interrupted before the last page");
                break;
            }
            NextPage::Exhausted | NextPage::Busy => break,
        }
    }

    Ok(printed)
}

fn describe(item: &ListItem, dates: &DateFormatter) -> String {
    let date = item
        .first_publication_date
        .as_ref()
        .map(|d| dates.format(d))
        .unwrap_or_else(|| "unpublished".to_string());
    format!("{} - {} [{}]", date, item.data.title, item.uid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Document;
    use crate::source::{test_posts, MemorySource, Query, ResultsPage};
    use async_trait::async_trait;
    use std::future::pending;

    /// Answers the first page, then never finishes a "load more"
    struct Stalled(MemorySource);

    #[async_trait]
    impl ContentClient for Stalled {
        async fn query(&self, query: &Query) -> crate::source::Result<ResultsPage> {
            self.0.query(query).await
        }

        async fn get_by_uid(
            &self,
            document_type: &str,
            uid: &str,
        ) -> crate::source::Result<Option<Document>> {
            self.0.get_by_uid(document_type, uid).await
        }

        async fn fetch_page(&self, _cursor: &str) -> crate::source::Result<ResultsPage> {
            pending().await
        }
    }

    #[tokio::test]
    async fn test_list_all_posts() {
        let dir = tempfile::tempdir().unwrap();
        let blog = Blog::new(dir.path()).unwrap();
        let source = MemorySource::new(test_posts(3));

        let mut out = Vec::new();
        let count = list_posts(&blog, &source, &mut out, pending()).await.unwrap();
        assert_eq!(count, 3);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "  25 Mar 2021 - Post 1 [post-1]");
        assert_eq!(lines[2], "  25 Mar 2021 - Post 3 [post-3]");
        // one initial query and two "load more" fetches
        assert_eq!(source.request_count(), 3);
    }

    #[tokio::test]
    async fn test_list_stops_when_cancelled() {
        let dir = tempfile::tempdir().unwrap();
        let blog = Blog::new(dir.path()).unwrap();
        let source = Stalled(MemorySource::new(test_posts(3)));

        // Ctrl+C already pressed: the stalled "load more" is abandoned
        let mut out = Vec::new();
        let count = list_posts(&blog, &source, &mut out, async {})
            .await
            .unwrap();
        assert_eq!(count, 1);

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert_eq!(text.lines().next(), Some("  25 Mar 2021 - Post 1 [post-1]"));
    }
}
