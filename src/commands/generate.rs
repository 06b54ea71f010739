//! Generate static files

use anyhow::Result;

use crate::generator::{GenerateSummary, Generator};
use crate::Blog;

/// Generate the static site from the configured content source
pub async fn run(blog: &Blog) -> Result<()> {
    let start = std::time::Instant::now();

    let generator = Generator::new(blog, blog.client()?)?;
    let GenerateSummary {
        listing_pages,
        posts,
        skipped,
    } = generator.generate().await?;

    if skipped > 0 {
        tracing::warn!("Skipped {} posts", skipped);
    }
    tracing::info!(
        "Generated {} listing pages and {} posts in {:.2}s",
        listing_pages,
        posts,
        start.elapsed().as_secs_f64()
    );

    Ok(())
}
