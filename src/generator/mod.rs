//! Generator module - pre-renders the listing and every known article

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use walkdir::WalkDir;

use crate::article::{self, ArticleState};
use crate::content::{ArticleView, PrismicRenderer};
use crate::helpers::listing_path;
use crate::listing::{Listing, NextPage};
use crate::source::ContentClient;
use crate::templates::{TemplateRenderer, STYLESHEET};
use crate::Blog;

/// What a generation run produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateSummary {
    /// Cumulative listing pages, including the index
    pub listing_pages: usize,
    /// Article pages
    pub posts: usize,
    /// Slugs listed by the source that could not be resolved
    pub skipped: usize,
}

/// Static site generator using Tera templates
pub struct Generator {
    blog: Blog,
    client: Arc<dyn ContentClient>,
    renderer: TemplateRenderer,
    rich_text: PrismicRenderer,
}

impl Generator {
    /// Create a new generator
    pub fn new(blog: &Blog, client: Arc<dyn ContentClient>) -> Result<Self> {
        Ok(Self {
            blog: blog.clone(),
            client,
            renderer: blog.templates()?,
            rich_text: PrismicRenderer,
        })
    }

    pub fn renderer(&self) -> &TemplateRenderer {
        &self.renderer
    }

    pub fn client(&self) -> &dyn ContentClient {
        self.client.as_ref()
    }

    /// Generate the entire site
    pub async fn generate(&self) -> Result<GenerateSummary> {
        fs::create_dir_all(&self.blog.public_dir)?;

        self.write_assets()?;
        self.copy_static_assets()?;
        self.generate_not_found()?;

        let listing_pages = self.generate_index_pages().await?;
        let (posts, skipped) = self.generate_post_pages().await?;

        Ok(GenerateSummary {
            listing_pages,
            posts,
            skipped,
        })
    }

    /// Generate the index and one cumulative page per "load more" step
    async fn generate_index_pages(&self) -> Result<usize> {
        let config = &self.blog.config;
        let query = Listing::query(&config.source.document_type, config.per_page);
        let mut listing = Listing::initial_load(self.client(), &query)
            .await
            .context("Failed to load the first listing page")?;

        let mut page = 1;
        loop {
            let html = self.renderer.render_index(&listing, page)?;
            self.write_page(&listing_path(page), &html)?;

            match listing
                .handle_next_page(self.client())
                .await
                .with_context(|| format!("Failed to load listing page {}", page + 1))?
            {
                NextPage::Appended(_) => page += 1,
                NextPage::Exhausted | NextPage::Busy | NextPage::Cancelled => break,
            }
        }

        tracing::info!(
            "Generated {} listing pages with {} posts",
            page,
            listing.items().len()
        );
        Ok(page)
    }

    /// Generate a page for every slug the source knows about
    async fn generate_post_pages(&self) -> Result<(usize, usize)> {
        let document_type = &self.blog.config.source.document_type;
        let slugs = article::known_slugs(self.client(), document_type)
            .await
            .context("Failed to list posts")?;

        let mut generated = 0;
        let mut skipped = 0;
        for slug in &slugs {
            if post_output_path(&self.blog, slug).is_err() {
                tracing::warn!("Skipping post with unusable uid {:?}", slug);
                skipped += 1;
                continue;
            }
            match self.generate_post(slug).await? {
                Some(_) => generated += 1,
                None => {
                    tracing::warn!("Post {} disappeared while generating", slug);
                    skipped += 1;
                }
            }
        }

        tracing::info!("Generated {} posts", generated);
        Ok((generated, skipped))
    }

    /// Resolve one article and write its page
    ///
    /// Returns the rendered HTML, or `None` when the source has no such post.
    pub async fn generate_post(&self, slug: &str) -> Result<Option<String>> {
        let output_path = post_output_path(&self.blog, slug)?;
        let state = article::resolve(
            self.client(),
            &self.blog.config.source.document_type,
            slug,
            self.blog.config.words_per_minute,
            &self.rich_text,
        )
        .await?;

        match state {
            ArticleState::Ready(view) => {
                let html = self.render_post(&view)?;
                let content = html.clone();
                tokio::task::spawn_blocking(move || write_file(&output_path, &content)).await??;
                Ok(Some(html))
            }
            ArticleState::NotFound | ArticleState::Pending => Ok(None),
        }
    }

    pub fn render_post(&self, view: &ArticleView) -> Result<String> {
        self.renderer.render_post(view, &self.rich_text)
    }

    fn generate_not_found(&self) -> Result<()> {
        let html = self.renderer.render_not_found()?;
        write_file(&self.blog.public_dir.join("404.html"), &html)
    }

    fn write_assets(&self) -> Result<()> {
        write_file(
            &self.blog.public_dir.join("css").join("style.css"),
            STYLESHEET,
        )
    }

    /// Write `html` as the index of a site-relative directory
    fn write_page(&self, dir: &str, html: &str) -> Result<()> {
        let output_path = self.blog.public_dir.join(dir).join("index.html");
        write_file(&output_path, html)
    }

    /// Copy the static directory (logo, images, etc.) to the public directory
    fn copy_static_assets(&self) -> Result<()> {
        let static_dir = &self.blog.static_dir;
        if !static_dir.exists() {
            return Ok(());
        }

        for entry in WalkDir::new(static_dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let relative = path.strip_prefix(static_dir)?;
            let dest = self.blog.public_dir.join(relative);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(path, &dest)?;
            tracing::debug!("Copied: {:?}", dest);
        }

        Ok(())
    }
}

/// Where the page of article `uid` lives on disk
///
/// The uid becomes a single directory name, so it must not be empty, contain
/// a separator, or be `.`/`..`.
pub fn post_output_path(blog: &Blog, uid: &str) -> Result<PathBuf> {
    let mut components = Path::new(uid).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if !uid.contains(['/', '\\']) => {}
        _ => bail!("Invalid post uid: {:?}", uid),
    }

    Ok(blog
        .public_dir
        .join(blog.config.post_dir.trim_matches('/'))
        .join(uid)
        .join("index.html"))
}

/// Write `content` to a sibling temp file, then rename it over `path`
///
/// Readers see either the old file or the complete new one.
fn write_file(path: &Path, content: &str) -> Result<()> {
    let (Some(parent), Some(name)) = (path.parent(), path.file_name()) else {
        bail!("Invalid output path: {:?}", path);
    };
    fs::create_dir_all(parent)?;

    let tmp = parent.join(format!(
        ".{}.{}.tmp",
        name.to_string_lossy(),
        std::process::id()
    ));
    fs::write(&tmp, content).with_context(|| format!("Failed to write {:?}", tmp))?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e).with_context(|| format!("Failed to write {:?}", path));
    }
    tracing::debug!("Generated: {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use crate::source::{test_posts, MemorySource};

    fn blog(dir: &Path, per_page: usize) -> Blog {
        let mut config = SiteConfig::default();
        config.per_page = per_page;
        Blog::with_config(dir, config).unwrap()
    }

    #[tokio::test]
    async fn test_generate_site() {
        let dir = tempfile::tempdir().unwrap();
        let blog = blog(dir.path(), 2);
        fs::create_dir_all(blog.static_dir.join("img")).unwrap();
        fs::write(blog.static_dir.join("Logo.svg"), "<svg/>").unwrap();
        fs::write(blog.static_dir.join("img").join("a.png"), "png").unwrap();

        let source = Arc::new(MemorySource::new(test_posts(5)));
        let generator = Generator::new(&blog, source).unwrap();
        let summary = generator.generate().await.unwrap();

        assert_eq!(
            summary,
            GenerateSummary {
                listing_pages: 3,
                posts: 5,
                skipped: 0,
            }
        );

        let public = &blog.public_dir;
        let index = fs::read_to_string(public.join("index.html")).unwrap();
        assert!(index.contains("Post 2"));
        assert!(!index.contains("Post 3"));
        assert!(index.contains(r#"href="/page/2/""#));

        // cumulative: page 3 holds every post and no "load more"
        let last = fs::read_to_string(public.join("page/3/index.html")).unwrap();
        assert!(last.contains("Post 1"));
        assert!(last.contains("Post 5"));
        assert!(!last.contains("load-more"));
        assert!(!public.join("page/4").exists());

        let post = fs::read_to_string(public.join("post/post-4/index.html")).unwrap();
        assert!(post.contains("Post 4"));
        assert!(post.contains("1 min"));

        assert!(public.join("404.html").exists());
        assert!(public.join("css/style.css").exists());
        assert!(public.join("Logo.svg").exists());
        assert!(public.join("img/a.png").exists());
    }

    #[tokio::test]
    async fn test_generate_empty_source() {
        let dir = tempfile::tempdir().unwrap();
        let blog = blog(dir.path(), 1);
        let generator = Generator::new(&blog, Arc::new(MemorySource::new(vec![]))).unwrap();

        let summary = generator.generate().await.unwrap();
        assert_eq!(summary.listing_pages, 1);
        assert_eq!(summary.posts, 0);
        assert!(blog.public_dir.join("index.html").exists());
    }

    #[tokio::test]
    async fn test_generate_post_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let blog = blog(dir.path(), 1);
        let generator = Generator::new(&blog, Arc::new(MemorySource::new(test_posts(1)))).unwrap();

        assert!(generator.generate_post("missing").await.unwrap().is_none());
        assert!(!blog.public_dir.join("post/missing").exists());
        assert!(generator.generate_post("post-1").await.unwrap().is_some());
        assert!(blog.public_dir.join("post/post-1/index.html").exists());
    }

    #[test]
    fn test_write_file_replaces_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("post/hello/index.html");

        write_file(&path, "old").unwrap();
        write_file(&path, "new").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new");

        let names: Vec<_> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["index.html"]);
    }

    #[test]
    fn test_post_output_path() {
        let dir = tempfile::tempdir().unwrap();
        let blog = blog(dir.path(), 1);
        assert_eq!(
            post_output_path(&blog, "hello").unwrap(),
            blog.public_dir.join("post/hello/index.html")
        );
        assert!(post_output_path(&blog, "").is_err());
        assert!(post_output_path(&blog, "..").is_err());
        assert!(post_output_path(&blog, ".").is_err());
        assert!(post_output_path(&blog, "a/b").is_err());
    }
}
