//! Built-in blog theme using Tera template engine
//!
//! Templates and the stylesheet are embedded directly in the binary. Dates
//! reach the templates as raw RFC 3339 strings and are formatted by the
//! `publish_date` filter with the site's locale and timezone.

use anyhow::Result;
use serde::Serialize;
use std::collections::HashMap;
use tera::{Context, Tera};

use crate::config::SiteConfig;
use crate::content::{parse_timestamp, ArticleView, ListItem, RichTextRenderer};
use crate::helpers::{date_xml, full_url_for, listing_path, post_path, url_for, DateFormatter};
use crate::i18n::I18n;
use crate::listing::Listing;

/// Stylesheet written to `css/style.css`
pub const STYLESHEET: &str = include_str!("theme/style.css");

/// Seconds before the pending page reloads itself
const PENDING_REFRESH_SECS: u64 = 2;

/// Template renderer with the embedded theme
pub struct TemplateRenderer {
    tera: Tera,
    site: SiteConfig,
    config: ConfigData,
    i18n: I18n,
}

impl TemplateRenderer {
    /// Create a new renderer with all templates loaded
    pub fn new(site: &SiteConfig, i18n: I18n) -> Result<Self> {
        let mut tera = Tera::default();

        // Content comes from a remote source; escape everything not marked safe
        tera.autoescape_on(vec![".html"]);

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("theme/layout.html")),
            ("index.html", include_str!("theme/index.html")),
            ("post.html", include_str!("theme/post.html")),
            ("pending.html", include_str!("theme/pending.html")),
            ("404.html", include_str!("theme/404.html")),
            (
                "partials/header.html",
                include_str!("theme/partials/header.html"),
            ),
        ])?;

        let dates = DateFormatter::new(&site.date_format, &site.language, &site.timezone);
        tera.register_filter(
            "publish_date",
            move |value: &tera::Value, _args: &HashMap<String, tera::Value>| {
                publish_date_filter(&dates, value)
            },
        );

        Ok(Self {
            tera,
            site: site.clone(),
            config: ConfigData::from(site),
            i18n,
        })
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }

    /// Create a base context with common variables
    fn create_base_context(&self, page_title: &str) -> Context {
        let mut context = Context::new();
        context.insert("config", &self.config);
        context.insert("t", &self.i18n.get_all_translations());
        context.insert("page_title", page_title);
        context
    }

    /// Render the listing as it stands after `page - 1` extra loads
    ///
    /// With more to load, the page links to `page + 1`. After a failed load
    /// it links back to itself so the visitor can retry.
    pub fn render_index(&self, listing: &Listing, page: usize) -> Result<String> {
        let posts: Vec<PostSummary> = listing
            .items()
            .iter()
            .map(|item| PostSummary::new(&self.site, item))
            .collect();

        let load_error = listing.error().is_some();
        let next_link = if load_error {
            Some(url_for(&self.site, &listing_path(page.max(1))))
        } else if listing.has_more() {
            Some(url_for(&self.site, &listing_path(page.max(1) + 1)))
        } else {
            None
        };

        let mut context = self.create_base_context("");
        context.insert("posts", &posts);
        context.insert("next_link", &next_link);
        context.insert("load_error", &load_error);

        self.render("index.html", &context)
    }

    /// Render a full article page
    pub fn render_post(
        &self,
        view: &ArticleView,
        rich_text: &dyn RichTextRenderer,
    ) -> Result<String> {
        let mut post = ArticleData::new(view, rich_text, &self.i18n);
        post.permalink = full_url_for(&self.site, &post_path(&self.site, &post.uid));
        let mut context = self.create_base_context(&post.title);
        context.insert("post", &post);
        self.render("post.html", &context)
    }

    /// Render the placeholder shown while an article is being generated
    pub fn render_pending(&self) -> Result<String> {
        let mut context = self.create_base_context(&self.i18n.get("loading"));
        context.insert("refresh_secs", &PENDING_REFRESH_SECS);
        self.render("pending.html", &context)
    }

    /// Render the page for an unknown slug
    pub fn render_not_found(&self) -> Result<String> {
        let context = self.create_base_context(&self.i18n.get("not_found.title"));
        self.render("404.html", &context)
    }
}

/// Tera filter: format a raw timestamp for display
fn publish_date_filter(dates: &DateFormatter, value: &tera::Value) -> tera::Result<tera::Value> {
    if value.is_null() {
        return Ok(tera::Value::String(String::new()));
    }
    let s = tera::try_get_value!("publish_date", "value", String, value);
    let date = parse_timestamp(&s).map_err(tera::Error::msg)?;
    Ok(tera::Value::String(dates.format(&date)))
}

/// Data structures for template context

#[derive(Debug, Clone, Serialize)]
pub struct ConfigData {
    pub title: String,
    pub description: String,
    pub logo: String,
    pub root: String,
    pub language: String,
}

impl From<&SiteConfig> for ConfigData {
    fn from(config: &SiteConfig) -> Self {
        Self {
            title: config.title.clone(),
            description: config.description.clone(),
            logo: asset_url(config, &config.logo),
            root: url_for(config, ""),
            language: config.language.clone(),
        }
    }
}

/// Absolute URLs pass through; site paths are placed under `root`
fn asset_url(config: &SiteConfig, path: &str) -> String {
    if path.contains("://") || path.starts_with("//") {
        path.to_string()
    } else {
        url_for(config, path)
    }
}

/// One entry of the listing
#[derive(Debug, Clone, Serialize)]
pub struct PostSummary {
    pub uid: String,
    pub href: String,
    /// RFC 3339, formatted by `publish_date`
    pub date: Option<String>,
    pub title: String,
    pub subtitle: String,
    pub author: String,
}

impl PostSummary {
    pub fn new(config: &SiteConfig, item: &ListItem) -> Self {
        Self {
            uid: item.uid.clone(),
            href: url_for(config, &post_path(config, &item.uid)),
            date: item.first_publication_date.map(|d| d.to_rfc3339()),
            title: item.data.title.clone(),
            subtitle: item.data.subtitle.clone(),
            author: item.data.author.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionData {
    pub heading: String,
    pub html: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArticleData {
    pub uid: String,
    pub permalink: String,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub banner_url: String,
    pub date: Option<String>,
    pub date_xml: String,
    pub reading_minutes: u32,
    pub reading_time: String,
    pub sections: Vec<SectionData>,
}

impl ArticleData {
    pub fn new(view: &ArticleView, rich_text: &dyn RichTextRenderer, i18n: &I18n) -> Self {
        let doc = &view.document;
        let sections = doc
            .data
            .content
            .iter()
            .map(|block| SectionData {
                heading: block.heading.clone(),
                html: rich_text.to_html(&block.body),
            })
            .collect();

        Self {
            uid: doc.uid.clone(),
            permalink: String::new(),
            title: doc.data.title.clone(),
            subtitle: doc.data.subtitle.clone(),
            author: doc.data.author.clone(),
            banner_url: doc
                .data
                .banner
                .as_ref()
                .map(|b| b.url.clone())
                .unwrap_or_default(),
            date: doc.first_publication_date.map(|d| d.to_rfc3339()),
            date_xml: doc
                .first_publication_date
                .as_ref()
                .map(date_xml)
                .unwrap_or_default(),
            reading_minutes: view.reading_minutes,
            reading_time: i18n.get_count("reading_time", view.reading_minutes),
            sections,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{ContentBlock, PrismicRenderer, RichText, RichTextBlock};
    use crate::source::{test_post, test_posts, ResultsPage};
    use chrono::{TimeZone, Utc};

    fn renderer(language: &str) -> TemplateRenderer {
        let mut config = SiteConfig::default();
        config.language = language.to_string();
        config.date_format = "DD MMMM YYYY".to_string();
        TemplateRenderer::new(&config, I18n::new(language)).unwrap()
    }

    fn page(count: usize, next_page: Option<&str>) -> ResultsPage {
        ResultsPage {
            results: test_posts(count),
            next_page: next_page.map(str::to_string),
            page: 1,
            total_pages: 1,
            total_results_size: count,
        }
    }

    #[test]
    fn test_render_index_with_more() {
        let listing = Listing::from_page(page(2, Some("memory://next")));
        let html = renderer("en").render_index(&listing, 1).unwrap();

        assert!(html.contains("<strong>Post 1</strong>"));
        assert!(html.contains("<strong>Post 2</strong>"));
        assert!(html.contains(r#"href="/post/post-1/""#));
        assert!(html.contains(r#"<a class="load-more" href="/page/2/">Load more posts</a>"#));
        assert!(html.contains("25 March 2021"));
    }

    #[test]
    fn test_render_index_exhausted() {
        let listing = Listing::from_page(page(1, None));
        let html = renderer("pt-BR").render_index(&listing, 3).unwrap();
        assert!(!html.contains("load-more"));
        assert!(!html.contains("Carregar mais posts"));
        assert!(html.contains("25 março 2021"));
    }

    #[test]
    fn test_render_index_escapes_content() {
        let mut doc = test_post("xss", "<script>alert(1)</script>");
        doc.data.author = "Tom & Jerry".to_string();
        let listing = Listing::from_page(ResultsPage {
            results: vec![doc],
            next_page: None,
            page: 1,
            total_pages: 1,
            total_results_size: 1,
        });
        let html = renderer("en").render_index(&listing, 1).unwrap();
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("Tom &amp; Jerry"));
    }

    #[test]
    fn test_render_post() {
        let mut doc = test_post("hello", "Hello World");
        doc.data.author = "Ana".to_string();
        doc.data.content = vec![ContentBlock {
            heading: "Intro".to_string(),
            body: RichText(vec![RichTextBlock::new("paragraph", "First paragraph")]),
        }];
        let view = ArticleView::new(doc, 200, &PrismicRenderer);

        let html = renderer("en")
            .render_post(&view, &PrismicRenderer)
            .unwrap();
        assert!(html.contains("<title>Hello World | Blog</title>"));
        assert!(html.contains("<h2>Intro</h2>"));
        assert!(html.contains("<p>First paragraph</p>"));
        assert!(html.contains("<span>1 min</span>"));
        assert!(html.contains("<span>Ana</span>"));
        assert!(html.contains(r#"<meta property="og:url" content="http:"#));
        assert!(html.contains("localhost:4000"));
        assert!(html.contains(r#"datetime="2021-03-25T19:25:28.000+00:00""#));
    }

    #[test]
    fn test_render_pending_and_not_found() {
        let pt = renderer("pt-BR");
        let pending = pt.render_pending().unwrap();
        assert!(pending.contains("<h1>Carregando...</h1>"));
        assert!(pending.contains(r#"http-equiv="refresh""#));

        let missing = renderer("en").render_not_found().unwrap();
        assert!(missing.contains("Post not found"));
        assert!(missing.contains(r#"<a href="/">Back to all posts</a>"#));
    }

    #[test]
    fn test_logo_follows_root() {
        let mut config = SiteConfig::default();
        config.root = "/blog/".to_string();
        let renderer = TemplateRenderer::new(&config, I18n::default()).unwrap();
        let html = renderer.render_not_found().unwrap();
        assert!(html.contains(r#"<img src="/blog/Logo.svg""#));
        assert!(html.contains(r#"<a href="/blog/""#));

        config.logo = "https://cdn.example.com/logo.png".to_string();
        assert_eq!(ConfigData::from(&config).logo, "https://cdn.example.com/logo.png");
    }

    #[test]
    fn test_publish_date_filter() {
        let dates = DateFormatter::new("DD MMM YYYY", "en", "");
        let value = tera::Value::String(
            Utc.with_ymd_and_hms(2021, 3, 25, 19, 25, 28)
                .unwrap()
                .to_rfc3339(),
        );
        assert_eq!(
            publish_date_filter(&dates, &value).unwrap(),
            tera::Value::String("25 Mar 2021".to_string())
        );
        assert_eq!(
            publish_date_filter(&dates, &tera::Value::Null).unwrap(),
            tera::Value::String(String::new())
        );
        assert!(publish_date_filter(&dates, &tera::Value::String("soon".into())).is_err());
    }
}
