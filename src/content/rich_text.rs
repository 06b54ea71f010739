//! Structured rich text and its conversion to plain text and HTML

use serde::{Deserialize, Serialize};

use super::document::null_as_default;
use crate::helpers::html_escape;

/// Block-based rich text as returned by the content source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RichText(pub Vec<RichTextBlock>);

impl RichText {
    pub fn blocks(&self) -> &[RichTextBlock] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A single rich-text block (paragraph, heading, list item, image, ...)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RichTextBlock {
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub kind: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub spans: Vec<Span>,
    /// Image source for `image` blocks
    #[serde(default)]
    pub url: Option<String>,
    /// Image alt text for `image` blocks
    #[serde(default)]
    pub alt: Option<String>,
    /// Embedded resource for `embed` blocks
    #[serde(default)]
    pub oembed: Option<Embed>,
}

impl RichTextBlock {
    pub fn new(kind: &str, text: &str) -> Self {
        Self {
            kind: kind.to_string(),
            text: text.to_string(),
            ..Default::default()
        }
    }
}

/// Inline formatting over a range of a block's text
///
/// Offsets count UTF-16 code units, as the content API reports them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub data: Option<SpanData>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpanData {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Embed {
    #[serde(default)]
    pub embed_url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

/// Converts rich text for word counting and display
pub trait RichTextRenderer: Send + Sync {
    fn to_plain_text(&self, rich_text: &RichText) -> String;

    /// Render to a sanitized HTML fragment
    fn to_html(&self, rich_text: &RichText) -> String;
}

/// Renderer for Prismic structured text
#[derive(Debug, Clone, Default)]
pub struct PrismicRenderer;

impl RichTextRenderer for PrismicRenderer {
    fn to_plain_text(&self, rich_text: &RichText) -> String {
        rich_text
            .blocks()
            .iter()
            .map(|block| block.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn to_html(&self, rich_text: &RichText) -> String {
        let mut html = String::new();
        let mut open_list: Option<&'static str> = None;

        for block in rich_text.blocks() {
            let list = match block.kind.as_str() {
                "list-item" => Some("ul"),
                "o-list-item" => Some("ol"),
                _ => None,
            };

            if open_list != list {
                if let Some(tag) = open_list {
                    html.push_str(&format!("</{}>", tag));
                }
                if let Some(tag) = list {
                    html.push_str(&format!("<{}>", tag));
                }
                open_list = list;
            }

            html.push_str(&render_block(block));
        }

        if let Some(tag) = open_list {
            html.push_str(&format!("</{}>", tag));
        }

        html
    }
}

fn render_block(block: &RichTextBlock) -> String {
    let inline = || render_spans(&block.text, &block.spans);

    if let Some(level) = heading_level(&block.kind) {
        return format!("<h{level}>{}</h{level}>", inline());
    }

    match block.kind.as_str() {
        "paragraph" => format!("<p>{}</p>", inline()),
        "preformatted" => format!("<pre>{}</pre>", inline()),
        "list-item" | "o-list-item" => format!("<li>{}</li>", inline()),
        "image" => match block.url.as_deref().filter(|url| is_safe_url(url)) {
            Some(url) => format!(
                r#"<p class="block-img"><img src="{}" alt="{}" /></p>"#,
                html_escape(url),
                html_escape(block.alt.as_deref().unwrap_or(""))
            ),
            None => String::new(),
        },
        "embed" => {
            let embed = block.oembed.as_ref();
            match embed
                .and_then(|e| e.embed_url.as_deref())
                .filter(|url| is_safe_url(url))
            {
                Some(url) => {
                    let title = embed.and_then(|e| e.title.as_deref()).unwrap_or(url);
                    format!(
                        r#"<div class="block-embed"><a href="{}">{}</a></div>"#,
                        html_escape(url),
                        html_escape(title)
                    )
                }
                None => String::new(),
            }
        }
        _ if block.text.is_empty() => String::new(),
        _ => format!("<p>{}</p>", inline()),
    }
}

fn heading_level(kind: &str) -> Option<u8> {
    kind.strip_prefix("heading")
        .and_then(|n| n.parse::<u8>().ok())
        .filter(|n| (1..=6).contains(n))
}

/// Apply spans to a block's text, escaping everything in between
fn render_spans(text: &str, spans: &[Span]) -> String {
    let mut spans: Vec<&Span> = spans.iter().filter(|s| s.start < s.end).collect();
    // Outer spans open first
    spans.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

    let mut out = String::with_capacity(text.len());
    let mut open: Vec<&Span> = Vec::new();
    let mut next = 0;
    let mut pos = 0;

    for ch in text.chars() {
        close_ended(&mut out, &mut open, pos);

        while next < spans.len() && spans[next].start <= pos {
            let span = spans[next];
            next += 1;
            if span.end > pos {
                out.push_str(&span_tags(span).0);
                open.push(span);
            }
        }

        match ch {
            '\n' => out.push_str("<br />"),
            _ => out.push_str(&html_escape(ch.encode_utf8(&mut [0; 4]))),
        }
        pos += ch.len_utf16();
    }

    close_ended(&mut out, &mut open, usize::MAX);
    out
}

/// Close every span that ends at `pos`, reopening the ones it overlapped
fn close_ended<'a>(out: &mut String, open: &mut Vec<&'a Span>, pos: usize) {
    let Some(first) = open.iter().position(|s| s.end <= pos) else {
        return;
    };

    let closed: Vec<&Span> = open.drain(first..).collect();
    for span in closed.iter().rev() {
        out.push_str(span_tags(span).1);
    }
    for span in closed {
        if span.end > pos {
            out.push_str(&span_tags(span).0);
            open.push(span);
        }
    }
}

fn span_tags(span: &Span) -> (String, &'static str) {
    match span.kind.as_str() {
        "strong" => ("<strong>".to_string(), "</strong>"),
        "em" => ("<em>".to_string(), "</em>"),
        "hyperlink" => match span
            .data
            .as_ref()
            .and_then(|d| d.url.as_deref())
            .filter(|url| is_safe_url(url))
        {
            Some(url) => (format!(r#"<a href="{}">"#, html_escape(url)), "</a>"),
            None => (String::new(), ""),
        },
        "label" => match span.data.as_ref().and_then(|d| d.label.as_deref()) {
            Some(label) => (
                format!(r#"<span class="{}">"#, html_escape(label)),
                "</span>",
            ),
            None => (String::new(), ""),
        },
        _ => (String::new(), ""),
    }
}

/// Only web, mail and site-relative links survive rendering
fn is_safe_url(url: &str) -> bool {
    let url = url.trim();
    if url.starts_with('/') || url.starts_with('#') {
        return true;
    }
    match url::Url::parse(url) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https" | "mailto"),
        Err(_) => false,
    }
}
