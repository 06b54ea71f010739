//! Query model and result pages

use serde::Deserialize;
use std::fmt;

use super::error::{Result, SourceError};
use crate::content::Document;

/// A filter understood by the content API
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Field at `path` equals `value`
    At { path: String, value: String },
}

impl Predicate {
    pub fn at(path: impl Into<String>, value: impl Into<String>) -> Self {
        Self::At {
            path: path.into(),
            value: value.into(),
        }
    }

    /// Whether a document satisfies this predicate
    ///
    /// Supports `document.type`, `document.id` and `my.<type>.uid`.
    pub fn matches(&self, document: &Document) -> bool {
        match self {
            Self::At { path, value } => match path.as_str() {
                "document.type" => document.document_type == *value,
                "document.id" => document.id.as_deref() == Some(value.as_str()),
                other => match other
                    .strip_prefix("my.")
                    .and_then(|rest| rest.strip_suffix(".uid"))
                {
                    Some(doc_type) => document.document_type == doc_type && document.uid == *value,
                    None => false,
                },
            },
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::At { path, value } => write!(
                f,
                "[at({}, \"{}\")]",
                path,
                value.replace('\\', "\\\\").replace('"', "\\\"")
            ),
        }
    }
}

/// A structured query against the content source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub predicates: Vec<Predicate>,
    /// Fields to return, e.g. `post.title`; empty means all fields
    pub fetch: Vec<String>,
    pub page_size: usize,
    pub page: usize,
}

impl Default for Query {
    fn default() -> Self {
        Self {
            predicates: Vec::new(),
            fetch: Vec::new(),
            page_size: 20,
            page: 1,
        }
    }
}

impl Query {
    /// All documents of one custom type
    pub fn document_type(doc_type: &str) -> Self {
        Self::default().predicate(Predicate::at("document.type", doc_type))
    }

    pub fn predicate(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn fetch<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fetch = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// The `q` parameter: `[[at(document.type, "post")]]`
    pub fn predicate_string(&self) -> String {
        let inner: String = self.predicates.iter().map(|p| p.to_string()).collect();
        format!("[{}]", inner)
    }
}

/// One page of query results
#[derive(Debug, Clone, PartialEq)]
pub struct ResultsPage {
    pub results: Vec<Document>,
    /// Opaque locator of the following page; `None` on the last page
    pub next_page: Option<String>,
    pub page: usize,
    pub total_pages: usize,
    pub total_results_size: usize,
}

#[derive(Deserialize)]
struct RawPage {
    #[serde(default)]
    results: Vec<serde_json::Value>,
    next_page: Option<String>,
    page: Option<usize>,
    total_pages: Option<usize>,
    total_results_size: Option<usize>,
}

impl ResultsPage {
    /// Parse and validate a raw page response
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let raw: RawPage = serde_json::from_value(value)
            .map_err(|e| SourceError::schema("results page", e.to_string()))?;

        let results = raw
            .results
            .into_iter()
            .map(Document::from_value)
            .collect::<Result<Vec<_>>>()?;

        let total_results_size = raw.total_results_size.unwrap_or(results.len());
        Ok(Self {
            next_page: raw.next_page.filter(|next| !next.is_empty()),
            page: raw.page.unwrap_or(1),
            total_pages: raw.total_pages.unwrap_or(1),
            total_results_size,
            results,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_predicate_string() {
        let query = Query::document_type("post");
        assert_eq!(query.predicate_string(), r#"[[at(document.type, "post")]]"#);

        let query = query.predicate(Predicate::at("my.post.uid", "say \"hi\""));
        assert_eq!(
            query.predicate_string(),
            r#"[[at(document.type, "post")][at(my.post.uid, "say \"hi\"")]]"#
        );
    }

    #[test]
    fn test_builder_clamps() {
        let query = Query::document_type("post").page_size(0);
        assert_eq!(query.page_size, 1);
        assert_eq!(query.page, 1);
    }

    #[test]
    fn test_page_from_value() {
        let value = json!({
            "page": 1,
            "results_per_page": 1,
            "total_pages": 2,
            "total_results_size": 2,
            "next_page": "https://repo.cdn.prismic.io/api/v2/documents/search?page=2",
            "results": [{ "uid": "a", "type": "post", "data": { "title": "A" } }]
        });
        let page = ResultsPage::from_value(value).unwrap();
        assert_eq!(page.results.len(), 1);
        assert_eq!(page.total_pages, 2);
        assert!(page.next_page.unwrap().ends_with("page=2"));
    }

    #[test]
    fn test_page_rejects_bad_document() {
        let value = json!({
            "next_page": null,
            "results": [{ "uid": "a", "data": { "title": "A" } }, { "uid": "b", "data": {} }]
        });
        let err = ResultsPage::from_value(value).unwrap_err();
        assert!(err.to_string().contains("document `b`"));
    }

    #[test]
    fn test_predicate_matches() {
        let doc = Document::from_value(json!({
            "id": "X1", "uid": "hello", "type": "post", "data": { "title": "Hello" }
        }))
        .unwrap();
        assert!(Predicate::at("document.type", "post").matches(&doc));
        assert!(!Predicate::at("document.type", "page").matches(&doc));
        assert!(Predicate::at("document.id", "X1").matches(&doc));
        assert!(Predicate::at("my.post.uid", "hello").matches(&doc));
        assert!(!Predicate::at("my.page.uid", "hello").matches(&doc));
        assert!(!Predicate::at("my.post.title", "Hello").matches(&doc));
    }
}
