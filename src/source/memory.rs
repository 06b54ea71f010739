//! In-memory content source, optionally loaded from a JSON dump

use async_trait::async_trait;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use url::Url;

use super::error::{Result, SourceError};
use super::query::{Predicate, Query, ResultsPage};
use super::ContentClient;
use crate::content::Document;

const CURSOR_BASE: &str = "memory://documents/search";

/// Serves a fixed set of documents with the same paging as the remote API
///
/// Cursors look like `memory://documents/search?at=document.type|post&pageSize=1&page=2`.
#[derive(Debug, Default)]
pub struct MemorySource {
    documents: Vec<Document>,
    requests: AtomicUsize,
}

impl MemorySource {
    pub fn new(documents: Vec<Document>) -> Self {
        Self {
            documents,
            requests: AtomicUsize::new(0),
        }
    }

    /// Load documents from a JSON file holding either an array of documents
    /// or a results page (`{ "results": [...] }`)
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let value: serde_json::Value = serde_json::from_str(&content)?;

        let raw_documents = match value {
            serde_json::Value::Array(items) => items,
            serde_json::Value::Object(mut map) => match map.remove("results") {
                Some(serde_json::Value::Array(items)) => items,
                _ => {
                    return Err(SourceError::schema(
                        &path.display().to_string(),
                        "expected an array of documents or an object with `results`",
                    ))
                }
            },
            _ => {
                return Err(SourceError::schema(
                    &path.display().to_string(),
                    "expected an array of documents or an object with `results`",
                ))
            }
        };

        let documents = raw_documents
            .into_iter()
            .map(Document::from_value)
            .collect::<Result<Vec<_>>>()?;
        tracing::debug!("Loaded {} documents from {:?}", documents.len(), path);
        Ok(Self::new(documents))
    }

    /// Number of requests served so far
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    fn page(&self, predicates: &[Predicate], page_size: usize, page: usize) -> ResultsPage {
        let page_size = page_size.max(1);
        let page = page.max(1);

        let matching: Vec<&Document> = self
            .documents
            .iter()
            .filter(|doc| predicates.iter().all(|p| p.matches(doc)))
            .collect();

        let total_results_size = matching.len();
        let total_pages = total_results_size.div_ceil(page_size);
        let results = matching
            .into_iter()
            .skip((page - 1) * page_size)
            .take(page_size)
            .cloned()
            .collect();

        let next_page = (page < total_pages).then(|| cursor(predicates, page_size, page + 1));

        ResultsPage {
            results,
            next_page,
            page,
            total_pages,
            total_results_size,
        }
    }
}

fn cursor(predicates: &[Predicate], page_size: usize, page: usize) -> String {
    let mut pairs = url::form_urlencoded::Serializer::new(String::new());
    for predicate in predicates {
        let Predicate::At { path, value } = predicate;
        pairs.append_pair("at", &format!("{}|{}", path, value));
    }
    pairs
        .append_pair("pageSize", &page_size.to_string())
        .append_pair("page", &page.to_string());
    format!("{}?{}", CURSOR_BASE, pairs.finish())
}

fn parse_cursor(cursor: &str) -> Result<(Vec<Predicate>, usize, usize)> {
    let url = Url::parse(cursor)?;
    if url.scheme() != "memory" {
        return Err(SourceError::UnknownCursor(cursor.to_string()));
    }

    let mut predicates = Vec::new();
    let mut page_size = None;
    let mut page = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "at" => {
                let (path, value) = value
                    .split_once('|')
                    .ok_or_else(|| SourceError::UnknownCursor(cursor.to_string()))?;
                predicates.push(Predicate::at(path, value));
            }
            "pageSize" => page_size = value.parse().ok(),
            "page" => page = value.parse().ok(),
            _ => {}
        }
    }

    match (page_size, page) {
        (Some(page_size), Some(page)) => Ok((predicates, page_size, page)),
        _ => Err(SourceError::UnknownCursor(cursor.to_string())),
    }
}

#[async_trait]
impl ContentClient for MemorySource {
    async fn query(&self, query: &Query) -> Result<ResultsPage> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        Ok(self.page(&query.predicates, query.page_size, query.page))
    }

    async fn get_by_uid(&self, document_type: &str, uid: &str) -> Result<Option<Document>> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .documents
            .iter()
            .find(|doc| doc.document_type == document_type && doc.uid == uid)
            .cloned())
    }

    async fn fetch_page(&self, cursor: &str) -> Result<ResultsPage> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let (predicates, page_size, page) = parse_cursor(cursor)?;
        Ok(self.page(&predicates, page_size, page))
    }
}
