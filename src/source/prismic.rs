//! HTTP client for a Prismic-compatible content API

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::OnceCell;
use url::Url;

use super::error::{Result, SourceError};
use super::query::{Predicate, Query, ResultsPage};
use super::ContentClient;
use crate::content::Document;

/// Content client backed by the Prismic REST API (v2)
pub struct PrismicClient {
    http: Client,
    endpoint: Url,
    master_ref: OnceCell<String>,
}

impl std::fmt::Debug for PrismicClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrismicClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("master_ref", &self.master_ref.get())
            .finish()
    }
}

#[derive(Deserialize)]
struct ApiDescriptor {
    #[serde(default)]
    refs: Vec<ApiRef>,
}

#[derive(Deserialize)]
struct ApiRef {
    #[serde(rename = "ref")]
    reference: String,
    #[serde(rename = "isMasterRef", default)]
    is_master_ref: bool,
}

impl PrismicClient {
    /// Create a client for an API entry point such as
    /// `https://my-repo.cdn.prismic.io/api/v2`
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let endpoint = Url::parse(endpoint)?;
        if endpoint.cannot_be_a_base() {
            return Err(SourceError::InvalidUrl(endpoint.to_string()));
        }

        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("cms-blog/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            endpoint,
            master_ref: OnceCell::new(),
        })
    }

    /// The ref of the published content, fetched once per client
    async fn master_ref(&self) -> Result<&str> {
        let reference = self
            .master_ref
            .get_or_try_init(|| async {
                let api: ApiDescriptor = serde_json::from_value(
                    self.get_json(self.endpoint.clone()).await?,
                )
                .map_err(|e| SourceError::schema("API descriptor", e.to_string()))?;

                let reference = api
                    .refs
                    .into_iter()
                    .find(|r| r.is_master_ref)
                    .map(|r| r.reference)
                    .ok_or(SourceError::NoMasterRef)?;
                tracing::debug!("Using master ref {}", reference);
                Ok::<_, SourceError>(reference)
            })
            .await?;
        Ok(reference.as_str())
    }

    fn search_url(&self, query: &Query, reference: &str) -> Result<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| SourceError::InvalidUrl(self.endpoint.to_string()))?
            .pop_if_empty()
            .extend(["documents", "search"]);

        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("ref", reference)
                .append_pair("q", &query.predicate_string())
                .append_pair("pageSize", &query.page_size.to_string())
                .append_pair("page", &query.page.to_string());
            if !query.fetch.is_empty() {
                pairs.append_pair("fetch", &query.fetch.join(","));
            }
        }

        Ok(url)
    }

    async fn get_json(&self, url: Url) -> Result<serde_json::Value> {
        tracing::debug!("GET {}", url);
        let response = self.http.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.json::<serde_json::Value>().await?)
    }
}

#[async_trait]
impl ContentClient for PrismicClient {
    async fn query(&self, query: &Query) -> Result<ResultsPage> {
        let reference = self.master_ref().await?;
        let url = self.search_url(query, reference)?;
        ResultsPage::from_value(self.get_json(url).await?)
    }

    async fn get_by_uid(&self, document_type: &str, uid: &str) -> Result<Option<Document>> {
        let query = Query::default()
            .predicate(Predicate::at(format!("my.{}.uid", document_type), uid))
            .page_size(1);
        let page = self.query(&query).await?;
        Ok(page.results.into_iter().next())
    }

    async fn fetch_page(&self, cursor: &str) -> Result<ResultsPage> {
        let url = Url::parse(cursor)?;
        ResultsPage::from_value(self.get_json(url).await?)
    }
}
