//! Content source - the client side of the headless CMS
//!
//! [`ContentClient`] is the seam between the controllers and the remote
//! content repository. [`PrismicClient`] talks to the real API over HTTP,
//! [`MemorySource`] serves a JSON dump with the same paging semantics.

mod error;
mod memory;
mod prismic;
mod query;

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub use error::{Result, SourceError};
pub use memory::MemorySource;
pub use prismic::PrismicClient;
pub use query::{Predicate, Query, ResultsPage};

use crate::config::{SourceConfig, SourceKind, ENDPOINT_ENV};
use crate::content::Document;

#[cfg(test)]
pub(crate) use memory::tests::{post as test_post, posts as test_posts};

/// Read access to a content repository
#[async_trait]
pub trait ContentClient: Send + Sync {
    /// Run a structured query and return the requested page
    async fn query(&self, query: &Query) -> Result<ResultsPage>;

    /// Fetch a single document by type and uid; `None` when it does not exist
    async fn get_by_uid(&self, document_type: &str, uid: &str) -> Result<Option<Document>>;

    /// Follow an opaque `next_page` cursor
    async fn fetch_page(&self, cursor: &str) -> Result<ResultsPage>;
}

/// Build the client described by the site configuration
pub fn connect(config: &SourceConfig, base_dir: &Path) -> Result<Arc<dyn ContentClient>> {
    match config.kind {
        SourceKind::Prismic => {
            if config.endpoint.is_empty() {
                return Err(SourceError::NotConfigured(format!(
                    "set source.endpoint in _config.yml or {}",
                    ENDPOINT_ENV
                )));
            }
            tracing::info!("Using content API at {}", config.endpoint);
            let client =
                PrismicClient::new(&config.endpoint, Duration::from_secs(config.timeout_secs))?;
            Ok(Arc::new(client))
        }
        SourceKind::File => {
            let path = base_dir.join(&config.path);
            tracing::info!("Using content file {:?}", path);
            Ok(Arc::new(MemorySource::load(path)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_requires_endpoint() {
        let config = SourceConfig::default();
        let err = connect(&config, Path::new("."))
            .err()
            .expect("an endpoint is required");
        assert!(matches!(err, SourceError::NotConfigured(_)));
    }

    #[test]
    fn test_connect_file_source() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("content.json"), "[]").unwrap();
        let config = SourceConfig {
            kind: SourceKind::File,
            ..Default::default()
        };
        assert!(connect(&config, dir.path()).is_ok());
    }
}
