//! Site configuration (_config.yml)

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Environment variable that overrides `source.endpoint`
pub const ENDPOINT_ENV: &str = "PRISMIC_API_ENDPOINT";

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub description: String,
    pub logo: String,
    pub language: String,
    pub timezone: String,

    // URL
    pub url: String,
    pub root: String,
    pub post_dir: String,

    // Directory
    pub public_dir: String,
    pub static_dir: String,

    // Date / Time format
    pub date_format: String,

    // Listing
    pub per_page: usize,

    // Article
    pub words_per_minute: usize,

    // Content source
    #[serde(default)]
    pub source: SourceConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "Blog".to_string(),
            description: String::new(),
            logo: "/Logo.svg".to_string(),
            language: "en".to_string(),
            timezone: String::new(),

            url: "http://localhost:4000".to_string(),
            root: "/".to_string(),
            post_dir: "post".to_string(),

            public_dir: "public".to_string(),
            static_dir: "static".to_string(),

            date_format: "DD MMM YYYY".to_string(),

            per_page: 1,
            words_per_minute: 200,

            source: SourceConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content =
            fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
        let config: SiteConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {:?}", path))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the controllers cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.per_page == 0 {
            bail!("per_page must be at least 1");
        }
        if self.words_per_minute == 0 {
            bail!("words_per_minute must be at least 1");
        }
        if self.post_dir.trim_matches('/').is_empty() {
            bail!("post_dir must not be empty");
        }
        if !self.timezone.is_empty() && self.timezone.parse::<chrono_tz::Tz>().is_err() {
            bail!("Unknown timezone: {}", self.timezone);
        }
        Ok(())
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) {
        if let Ok(endpoint) = std::env::var(ENDPOINT_ENV) {
            if !endpoint.is_empty() {
                tracing::debug!("Using {} from environment", ENDPOINT_ENV);
                self.source.endpoint = endpoint;
            }
        }
    }
}

/// Which backend the content client talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Prismic-compatible HTTP API
    Prismic,
    /// JSON dump of documents on disk
    File,
}

/// Content source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub kind: SourceKind,
    /// API entry point, e.g. `https://my-repo.cdn.prismic.io/api/v2`
    pub endpoint: String,
    /// Path of the JSON dump when `kind` is `file`
    pub path: String,
    pub document_type: String,
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::Prismic,
            endpoint: String::new(),
            path: "content.json".to_string(),
            document_type: "post".to_string(),
            timeout_secs: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SiteConfig::default();
        assert_eq!(config.per_page, 1);
        assert_eq!(config.words_per_minute, 200);
        assert_eq!(config.post_dir, "post");
        assert_eq!(config.source.document_type, "post");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_partial_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("_config.yml");
        fs::write(
            &path,
            "title: Space Traveling\nlanguage: pt-BR\ntimezone: America/Sao_Paulo\nsource:\n  kind: file\n  path: posts.json\n",
        )
        .unwrap();

        let config = SiteConfig::load(&path).unwrap();
        assert_eq!(config.title, "Space Traveling");
        assert_eq!(config.language, "pt-BR");
        assert_eq!(config.source.kind, SourceKind::File);
        assert_eq!(config.source.path, "posts.json");
        assert_eq!(config.source.document_type, "post");
        assert_eq!(config.per_page, 1);
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let mut config = SiteConfig::default();
        config.per_page = 0;
        assert!(config.validate().is_err());

        let mut config = SiteConfig::default();
        config.words_per_minute = 0;
        assert!(config.validate().is_err());

        let mut config = SiteConfig::default();
        config.timezone = "Mars/Olympus_Mons".to_string();
        assert!(config.validate().is_err());
    }
}
