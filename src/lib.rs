//! cms-blog: a static blog front-end for a headless CMS
//!
//! This crate pulls posts from a Prismic-style content repository (or a
//! JSON dump of one), and renders a "load more" listing plus one page per
//! article with Tera templates embedded in the binary.

pub mod article;
pub mod commands;
pub mod config;
pub mod content;
pub mod generator;
pub mod helpers;
pub mod i18n;
pub mod listing;
pub mod server;
pub mod source;
pub mod templates;

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::i18n::I18n;
use crate::source::ContentClient;
use crate::templates::TemplateRenderer;

/// The main blog application
#[derive(Debug, Clone)]
pub struct Blog {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: PathBuf,
    /// Public (output) directory
    pub public_dir: PathBuf,
    /// Static assets copied verbatim into the public directory
    pub static_dir: PathBuf,
}

impl Blog {
    /// Create a new blog from a directory, reading `_config.yml` if present
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = base_dir.join("_config.yml");

        let mut config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            tracing::debug!("No _config.yml in {:?}, using defaults", base_dir);
            config::SiteConfig::default()
        };
        config.apply_env();

        Self::with_config(base_dir, config)
    }

    /// Create a blog from an already-built configuration
    pub fn with_config<P: AsRef<Path>>(base_dir: P, config: config::SiteConfig) -> Result<Self> {
        config.validate()?;

        let base_dir = base_dir.as_ref().to_path_buf();
        let public_dir = base_dir.join(&config.public_dir);
        let static_dir = base_dir.join(&config.static_dir);

        Ok(Self {
            config,
            base_dir,
            public_dir,
            static_dir,
        })
    }

    /// Connect to the configured content source
    pub fn client(&self) -> Result<Arc<dyn ContentClient>> {
        Ok(source::connect(&self.config.source, &self.base_dir)?)
    }

    /// UI strings for the site language, with overrides from `languages/`
    pub fn i18n(&self) -> Result<I18n> {
        let mut i18n = I18n::new(&self.config.language);
        i18n.load_languages(self.base_dir.join("languages"))?;
        Ok(i18n)
    }

    /// Template renderer for this site
    pub fn templates(&self) -> Result<TemplateRenderer> {
        TemplateRenderer::new(&self.config, self.i18n()?)
    }

    /// Generate the static site
    pub async fn generate(&self) -> Result<()> {
        commands::generate::run(self).await
    }

    /// Clean the public directory
    pub fn clean(&self) -> Result<()> {
        commands::clean::run(self)
    }
}
