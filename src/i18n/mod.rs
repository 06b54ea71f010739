//! Internationalization (i18n) support
//!
//! English and Brazilian Portuguese ship with the binary; a site can add or
//! override languages with files under `<site>/languages/`.

use anyhow::{Context, Result};
use serde_yaml::Value;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Dotted key -> string, for one language
type Strings = HashMap<String, String>;

/// Languages compiled into the binary
const BUILTIN_LANGUAGES: &[(&str, &str)] = &[
    ("en", include_str!("languages/en.yml")),
    ("pt-BR", include_str!("languages/pt-BR.yml")),
];

const FALLBACK_LANGUAGE: &str = "en";

/// UI strings for the site language, falling back to English
#[derive(Debug, Clone)]
pub struct I18n {
    language: String,
    strings: HashMap<String, Strings>,
}

impl I18n {
    /// Create a handler for `language` with the built-in languages loaded
    pub fn new(language: &str) -> Self {
        let mut strings = HashMap::new();
        for (lang, source) in BUILTIN_LANGUAGES {
            match serde_yaml::from_str::<Value>(source) {
                Ok(value) => {
                    strings.insert(lang.to_string(), flatten(&value));
                }
                Err(e) => tracing::warn!("Built-in language {} is invalid: {}", lang, e),
            }
        }

        Self {
            language: language.to_string(),
            strings,
        }
    }

    /// Load `<lang>.yml`, `<lang>.yaml` or `<lang>.json` files from `dir`
    ///
    /// Keys in a file are merged over the built-in strings for that language.
    /// Files that fail to parse are skipped with a warning.
    pub fn load_languages<P: AsRef<Path>>(&mut self, dir: P) -> Result<()> {
        let dir = dir.as_ref();
        if !dir.exists() {
            return Ok(());
        }

        for entry in fs::read_dir(dir).with_context(|| format!("reading {:?}", dir))? {
            let path = entry?.path();
            let ext = path.extension().and_then(|e| e.to_str());
            if !path.is_file() || !matches!(ext, Some("yml" | "yaml" | "json")) {
                continue;
            }
            let Some(lang) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let content = fs::read_to_string(&path)?;
            let parsed = if ext == Some("json") {
                serde_json::from_str::<Value>(&content).map_err(anyhow::Error::from)
            } else {
                serde_yaml::from_str::<Value>(&content).map_err(anyhow::Error::from)
            };

            match parsed {
                Ok(value) => {
                    self.strings
                        .entry(lang.to_string())
                        .or_default()
                        .extend(flatten(&value));
                    tracing::debug!("Loaded language file: {:?}", path);
                }
                Err(e) => tracing::warn!("Failed to parse language file {:?}: {}", path, e),
            }
        }

        Ok(())
    }

    /// Get a translation by dotted key, like "not_found.title"
    pub fn get(&self, key: &str) -> String {
        self.get_for_lang(&self.language, key)
    }

    /// Get a translation for a specific language
    ///
    /// Unknown keys fall back to English, then to the key itself.
    pub fn get_for_lang(&self, lang: &str, key: &str) -> String {
        [lang, FALLBACK_LANGUAGE]
            .iter()
            .find_map(|lang| self.strings.get(*lang).and_then(|s| s.get(key)))
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }

    /// Get a translation with `%d` replaced by `count`
    pub fn get_count(&self, key: &str, count: impl std::fmt::Display) -> String {
        self.get(key).replace("%d", &count.to_string())
    }

    /// Every string of the current language, English filling the gaps
    pub fn get_all_translations(&self) -> HashMap<String, String> {
        let mut result = self
            .strings
            .get(FALLBACK_LANGUAGE)
            .cloned()
            .unwrap_or_default();
        if let Some(strings) = self.strings.get(&self.language) {
            result.extend(strings.clone());
        }
        result
    }
}

impl Default for I18n {
    fn default() -> Self {
        Self::new(FALLBACK_LANGUAGE)
    }
}

/// Flatten nested mappings into dotted keys; only string leaves are kept
fn flatten(value: &Value) -> Strings {
    fn walk(value: &Value, prefix: &str, out: &mut Strings) {
        match value {
            Value::String(s) => {
                out.insert(prefix.to_string(), s.clone());
            }
            Value::Mapping(map) => {
                for (key, value) in map {
                    let Some(key) = key.as_str() else { continue };
                    let full_key = if prefix.is_empty() {
                        key.to_string()
                    } else {
                        format!("{}.{}", prefix, key)
                    };
                    walk(value, &full_key, out);
                }
            }
            _ => {}
        }
    }

    let mut out = Strings::new();
    walk(value, "", &mut out);
    out
}
