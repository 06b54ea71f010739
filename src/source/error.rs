use thiserror::Error;

/// Errors raised while talking to the content source
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("Schema mismatch in {context}: {message}")]
    Schema { context: String, message: String },

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Content API did not report a master ref")]
    NoMasterRef,

    #[error("Unknown cursor: {0}")]
    UnknownCursor(String),

    #[error("Content source is not configured: {0}")]
    NotConfigured(String),
}

impl SourceError {
    pub fn schema(context: &str, message: impl Into<String>) -> Self {
        Self::Schema {
            context: context.to_string(),
            message: message.into(),
        }
    }
}

impl From<url::ParseError> for SourceError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidUrl(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SourceError>;
