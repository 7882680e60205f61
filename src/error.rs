use thiserror::Error;

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("network error: {0}")]
    Network(String),

    #[error("image decode failed: {0}")]
    Decode(String),

    #[error("no large image result was found")]
    NoLargeImageFound,

    #[error("search service answered with an anti-automation challenge")]
    Blocked,

    #[error("candidate download failed for {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl LookupError {
    /// Only a captcha wall stops the whole run; everything else is scoped to one file.
    pub fn is_run_fatal(&self) -> bool {
        matches!(self, LookupError::Blocked)
    }
}

impl From<image::ImageError> for LookupError {
    fn from(err: image::ImageError) -> Self {
        LookupError::Decode(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LookupError>;
