use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Browser unavailable: {0}")]
    BrowserUnavailable(String),

    #[error("Failed to load {url}: {reason}")]
    PageLoad { url: String, reason: String },

    #[error("Selector error: {0}")]
    Selector(String),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ScanError {
    pub fn page_load(url: impl Into<String>, reason: impl ToString) -> Self {
        ScanError::PageLoad {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
