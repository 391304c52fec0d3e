use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("unexpected status {0}")]
    BadStatus(reqwest::StatusCode),

    #[error("invalid price field: {0}")]
    InvalidPrice(String),

    #[error("invalid push url: {0}")]
    PushUrl(String),

    #[error("invalid config: {0}")]
    Config(String),
}

/// Every mirror failed for `symbol` during one fetch.
#[derive(Error, Debug)]
pub struct FetchFailure {
    pub symbol: String,
    /// `(mirror base, reason)` in the order the mirrors were tried.
    pub attempts: Vec<(String, String)>,
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no price for {}", self.symbol)?;
        if self.attempts.is_empty() {
            return write!(f, " (no mirrors configured)");
        }
        for (base, reason) in &self.attempts {
            write!(f, "; {}: {}", base, reason)?;
        }
        Ok(())
    }
}

#[derive(Error, Debug)]
#[error("push via {provider} failed: {source}")]
pub struct PushFailure {
    pub provider: &'static str,
    #[source]
    pub source: WatchError,
}
