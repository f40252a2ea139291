use reqwest::StatusCode;
use thiserror::Error;

/// Notice shown to the user when a crawl fails for a reason we don't surface verbatim.
pub const GENERIC_FAILURE: &str = "Failed to crawl website";

/// Error type for a single crawl submission
#[derive(Debug, Error)]
pub enum CrawlError {
    /// Target URL could not be parsed or uses an unsupported scheme
    #[error("invalid url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Transport level failure talking to the crawl service
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The crawl service did not answer within the configured timeout
    #[error("crawl service timed out")]
    Timeout,

    /// Non-2xx answer from the crawl service
    #[error("crawl service returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// Response body was not the JSON shape we expect
    #[error("could not decode crawl response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The service answered but reported `success: false`
    #[error("crawl service reported failure: {}", .message.as_deref().unwrap_or("no message"))]
    Remote { message: Option<String> },
}

impl CrawlError {
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            CrawlError::Timeout
        } else {
            CrawlError::Http(err)
        }
    }

    /// The notice the form displays for this failure.
    ///
    /// Only a message the remote service chose to report is passed through;
    /// everything else collapses to [`GENERIC_FAILURE`].
    pub fn user_message(&self) -> String {
        match self {
            CrawlError::Remote {
                message: Some(message),
            } if !message.trim().is_empty() => message.clone(),
            CrawlError::InvalidUrl { url, .. } => format!("Invalid URL: {url}"),
            _ => GENERIC_FAILURE.to_string(),
        }
    }
}

/// Error type for loading configuration from the environment
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}
