//! Error types for the upstream fetch and for startup configuration.
//!
//! Malformed article entries never show up here: the pipeline recovers from
//! them locally. These enums only cover failures the caller must see.

use reqwest::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

/// Failure talking to the upstream news search API.
///
/// Each variant is a distinct signal so the caller can tell an expired
/// credential from a rate limit or a network outage.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request to the news API timed out: {0}")]
    Timeout(#[source] reqwest::Error),

    #[error("transport error talking to the news API: {0}")]
    Transport(#[source] reqwest::Error),

    #[error(
        "news API responded with HTTP {status}{}",
        .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default()
    )]
    Status {
        status: StatusCode,
        code: Option<String>,
        message: Option<String>,
    },

    #[error("news API reported an error ({code}): {message}")]
    Api { code: String, message: String },

    #[error("news API returned invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("news API returned an unexpected body: {0}")]
    UnexpectedBody(&'static str),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout(e)
        } else {
            FetchError::Transport(e)
        }
    }
}

impl FetchError {
    /// Whether a retry has a reasonable chance of succeeding.
    ///
    /// Timeouts, transport failures and 5xx responses are transient. Auth
    /// failures, rate limits and bad bodies are not.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Timeout(_) | FetchError::Transport(_) => true,
            FetchError::Status { status, .. } => status.is_server_error(),
            _ => false,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, FetchError::Status { status, .. } if *status == StatusCode::UNAUTHORIZED)
            || matches!(self, FetchError::Api { code, .. } if code.starts_with("apiKey"))
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, FetchError::Status { status, .. } if *status == StatusCode::TOO_MANY_REQUESTS)
            || matches!(self, FetchError::Api { code, .. } if code == "rateLimited")
    }

    /// One short line suitable for showing to a reader of the news page.
    pub fn user_message(&self) -> &'static str {
        if self.is_unauthorized() {
            "News is unavailable: the news service rejected our API credentials."
        } else if self.is_rate_limited() {
            "News is unavailable: the news service rate limit was reached. Try again later."
        } else if matches!(self, FetchError::Timeout(_)) {
            "News is unavailable: the news service did not respond in time."
        } else {
            "News is currently unavailable. Please try again later."
        }
    }
}

/// Fatal problems detected while resolving settings at startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("NEWS_API_KEY environment variable not set (or pass --news-api-key)")]
    MissingApiKey,

    #[error("page size must be between 1 and 100, got {0}")]
    InvalidPageSize(u32),

    #[error("recency window must be between 1 and 720 hours, got {0}")]
    InvalidWindow(u32),

    #[error("keyword set is empty; configure at least one keyword")]
    EmptyKeywords,

    #[error("invalid news API URL {url:?}: {source}")]
    InvalidApiUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("could not read config file {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse config file {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}
