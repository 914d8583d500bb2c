//! Data models for filtered news and the page that displays it.
//!
//! - [`NormalizedArticle`]: display-safe record produced by the pipeline
//! - [`RecencyWindow`]: the time range the upstream query is restricted to
//! - [`NewsPage`]: what the web layer and the JSON snapshot render
//!
//! Raw upstream articles are kept as [`serde_json::Value`] and never get a
//! struct of their own, so no shape is rejected before the pipeline sees it.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Timestamp format the news API expects for its `from` and `to` parameters.
pub const UPSTREAM_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// A sanitized article ready for display.
///
/// Serializes with exactly five keys. A field that was absent, null or of
/// the wrong type upstream is `None` (JSON `null`) here.
///
/// The values are raw text; escaping is up to whoever renders them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct NormalizedArticle {
    /// Headline.
    pub title: Option<String>,
    /// ISO-8601 publication timestamp as reported upstream (`publishedAt`).
    pub date: Option<String>,
    /// Publisher name taken from `source.name`.
    pub source: Option<String>,
    /// Short summary.
    pub description: Option<String>,
    /// Link to the full story.
    pub url: Option<String>,
}

/// The `[start, end]` range of publication times requested from upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct RecencyWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl RecencyWindow {
    /// The window of `length` that ends at `end`.
    ///
    /// A length reaching past the earliest representable instant is clamped
    /// to it.
    pub fn ending_at(end: DateTime<Utc>, length: TimeDelta) -> Self {
        Self {
            start: end.checked_sub_signed(length).unwrap_or(DateTime::<Utc>::MIN_UTC),
            end,
        }
    }

    /// Value for the upstream `from` query parameter.
    pub fn from_param(&self) -> String {
        self.start.format(UPSTREAM_TIME_FORMAT).to_string()
    }

    /// Value for the upstream `to` query parameter.
    pub fn to_param(&self) -> String {
        self.end.format(UPSTREAM_TIME_FORMAT).to_string()
    }
}

/// Everything needed to render one view of the news.
///
/// When the upstream fetch fails, `articles` is empty and `error` holds a
/// short explanation for the reader.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct NewsPage {
    pub generated_at: DateTime<Utc>,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub articles: Vec<NormalizedArticle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl NewsPage {
    pub fn new(generated_at: DateTime<Utc>, window: RecencyWindow, articles: Vec<NormalizedArticle>) -> Self {
        Self {
            generated_at,
            window_start: window.start,
            window_end: window.end,
            articles,
            error: None,
        }
    }

    /// A page with no articles and a message explaining why.
    pub fn unavailable(generated_at: DateTime<Utc>, window: RecencyWindow, message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::new(generated_at, window, Vec::new())
        }
    }

    pub fn is_unavailable(&self) -> bool {
        self.error.is_some()
    }
}
