//! News normalization and keyword filtering.
//!
//! Turns the untrusted `articles` array from the news API into
//! [`NormalizedArticle`]s. Every field read is type-checked first and falls
//! back to `None`, so no article shape can make filtering fail. Only a
//! response whose `articles` value is not an array is rejected.
//!
//! Everything here is pure: no I/O, no shared state. It is safe to call
//! from any number of request handlers at once.

use crate::error::FetchError;
use crate::models::{NormalizedArticle, RecencyWindow};
use itertools::Itertools;
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

/// Keywords that make an article relevant to the stock market.
pub const DEFAULT_KEYWORDS: [&str; 8] = [
    "stock",
    "stocks",
    "share market",
    "sensex",
    "nifty",
    "market",
    "earnings",
    "quarter results",
];

/// Article fields searched for keywords.
pub const SEARCH_FIELDS: [&str; 2] = ["title", "description"];

/// A set of lower-cased, non-blank keywords in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordSet {
    keywords: Vec<String>,
}

impl KeywordSet {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .unique()
            .collect();
        Self { keywords }
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keywords.iter().map(String::as_str)
    }
}

impl Default for KeywordSet {
    fn default() -> Self {
        Self::new(DEFAULT_KEYWORDS)
    }
}

/// Publisher name from an article's `source` value.
///
/// Only a mapping with a string `name` yields a value. Null, strings,
/// numbers and lists all give `None`.
pub fn extract_source_name(source: Option<&Value>) -> Option<String> {
    source
        .and_then(Value::as_object)
        .and_then(|s| s.get("name"))
        .and_then(Value::as_str)
        .map(str::to_owned)
}

/// Lower-cased text of the string-valued `fields` of `article`, space-joined.
///
/// Missing, null and non-string fields are skipped. A non-mapping article,
/// or one with no usable field, gives the empty string.
pub fn build_search_text(article: &Value, fields: &[&str]) -> String {
    let Some(article) = article.as_object() else {
        return String::new();
    };
    fields
        .iter()
        .filter_map(|field| string_field(article, field))
        .join(" ")
        .to_lowercase()
}

/// Whether any keyword occurs in `text`, ignoring case.
pub fn matches_keywords(text: &str, keywords: &KeywordSet) -> bool {
    if text.is_empty() {
        return false;
    }
    let text = text.to_lowercase();
    keywords.iter().any(|kw| text.contains(kw))
}

/// The `articles` array of a news API response body.
///
/// A missing key means no articles. Any other value under `articles`,
/// `null` included, is a malformed response.
pub fn articles_from_response(body: &Value) -> Result<&[Value], FetchError> {
    match body.get("articles") {
        None => Ok(&[]),
        Some(Value::Array(articles)) => Ok(articles),
        Some(other) => {
            warn!(kind = json_kind(other), "News API `articles` field is not an array");
            Err(FetchError::UnexpectedBody("`articles` is not an array"))
        }
    }
}

/// Keep the articles that mention a keyword, normalized, in upstream order.
///
/// Entries that are not mappings are dropped. Publication times are not
/// checked against `window`; the upstream query already restricts them to it.
#[instrument(
    level = "debug",
    skip_all,
    fields(raw = raw_articles.len(), from = %window.start, to = %window.end)
)]
pub fn normalize_and_filter(
    raw_articles: &[Value],
    keywords: &KeywordSet,
    window: &RecencyWindow,
) -> Vec<NormalizedArticle> {
    let mut filtered = Vec::new();
    for (index, raw) in raw_articles.iter().enumerate() {
        let Some(article) = raw.as_object() else {
            debug!(index, kind = json_kind(raw), "Skipping non-object article entry");
            continue;
        };
        let text = build_search_text(raw, &SEARCH_FIELDS);
        if !matches_keywords(&text, keywords) {
            continue;
        }
        filtered.push(normalize_article(article));
    }
    debug!(kept = filtered.len(), "Keyword filter applied");
    filtered
}

fn normalize_article(article: &Map<String, Value>) -> NormalizedArticle {
    NormalizedArticle {
        title: string_field(article, "title").map(str::to_owned),
        date: string_field(article, "publishedAt").map(str::to_owned),
        source: extract_source_name(article.get("source")),
        description: string_field(article, "description").map(str::to_owned),
        url: string_field(article, "url").map(str::to_owned),
    }
}

fn string_field<'a>(article: &'a Map<String, Value>, field: &str) -> Option<&'a str> {
    article.get(field).and_then(Value::as_str)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
