//! News API client with exponential backoff retry logic.
//!
//! This module talks to the NewsAPI.org `everything` search endpoint.
//!
//! # Architecture
//!
//! - [`NewsSource`]: the async seam the rest of the crate fetches through
//! - [`NewsApiClient`]: the real HTTP client
//! - [`RetryFetch`]: decorator that retries transient failures of any [`NewsSource`]
//!
//! # Failure Signals
//!
//! Every failure comes back as a distinct [`FetchError`] variant: timeout,
//! transport, non-2xx status (with the API's error code when it sent one),
//! an in-body API error, or an unparseable body. Nothing is swallowed here;
//! degrading to an empty page is the caller's decision.

use crate::error::FetchError;
use crate::models::RecencyWindow;
use crate::pipeline::KeywordSet;
use crate::utils::{looks_truncated, truncate_for_log};
use async_trait::async_trait;
use itertools::Itertools;
use rand::{Rng, rng};
use serde_json::Value;
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, instrument, warn};
use url::Url;

/// Default endpoint for article search.
pub const NEWS_API_URL: &str = "https://newsapi.org/v2/everything";

/// Header carrying the credential. Keeps the key out of URLs and access logs.
const API_KEY_HEADER: &str = "X-Api-Key";

/// Parameters of one article search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsQuery {
    /// Free-text query; keywords joined with `OR`.
    pub q: String,
    /// Lower bound of the recency window.
    pub from: String,
    /// Upper bound of the recency window.
    pub to: String,
    pub sort_by: &'static str,
    pub language: &'static str,
    pub page_size: u32,
}

impl NewsQuery {
    /// Search for any of `keywords`, newest first, within `window`.
    pub fn new(keywords: &KeywordSet, window: &RecencyWindow, page_size: u32) -> Self {
        Self {
            q: query_text(keywords),
            from: window.from_param(),
            to: window.to_param(),
            sort_by: "publishedAt",
            language: "en",
            page_size,
        }
    }

    /// Query-string pairs in the form the API expects.
    pub fn params(&self) -> [(&'static str, String); 6] {
        [
            ("q", self.q.clone()),
            ("from", self.from.clone()),
            ("to", self.to.clone()),
            ("sortBy", self.sort_by.to_string()),
            ("language", self.language.to_string()),
            ("pageSize", self.page_size.to_string()),
        ]
    }
}

/// `stock OR "share market" OR …`: multi-word keywords are quoted so the
/// API matches them as phrases.
fn query_text(keywords: &KeywordSet) -> String {
    keywords
        .iter()
        .map(|kw| {
            if kw.contains(char::is_whitespace) {
                format!("\"{kw}\"")
            } else {
                kw.to_string()
            }
        })
        .join(" OR ")
}

/// Anything that can answer an article search with the raw response body.
///
/// The returned value is the whole top-level JSON object; pulling out the
/// `articles` array is left to the pipeline.
#[async_trait]
pub trait NewsSource: Send + Sync {
    async fn search(&self, query: &NewsQuery) -> Result<Value, FetchError>;
}

/// HTTP client for the news search API.
#[derive(Clone)]
pub struct NewsApiClient {
    http: reqwest::Client,
    endpoint: Url,
    api_key: String,
}

impl NewsApiClient {
    /// Build a client whose every request is bounded by `timeout`.
    pub fn new(api_key: impl Into<String>, endpoint: Url, timeout: StdDuration) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            endpoint,
            api_key: api_key.into(),
        })
    }
}

impl fmt::Debug for NewsApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewsApiClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl NewsSource for NewsApiClient {
    #[instrument(level = "info", skip_all, fields(from = %query.from, to = %query.to))]
    async fn search(&self, query: &NewsQuery) -> Result<Value, FetchError> {
        let t0 = Instant::now();
        let response = self
            .http
            .get(self.endpoint.clone())
            .header(API_KEY_HEADER, &self.api_key)
            .query(&query.params())
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        debug!(
            endpoint = %self.endpoint,
            %status,
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "News API responded"
        );

        if !status.is_success() {
            let (code, message) = error_details(&body);
            warn!(
                %status,
                code = code.as_deref().unwrap_or("-"),
                body_preview = %truncate_for_log(&body, 300),
                "News API returned a non-success status"
            );
            return Err(FetchError::Status { status, code, message });
        }

        parse_body(&body)
    }
}

/// Parse a 2xx response body, turning in-body API errors into [`FetchError::Api`].
fn parse_body(body: &str) -> Result<Value, FetchError> {
    let value: Value = serde_json::from_str(body).map_err(|e| {
        if looks_truncated(&e) {
            warn!(bytes = body.len(), "News API body ended early; response looks truncated");
        } else {
            warn!(error = %e, body_preview = %truncate_for_log(body, 300), "News API body is not JSON");
        }
        FetchError::from(e)
    })?;

    let Some(object) = value.as_object() else {
        return Err(FetchError::UnexpectedBody("top-level JSON is not an object"));
    };

    if object.get("status").and_then(Value::as_str) == Some("error") {
        let code = object
            .get("code")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        let message = object
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        return Err(FetchError::Api { code, message });
    }

    Ok(value)
}

/// `code` and `message` from a NewsAPI error body, when it has them.
fn error_details(body: &str) -> (Option<String>, Option<String>) {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return (None, None);
    };
    let field = |name: &str| value.get(name).and_then(Value::as_str).map(str::to_owned);
    (field("code"), field("message"))
}

/// Wrapper that adds exponential backoff retry logic to any [`NewsSource`].
///
/// Only transient failures (see [`FetchError::is_transient`]) are retried.
/// A 401 or 429 comes back on the first attempt so the caller sees it
/// without delay and without spending more quota.
///
/// # Backoff Strategy
///
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryFetch<T> {
    /// The underlying source to wrap.
    inner: T,
    /// Retries after the first attempt.
    max_retries: usize,
    /// Initial delay between retries (doubles with each attempt).
    base_delay: StdDuration,
    /// Upper bound on a single delay, before jitter.
    max_delay: StdDuration,
}

impl<T> RetryFetch<T>
where
    T: NewsSource,
{
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(5),
        }
    }

    pub fn with_max_delay(mut self, max_delay: StdDuration) -> Self {
        self.max_delay = max_delay;
        self
    }

    fn delay_for(&self, attempt: usize) -> StdDuration {
        let exp = u32::try_from(attempt.saturating_sub(1)).unwrap_or(u32::MAX).min(16);
        let delay = self.base_delay.saturating_mul(1 << exp).min(self.max_delay);
        let jitter_ms: u64 = rng().random_range(0..=250);
        delay + StdDuration::from_millis(jitter_ms)
    }
}

impl<T> fmt::Debug for RetryFetch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryFetch")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

#[async_trait]
impl<T> NewsSource for RetryFetch<T>
where
    T: NewsSource,
{
    #[instrument(level = "info", skip_all)]
    async fn search(&self, query: &NewsQuery) -> Result<Value, FetchError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.search(query).await {
                Ok(body) => return Ok(body),
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                            elapsed_ms_total = total_dt.as_millis() as u64,
                            error = %e,
                            "search() exhausted retries"
                        );
                        return Err(e);
                    }

                    let delay = self.delay_for(attempt);
                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                        elapsed_ms_total = total_dt.as_millis() as u64,
                        ?delay,
                        error = %e,
                        "search() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone, Utc};
    use httpmock::prelude::*;
    use reqwest::StatusCode;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn window() -> RecencyWindow {
        let end = Utc.with_ymd_and_hms(2026, 1, 19, 12, 0, 0).unwrap();
        RecencyWindow::ending_at(end, TimeDelta::hours(24))
    }

    fn query() -> NewsQuery {
        NewsQuery::new(&KeywordSet::new(["stock", "share market"]), &window(), 50)
    }

    fn client(server: &MockServer, timeout: StdDuration) -> NewsApiClient {
        let endpoint = Url::parse(&server.url("/v2/everything")).unwrap();
        NewsApiClient::new("test_api_key", endpoint, timeout).unwrap()
    }

    fn status_error(code: u16) -> FetchError {
        FetchError::Status {
            status: StatusCode::from_u16(code).unwrap(),
            code: None,
            message: None,
        }
    }

    /// Replays canned results and counts calls.
    struct Scripted {
        results: Mutex<VecDeque<Result<Value, FetchError>>>,
        calls: Arc<AtomicUsize>,
    }

    impl Scripted {
        fn new(results: Vec<Result<Value, FetchError>>) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let scripted = Self {
                results: Mutex::new(results.into()),
                calls: Arc::clone(&calls),
            };
            (scripted, calls)
        }
    }

    #[async_trait]
    impl NewsSource for Scripted {
        async fn search(&self, _query: &NewsQuery) -> Result<Value, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(status_error(500)))
        }
    }

    #[test]
    fn test_query_text_quotes_phrases() {
        let set = KeywordSet::new(["stock", "share market", "sensex"]);
        assert_eq!(query_text(&set), "stock OR \"share market\" OR sensex");
    }

    #[test]
    fn test_query_params() {
        let params = query().params();
        assert_eq!(params[1], ("from", "2026-01-18T12:00:00Z".to_string()));
        assert_eq!(params[2], ("to", "2026-01-19T12:00:00Z".to_string()));
        assert_eq!(params[3], ("sortBy", "publishedAt".to_string()));
        assert_eq!(params[4], ("language", "en".to_string()));
        assert_eq!(params[5], ("pageSize", "50".to_string()));
    }

    #[test]
    fn test_debug_redacts_key() {
        let endpoint = Url::parse(NEWS_API_URL).unwrap();
        let client = NewsApiClient::new("super-secret", endpoint, StdDuration::from_secs(1)).unwrap();
        let shown = format!("{client:?}");
        assert!(!shown.contains("super-secret"));
        assert!(shown.contains("redacted"));
    }

    #[test]
    fn test_parse_body_shapes() {
        let ok = parse_body(r#"{"status":"ok","totalResults":0,"articles":[]}"#).unwrap();
        assert_eq!(ok["status"], "ok");

        assert!(matches!(parse_body("[1,2]"), Err(FetchError::UnexpectedBody(_))));
        assert!(matches!(parse_body("<html>"), Err(FetchError::InvalidJson(_))));

        let api = parse_body(r#"{"status":"error","code":"parameterInvalid","message":"bad from"}"#);
        match api {
            Err(FetchError::Api { code, message }) => {
                assert_eq!(code, "parameterInvalid");
                assert_eq!(message, "bad from");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_search_sends_params_and_key_header() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/v2/everything")
                    .header("x-api-key", "test_api_key")
                    .query_param_exists("q")
                    .query_param("from", "2026-01-18T12:00:00Z")
                    .query_param("sortBy", "publishedAt")
                    .query_param("language", "en")
                    .query_param("pageSize", "50");
                then.status(200).json_body(json!({
                    "status": "ok",
                    "totalResults": 1,
                    "articles": [{"title": "Stock Market Rises"}]
                }));
            })
            .await;

        let body = client(&server, StdDuration::from_secs(5))
            .search(&query())
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!(body["articles"][0]["title"], "Stock Market Rises");
    }

    #[tokio::test]
    async fn test_search_surfaces_distinct_statuses() {
        for code in [401u16, 429, 500] {
            let server = MockServer::start_async().await;
            server
                .mock_async(|when, then| {
                    when.method(GET).path("/v2/everything");
                    then.status(code).json_body(json!({
                        "status": "error",
                        "code": "someCode",
                        "message": "nope"
                    }));
                })
                .await;

            let err = client(&server, StdDuration::from_secs(5))
                .search(&query())
                .await
                .unwrap_err();
            match err {
                FetchError::Status { status, code: api_code, message } => {
                    assert_eq!(status.as_u16(), code);
                    assert_eq!(api_code.as_deref(), Some("someCode"));
                    assert_eq!(message.as_deref(), Some("nope"));
                }
                other => panic!("expected Status for {code}, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_search_invalid_json_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v2/everything");
                then.status(200).body("<html>maintenance</html>");
            })
            .await;

        let err = client(&server, StdDuration::from_secs(5))
            .search(&query())
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::InvalidJson(_)), "{err:?}");
    }

    #[tokio::test]
    async fn test_search_times_out() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v2/everything");
                then.status(200)
                    .delay(StdDuration::from_millis(1500))
                    .json_body(json!({"status": "ok", "articles": []}));
            })
            .await;

        let err = client(&server, StdDuration::from_millis(100))
            .search(&query())
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Timeout(_)), "{err:?}");
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_retry_recovers_from_server_error() {
        let (scripted, calls) = Scripted::new(vec![
            Err(status_error(503)),
            Ok(json!({"status": "ok", "articles": []})),
        ]);
        let retry = RetryFetch::new(scripted, 2, StdDuration::from_millis(1))
            .with_max_delay(StdDuration::from_millis(1));

        let body = retry.search(&query()).await.unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retry_does_not_retry_auth_or_rate_limit() {
        for code in [401u16, 429] {
            let (scripted, calls) = Scripted::new(vec![Err(status_error(code))]);
            let retry = RetryFetch::new(scripted, 3, StdDuration::from_millis(1));

            let err = retry.search(&query()).await.unwrap_err();
            assert!(matches!(err, FetchError::Status { status, .. } if status.as_u16() == code));
            assert_eq!(calls.load(Ordering::SeqCst), 1);
        }
    }

    #[tokio::test]
    async fn test_retry_gives_up_with_last_error() {
        let (scripted, calls) = Scripted::new(vec![
            Err(status_error(500)),
            Err(status_error(502)),
            Err(status_error(503)),
        ]);
        let retry = RetryFetch::new(scripted, 2, StdDuration::from_millis(1))
            .with_max_delay(StdDuration::from_millis(1));

        let err = retry.search(&query()).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status, .. } if status.as_u16() == 503));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
