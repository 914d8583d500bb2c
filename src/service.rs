//! Fetch-then-filter for one page request.
//!
//! [`NewsService`] computes the recency window, asks its [`NewsSource`] for
//! matching articles and runs the pipeline over the result. It holds no
//! mutable state, so one instance is shared by every request handler.

use crate::api::{NewsQuery, NewsSource};
use crate::error::FetchError;
use crate::models::{NewsPage, NormalizedArticle, RecencyWindow};
use crate::pipeline::{KeywordSet, articles_from_response, normalize_and_filter};
use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Arc;
use tracing::{error, info, instrument};

/// What to ask upstream for, and how to filter it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsSettings {
    pub keywords: KeywordSet,
    /// Length of the recency window ending "now".
    pub window: TimeDelta,
    pub page_size: u32,
}

impl Default for NewsSettings {
    fn default() -> Self {
        Self {
            keywords: KeywordSet::default(),
            window: TimeDelta::hours(24),
            page_size: 50,
        }
    }
}

pub struct NewsService {
    source: Arc<dyn NewsSource>,
    settings: NewsSettings,
}

impl NewsService {
    pub fn new(source: Arc<dyn NewsSource>, settings: NewsSettings) -> Self {
        Self { source, settings }
    }

    /// The recency window that ends at `now`.
    pub fn window_ending_at(&self, now: DateTime<Utc>) -> RecencyWindow {
        RecencyWindow::ending_at(now, self.settings.window)
    }

    /// Fetch articles published within `window` and keep the relevant ones.
    ///
    /// Upstream failures and a malformed `articles` value are returned as
    /// errors; malformed individual articles are skipped.
    #[instrument(level = "info", skip_all, fields(from = %window.start, to = %window.end))]
    pub async fn fetch_filtered_news(
        &self,
        window: &RecencyWindow,
    ) -> Result<Vec<NormalizedArticle>, FetchError> {
        let query = NewsQuery::new(&self.settings.keywords, window, self.settings.page_size);
        let body = self.source.search(&query).await?;
        let raw = articles_from_response(&body)?;
        let filtered = normalize_and_filter(raw, &self.settings.keywords, window);
        info!(raw = raw.len(), kept = filtered.len(), "Filtered news articles");
        Ok(filtered)
    }

    /// Build the page for a request made at `now`.
    ///
    /// Never fails: an upstream error becomes an empty page carrying a short
    /// message for the reader.
    pub async fn load_page(&self, now: DateTime<Utc>) -> NewsPage {
        let window = self.window_ending_at(now);
        match self.fetch_filtered_news(&window).await {
            Ok(articles) => NewsPage::new(now, window, articles),
            Err(e) => {
                error!(error = %e, "Fetching news failed; rendering unavailable page");
                NewsPage::unavailable(now, window, e.user_message())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use reqwest::StatusCode;
    use serde_json::{Value, json};
    use std::sync::Mutex;

    /// Answers every search with the same body or status, recording queries.
    struct Canned {
        reply: Result<Value, u16>,
        seen: Mutex<Vec<NewsQuery>>,
    }

    impl Canned {
        fn ok(body: Value) -> Arc<Self> {
            Arc::new(Self { reply: Ok(body), seen: Mutex::new(Vec::new()) })
        }

        fn status(code: u16) -> Arc<Self> {
            Arc::new(Self { reply: Err(code), seen: Mutex::new(Vec::new()) })
        }
    }

    #[async_trait]
    impl NewsSource for Canned {
        async fn search(&self, query: &NewsQuery) -> Result<Value, FetchError> {
            self.seen.lock().unwrap().push(query.clone());
            match &self.reply {
                Ok(body) => Ok(body.clone()),
                Err(code) => Err(FetchError::Status {
                    status: StatusCode::from_u16(*code).unwrap(),
                    code: None,
                    message: None,
                }),
            }
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 19, 12, 0, 0).unwrap()
    }

    fn service(source: Arc<Canned>) -> NewsService {
        NewsService::new(source, NewsSettings::default())
    }

    #[tokio::test]
    async fn test_load_page_filters_articles() {
        let source = Canned::ok(json!({
            "status": "ok",
            "articles": [
                {
                    "title": "Stock Market Rises",
                    "description": "Stocks are up today",
                    "publishedAt": "2026-01-19T10:00:00Z",
                    "source": {"name": "Financial Times"},
                    "url": "https://example.com/news1"
                },
                {
                    "title": "Weather Update",
                    "description": "Sunny day ahead",
                    "publishedAt": "2026-01-19T09:00:00Z",
                    "source": {"name": "Weather News"},
                    "url": "https://example.com/news2"
                }
            ]
        }));
        let page = service(source.clone()).load_page(now()).await;

        assert!(!page.is_unavailable());
        assert_eq!(page.articles.len(), 1);
        assert_eq!(page.articles[0].source.as_deref(), Some("Financial Times"));
        assert_eq!(page.window_end, now());
        assert_eq!(page.window_start, now() - TimeDelta::hours(24));

        let seen = source.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].from, "2026-01-18T12:00:00Z");
        assert!(seen[0].q.contains("stock"));
    }

    #[tokio::test]
    async fn test_load_page_handles_missing_articles_key() {
        let page = service(Canned::ok(json!({"status": "ok"}))).load_page(now()).await;
        assert!(!page.is_unavailable());
        assert!(page.articles.is_empty());
    }

    #[tokio::test]
    async fn test_load_page_reports_malformed_articles_field() {
        let source = Canned::ok(json!({"status": "ok", "articles": "not a list"}));
        let page = service(source).load_page(now()).await;
        assert!(page.is_unavailable());
        assert!(page.articles.is_empty());
        assert_eq!(
            page.error.as_deref(),
            Some("News is currently unavailable. Please try again later.")
        );
    }

    #[tokio::test]
    async fn test_load_page_null_source_and_missing_name() {
        let source = Canned::ok(json!({
            "articles": [
                {"title": "Stock Market Update", "source": null},
                {"title": "Earnings Report for stocks", "source": {"id": "business-wire"}}
            ]
        }));
        let page = service(source).load_page(now()).await;
        assert_eq!(page.articles.len(), 2);
        assert!(page.articles.iter().all(|a| a.source.is_none()));
    }

    #[tokio::test]
    async fn test_load_page_degrades_upstream_errors() {
        for code in [401u16, 429, 500] {
            let page = service(Canned::status(code)).load_page(now()).await;
            assert!(page.is_unavailable(), "status {code}");
            assert!(page.articles.is_empty());
            assert!(page.error.as_deref().unwrap().starts_with("News"));
        }
    }

    #[tokio::test]
    async fn test_fetch_filtered_news_propagates_errors() {
        let svc = service(Canned::status(401));
        let window = svc.window_ending_at(now());
        let err = svc.fetch_filtered_news(&window).await.unwrap_err();
        assert!(err.is_unauthorized());
    }

    #[tokio::test]
    async fn test_custom_window_and_page_size() {
        let source = Canned::ok(json!({"articles": []}));
        let settings = NewsSettings {
            keywords: KeywordSet::new(["nifty"]),
            window: TimeDelta::hours(6),
            page_size: 20,
        };
        let svc = NewsService::new(source.clone(), settings);
        svc.load_page(now()).await;

        let seen = source.seen.lock().unwrap();
        assert_eq!(seen[0].from, "2026-01-19T06:00:00Z");
        assert_eq!(seen[0].page_size, 20);
        assert_eq!(seen[0].q, "nifty");
    }
}
