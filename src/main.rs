//! # Stock News
//!
//! A small web application that shows the last 24 hours of stock and share
//! market news. Articles come from the NewsAPI.org search endpoint, are
//! filtered by keyword, and are rendered as an HTML page or JSON.
//!
//! ## Usage
//!
//! ```sh
//! NEWS_API_KEY=... stock_news --port 5000
//! NEWS_API_KEY=... stock_news --json-output-dir ./snapshots
//! ```
//!
//! ## Architecture
//!
//! Each request runs one pass of:
//! 1. **Fetch**: query the news API for the recency window ([`api`])
//! 2. **Filter**: normalize untrusted articles and keep keyword matches ([`pipeline`])
//! 3. **Render**: HTML page, JSON API or JSON snapshot ([`web`], [`outputs`])

use chrono::Utc;
use clap::Parser;
use std::error::Error;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod error;
mod models;
mod outputs;
mod pipeline;
mod service;
mod utils;
mod web;

use api::{NewsApiClient, RetryFetch};
use cli::Cli;
use config::Settings;
use outputs::html::PageRenderer;
use outputs::json;
use service::NewsService;
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "stock_news starting up");

    let args = Cli::parse();
    debug!(?args.config, ?args.json_output_dir, "Parsed CLI arguments");

    let settings = match Settings::resolve(&args) {
        Ok(settings) => settings,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };
    info!(
        keywords = settings.news.keywords.len(),
        window_hours = settings.news.window.num_hours(),
        page_size = settings.news.page_size,
        "Configuration loaded"
    );

    let client = NewsApiClient::new(settings.api_key.clone(), settings.api_url.clone(), settings.timeout)?;
    let source = RetryFetch::new(client, settings.max_retries, StdDuration::from_millis(500));
    let service = NewsService::new(Arc::new(source), settings.news.clone());

    // ---- One-shot snapshot ----
    if let Some(dir) = &args.json_output_dir {
        if let Err(e) = ensure_writable_dir(Path::new(dir)).await {
            error!(
                path = %dir,
                error = %e,
                "JSON output directory is not writable (fix perms or choose a different path)"
            );
            return Err(e);
        }
        let start_time = std::time::Instant::now();
        let page = service.load_page(Utc::now()).await;
        let path = json::write_snapshot(&page, dir).await?;
        info!(
            path = %path.display(),
            articles = page.articles.len(),
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "Snapshot complete"
        );
        if let Some(reason) = page.error {
            return Err(reason.into());
        }
        return Ok(());
    }

    // ---- Serve ----
    let pages = PageRenderer::new()?;
    web::serve(web::AppState { service, pages }, &args.bind_addr()).await?;
    info!("Server stopped");
    Ok(())
}
