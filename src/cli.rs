//! Command-line interface definitions for Stock News.
//!
//! Every option can also come from an environment variable. Options left
//! unset fall back to the optional YAML config file, then to built-in
//! defaults (see [`crate::config`]).

use clap::Parser;

/// Command-line arguments for the Stock News server.
///
/// # Examples
///
/// ```sh
/// # Serve the page on port 5000
/// NEWS_API_KEY=... stock_news
///
/// # Narrow the keywords and the window
/// stock_news --keywords sensex,nifty --window-hours 6
///
/// # Write one JSON snapshot and exit
/// stock_news --json-output-dir ./snapshots
/// ```
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about)]
pub struct Cli {
    /// NewsAPI.org API key
    #[arg(long, env = "NEWS_API_KEY", hide_env_values = true)]
    pub news_api_key: Option<String>,

    /// Optional path to a YAML config file
    #[arg(short, long, env = "STOCK_NEWS_CONFIG")]
    pub config: Option<String>,

    /// Address to bind the web server to
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Port to bind the web server to
    #[arg(short, long, env = "PORT", default_value_t = 5000)]
    pub port: u16,

    /// Comma-separated keywords that mark an article as relevant
    #[arg(short, long, env = "NEWS_KEYWORDS", value_delimiter = ',')]
    pub keywords: Option<Vec<String>>,

    /// Length of the recency window in hours
    #[arg(long)]
    pub window_hours: Option<u32>,

    /// Number of articles requested from the news API (1-100)
    #[arg(long)]
    pub page_size: Option<u32>,

    /// Timeout for each news API request, in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Retries after a transient news API failure
    #[arg(long)]
    pub max_retries: Option<usize>,

    /// Override the news API search endpoint
    #[arg(long, env = "NEWS_API_URL")]
    pub api_url: Option<String>,

    /// Write one JSON snapshot into this directory and exit instead of serving
    #[arg(short, long)]
    pub json_output_dir: Option<String>,
}

impl Cli {
    /// `host:port` for the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
