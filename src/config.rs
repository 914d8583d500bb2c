//! Startup settings: CLI flags and environment, then the YAML file, then defaults.
//!
//! A missing or blank API key is fatal. The server refuses to start
//! rather than serve a page that can never load.

use crate::api::NEWS_API_URL;
use crate::cli::Cli;
use crate::error::ConfigError;
use crate::pipeline::KeywordSet;
use crate::service::NewsSettings;
use chrono::TimeDelta;
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::time::Duration as StdDuration;
use tracing::{debug, info, instrument};
use url::Url;

const DEFAULT_WINDOW_HOURS: u32 = 24;
const DEFAULT_PAGE_SIZE: u32 = 50;
const MAX_PAGE_SIZE: u32 = 100;
/// Thirty days, the furthest back the search endpoint reaches.
const MAX_WINDOW_HOURS: u32 = 720;
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_MAX_RETRIES: usize = 2;

/// Optional settings read from a YAML file.
///
/// ```yaml
/// keywords: [stock, sensex, nifty]
/// window_hours: 24
/// page_size: 50
/// timeout_secs: 10
/// ```
///
/// The API key is deliberately not accepted here; it only comes from the
/// environment or the command line.
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub keywords: Option<Vec<String>>,
    pub window_hours: Option<u32>,
    pub page_size: Option<u32>,
    pub timeout_secs: Option<u64>,
    pub max_retries: Option<usize>,
    pub api_url: Option<String>,
}

impl FileConfig {
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::File {
            path: path.to_path_buf(),
            source,
        })?;
        let file = Self::parse(&text).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Loaded configuration file");
        Ok(file)
    }

    fn parse(text: &str) -> Result<Self, serde_yaml::Error> {
        // An empty document deserializes to unit, not to a mapping.
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }
}

/// Fully resolved settings for one run.
#[derive(Clone)]
pub struct Settings {
    pub api_key: String,
    pub api_url: Url,
    pub timeout: StdDuration,
    pub max_retries: usize,
    pub news: NewsSettings,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("api_key", &"<redacted>")
            .field("api_url", &self.api_url.as_str())
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("news", &self.news)
            .finish()
    }
}

impl Settings {
    /// Resolve settings from the command line, loading `--config` if given.
    pub fn resolve(cli: &Cli) -> Result<Self, ConfigError> {
        let file = match &cli.config {
            Some(path) => FileConfig::load(Path::new(path))?,
            None => FileConfig::default(),
        };
        Self::from_parts(cli, file)
    }

    /// Merge `cli` over `file` over defaults and validate the result.
    pub fn from_parts(cli: &Cli, file: FileConfig) -> Result<Self, ConfigError> {
        let api_key = cli
            .news_api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::MissingApiKey)?
            .to_string();

        let keywords = match cli.keywords.as_ref().or(file.keywords.as_ref()) {
            Some(words) => KeywordSet::new(words),
            None => KeywordSet::default(),
        };
        if keywords.is_empty() {
            return Err(ConfigError::EmptyKeywords);
        }

        let window_hours = cli.window_hours.or(file.window_hours).unwrap_or(DEFAULT_WINDOW_HOURS);
        if !(1..=MAX_WINDOW_HOURS).contains(&window_hours) {
            return Err(ConfigError::InvalidWindow(window_hours));
        }

        let page_size = cli.page_size.or(file.page_size).unwrap_or(DEFAULT_PAGE_SIZE);
        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(ConfigError::InvalidPageSize(page_size));
        }

        let raw_url = cli
            .api_url
            .clone()
            .or(file.api_url)
            .unwrap_or_else(|| NEWS_API_URL.to_string());
        let api_url = Url::parse(&raw_url).map_err(|source| ConfigError::InvalidApiUrl {
            url: raw_url.clone(),
            source,
        })?;

        let timeout_secs = cli.timeout_secs.or(file.timeout_secs).unwrap_or(DEFAULT_TIMEOUT_SECS);
        let max_retries = cli.max_retries.or(file.max_retries).unwrap_or(DEFAULT_MAX_RETRIES);

        let settings = Self {
            api_key,
            api_url,
            timeout: StdDuration::from_secs(timeout_secs.max(1)),
            max_retries,
            news: NewsSettings {
                keywords,
                window: TimeDelta::hours(i64::from(window_hours)),
                page_size,
            },
        };
        debug!(?settings, "Resolved settings");
        Ok(settings)
    }
}
