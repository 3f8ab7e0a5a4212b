//! Configuration constants, runtime configuration and date parsing.

use std::str::FromStr;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::{HarvesterError, Result};
use crate::http::RetryPolicy;

/// Base URL for Riksdagen's open data service.
pub const RIKSDAGEN_BASE_URL: &str = "https://data.riksdagen.se";

/// Base URL for the Government Offices' legal database (rkrattsbaser).
pub const RKRATTSBASER_BASE_URL: &str = "https://beta.rkrattsbaser.gov.se";

/// Path of the Elasticsearch proxy endpoint on rkrattsbaser.
pub const RKRATTSBASER_SEARCH_PATH: &str = "/elasticsearch/SearchEsByRawJson";

/// HTTP timeout in seconds.
pub const HTTP_TIMEOUT_SECS: u64 = 30;

/// Default pause between consecutive document requests (milliseconds).
pub const DEFAULT_REQUEST_DELAY_MS: u64 = 500;

/// Default output directory for the `download` command.
pub const DEFAULT_DOWNLOAD_DIR: &str = "sfs_docs";

/// Default output directory for the `fetch-updated` command.
pub const DEFAULT_FETCH_DIR: &str = "markdown";

/// Number of hits requested per search page.
pub const SEARCH_PAGE_SIZE: usize = 1000;

/// Elasticsearch refuses `from + size` beyond this window.
pub const SEARCH_MAX_WINDOW: usize = 10_000;

/// PDF archive for enactments 1998:306 through 2018:159.
pub const PDF_ARCHIVE_OLD: &str = "https://rkrattsdb.gov.se";

/// PDF archive for enactments from 2018:160 onwards.
pub const PDF_ARCHIVE_NEW: &str = "https://svenskforfattningssamling.se";

/// Runtime configuration shared by the source adapters.
///
/// Passed explicitly to every adapter; nothing reads it from globals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvesterConfig {
    pub riksdagen_url: String,
    pub rkrattsbaser_url: String,
    pub timeout: Duration,
    pub retry: RetryPolicy,
    pub request_delay: Duration,
}

impl Default for HarvesterConfig {
    fn default() -> Self {
        Self {
            riksdagen_url: RIKSDAGEN_BASE_URL.to_string(),
            rkrattsbaser_url: RKRATTSBASER_BASE_URL.to_string(),
            timeout: Duration::from_secs(HTTP_TIMEOUT_SECS),
            retry: RetryPolicy::default(),
            request_delay: Duration::from_millis(DEFAULT_REQUEST_DELAY_MS),
        }
    }
}

impl HarvesterConfig {
    /// Build the configuration from defaults overridden by environment variables.
    ///
    /// Recognised variables: `SFS_RIKSDAGEN_URL`, `SFS_RKRATTSBASER_URL`,
    /// `SFS_HTTP_TIMEOUT_SECS`, `SFS_MAX_RETRIES`, `SFS_REQUEST_DELAY_MS`.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("SFS_RIKSDAGEN_URL") {
            config.riksdagen_url = url;
        }
        if let Ok(url) = std::env::var("SFS_RKRATTSBASER_URL") {
            config.rkrattsbaser_url = url;
        }
        if let Some(secs) = env_parse::<u64>("SFS_HTTP_TIMEOUT_SECS")? {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(attempts) = env_parse::<u32>("SFS_MAX_RETRIES")? {
            if attempts == 0 {
                return Err(HarvesterError::Config(
                    "SFS_MAX_RETRIES must be at least 1".into(),
                ));
            }
            config.retry.max_attempts = attempts;
        }
        if let Some(ms) = env_parse::<u64>("SFS_REQUEST_DELAY_MS")? {
            config.request_delay = Duration::from_millis(ms);
        }

        config.riksdagen_url = trim_base_url(&config.riksdagen_url);
        config.rkrattsbaser_url = trim_base_url(&config.rkrattsbaser_url);
        Ok(config)
    }

    /// Point both sources at custom base URLs (used for mirrors and tests).
    #[must_use]
    pub fn with_base_urls(mut self, riksdagen: &str, rkrattsbaser: &str) -> Self {
        self.riksdagen_url = trim_base_url(riksdagen);
        self.rkrattsbaser_url = trim_base_url(rkrattsbaser);
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    /// Full URL of the rkrattsbaser search endpoint.
    #[must_use]
    pub fn search_url(&self) -> String {
        format!("{}{RKRATTSBASER_SEARCH_PATH}", self.rkrattsbaser_url)
    }
}

fn trim_base_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

fn env_parse<T: FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| HarvesterError::Config(format!("{name} has invalid value '{value}'"))),
        Err(_) => Ok(None),
    }
}

/// Parse a cutoff date for the incremental fetch.
///
/// Accepts `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM:SS` and `YYYY-MM-DD HH:MM:SS`.
/// A bare date means midnight.
///
/// # Examples
/// ```
/// use sfs_harvester::config::parse_since;
///
/// let since = parse_since("2025-01-01").unwrap();
/// assert_eq!(since.to_string(), "2025-01-01 00:00:00");
/// assert!(parse_since("01/01/2025").is_err());
/// ```
pub fn parse_since(value: &str) -> Result<NaiveDateTime> {
    let value = value.trim();
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(parsed);
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(|| HarvesterError::InvalidDate(value.to_string()))
}

/// Compute the start of a lookback window of `days` days ending at `now`.
#[must_use]
pub fn since_days_ago(now: NaiveDateTime, days: u32) -> NaiveDateTime {
    now - chrono::Duration::days(i64::from(days))
}
