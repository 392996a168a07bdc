// =============================================================================
// config.rs — THE KNOBS
// =============================================================================
//
// Every constant the old collector script had baked in lives here instead:
// which categories to ask for, how far back, how long to wait on a slow
// answer, how long to pause between questions, and where the file goes.
//
// All values can be overridden via environment variables prefixed with
// HAZARD_COLLECTOR_. A .env file next to the binary is honoured too.
// =============================================================================

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;
use url::Url;

/// Default EONET v3 events endpoint.
pub const DEFAULT_API_BASE_URL: &str = "https://eonet.gsfc.nasa.gov/api/v3/events";

/// Default category list. The repeat of `severeStorms` is intentional: it is
/// fetched twice and the second answer wins in the output.
pub const DEFAULT_CATEGORIES: &str = "severeStorms,floods,severeStorms,drought,wildfires";

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; EventsFetcher/1.0)";

/// File name the dashboard's `/api/events` route reads.
pub const OUTPUT_FILE_NAME: &str = "coastal_events_last24h.json";

/// Everything a collection run needs to know.
#[derive(Debug, Clone)]
pub struct Config {
    /// Events endpoint. `category` and `days` are appended as query params.
    pub api_base_url: String,

    /// Categories to fetch, in order. Duplicates are kept on purpose.
    pub categories: Vec<String>,

    /// Trailing window, in days, requested per category.
    pub lookback_days: u32,

    /// Per-request timeout, covering connect and body.
    pub request_timeout: Duration,

    /// Pause between consecutive category requests.
    pub request_delay: Duration,

    pub user_agent: String,

    /// Where the aggregated JSON document is written.
    pub output_path: PathBuf,
}

/// Reasons a configuration is refused before any request is made.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("API base URL '{url}' is not an absolute http(s) URL: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("category list is empty")]
    NoCategories,
    #[error("lookback window must be at least one day")]
    ZeroLookback,
    #[error("request timeout must be non-zero")]
    ZeroTimeout,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            categories: parse_categories(DEFAULT_CATEGORIES),
            lookback_days: 2,
            request_timeout: Duration::from_secs(30),
            request_delay: Duration::from_millis(500),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            output_path: default_output_path(),
        }
    }
}

impl Config {
    /// Load configuration from the process environment. Call
    /// `load_env_file` first if a `.env` file should be honoured.
    pub fn from_env() -> Self {
        Self::from_lookup(env_lookup)
    }

    /// Build a config from an arbitrary key lookup. Anything missing falls
    /// back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        Config {
            api_base_url: lookup("HAZARD_COLLECTOR_API_BASE_URL")
                .unwrap_or(defaults.api_base_url),
            categories: lookup("HAZARD_COLLECTOR_CATEGORIES")
                .map(|raw| parse_categories(&raw))
                .unwrap_or(defaults.categories),
            lookback_days: parse_or_default(
                &lookup,
                "HAZARD_COLLECTOR_LOOKBACK_DAYS",
                defaults.lookback_days,
            ),
            request_timeout: Duration::from_secs(parse_or_default(
                &lookup,
                "HAZARD_COLLECTOR_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )),
            request_delay: Duration::from_millis(parse_or_default(
                &lookup,
                "HAZARD_COLLECTOR_REQUEST_DELAY_MS",
                defaults.request_delay.as_millis() as u64,
            )),
            user_agent: lookup("HAZARD_COLLECTOR_USER_AGENT").unwrap_or(defaults.user_agent),
            output_path: lookup("HAZARD_COLLECTOR_OUTPUT_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_path),
        }
    }

    /// Check the values that would otherwise only blow up halfway through a run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidBaseUrl {
            url: self.api_base_url.clone(),
            reason,
        };

        let url = Url::parse(&self.api_base_url).map_err(|e| invalid(e.to_string()))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
        }
        if self.categories.is_empty() {
            return Err(ConfigError::NoCategories);
        }
        if self.lookback_days == 0 {
            return Err(ConfigError::ZeroLookback);
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}

/// Merge a `.env` file, if there is one, into the process environment.
/// Variables already set win.
pub fn load_env_file() {
    let _ = dotenvy::dotenv();
}

pub fn env_lookup(key: &str) -> Option<String> {
    env::var(key).ok()
}

/// `HAZARD_COLLECTOR_LOG_FORMAT=json`. Read on its own so logging can be
/// installed before the rest of the config is parsed and can warn.
pub fn json_logs_requested<F>(lookup: &F) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    lookup("HAZARD_COLLECTOR_LOG_FORMAT")
        .map(|f| f.trim().eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

/// Split a comma-separated category list. Blank entries are dropped,
/// repeats are not.
pub fn parse_categories(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

/// `<crate dir>/../public/coastal_events_last24h.json`: the collector sits
/// next to the web app, whose static `public/` folder serves the file.
pub fn default_output_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("public")
        .join(OUTPUT_FILE_NAME)
}

fn parse_or_default<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + Copy + std::fmt::Display,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = raw.as_str(), default = %default, "Unparseable override, using default");
            default
        }),
    }
}
