// =============================================================================
// collector.rs — ONE CATEGORY AT A TIME
// =============================================================================
//
// For every configured category, in order:
//   GET <base>?category=<id>&days=<n>
// and keep whatever sits under "events". One request in flight, a fixed pause
// between requests, no retries.
//
// EONET is a public service run by people with better things to do than keep
// our dashboard alive, so every answer is treated as best-effort. A category
// that fails for any reason gets an empty list and a log line, and the loop
// moves on. Nothing that happens to a single category can stop the run.
// =============================================================================

use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::Config;
use crate::models::{EventRecord, ResultMap};
use crate::stats::{FailureKind, RunStats, RunSummary};

/// How much of an unparseable body ends up in the log.
const BODY_SNIPPET_CHARS: usize = 200;

/// Everything that can go wrong for a single category.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP status {status}")]
    Status { status: u16 },

    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("failed to read response body: {0}")]
    Body(#[source] reqwest::Error),

    #[error("response is not valid JSON: {source}")]
    MalformedBody {
        #[source]
        source: serde_json::Error,
        snippet: String,
    },

    #[error("unexpected response shape: {0}")]
    UnexpectedShape(String),
}

impl FetchError {
    pub fn kind(&self) -> FailureKind {
        match self {
            FetchError::Status { .. } => FailureKind::Status,
            FetchError::Transport(_) | FetchError::Body(_) => FailureKind::Transport,
            FetchError::MalformedBody { .. } => FailureKind::Malformed,
            FetchError::UnexpectedShape(_) => FailureKind::Unexpected,
        }
    }
}

/// Result of one category fetch.
#[derive(Debug)]
pub enum CategoryOutcome {
    Fetched(Vec<EventRecord>),
    Failed(FetchError),
}

pub struct EventCollector {
    client: reqwest::Client,
    base_url: Url,
    categories: Vec<String>,
    lookback_days: u32,
    request_delay: Duration,
}

impl EventCollector {
    /// Build the HTTP client and resolve the base URL. Fails only on a
    /// configuration that `Config::validate` would also have refused.
    pub fn new(config: &Config) -> Result<Self> {
        let base_url = Url::parse(&config.api_base_url)
            .with_context(|| format!("invalid API base URL '{}'", config.api_base_url))?;

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.as_str())
            .build()
            .context("failed to build HTTP client")?;

        info!(
            base_url = %base_url,
            categories = config.categories.len(),
            lookback_days = config.lookback_days,
            timeout_secs = config.request_timeout.as_secs_f64(),
            delay_ms = config.request_delay.as_millis() as u64,
            "Event collector ready"
        );

        Ok(Self {
            client,
            base_url,
            categories: config.categories.clone(),
            lookback_days: config.lookback_days,
            request_delay: config.request_delay,
        })
    }

    /// Fetch every category and fold the outcomes into a `ResultMap`.
    ///
    /// Always returns a map with one key per distinct category. A repeated
    /// category is fetched again and the later outcome replaces the earlier.
    pub async fn collect(&self) -> (ResultMap, RunSummary) {
        let mut results = ResultMap::new();
        let mut stats = RunStats::new();

        for (index, category) in self.categories.iter().enumerate() {
            match self.fetch_category(category).await {
                CategoryOutcome::Fetched(events) => {
                    info!(
                        category = category.as_str(),
                        count = events.len(),
                        "Found {} events for {}",
                        events.len(),
                        category
                    );
                    stats.record_success(events.len());
                    results.insert(category, events);
                }
                CategoryOutcome::Failed(err) => {
                    report_failure(category, &err);
                    stats.record_failure(err.kind());
                    results.insert(category, Vec::new());
                }
            }

            let is_last = index + 1 == self.categories.len();
            if !is_last && !self.request_delay.is_zero() {
                debug!(delay_ms = self.request_delay.as_millis() as u64, "Pausing before next request");
                tokio::time::sleep(self.request_delay).await;
            }
        }

        (results, stats.snapshot())
    }

    /// One GET for one category, turned into an outcome. Never panics,
    /// never propagates.
    pub async fn fetch_category(&self, category: &str) -> CategoryOutcome {
        match self.try_fetch(category).await {
            Ok(events) => CategoryOutcome::Fetched(events),
            Err(err) => CategoryOutcome::Failed(err),
        }
    }

    /// `<base>?category=<id>&days=<n>`, with any query the base already has kept.
    pub fn category_url(&self, category: &str) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("category", category)
            .append_pair("days", &self.lookback_days.to_string());
        url
    }

    async fn try_fetch(&self, category: &str) -> Result<Vec<EventRecord>, FetchError> {
        let url = self.category_url(category);
        info!(category, url = %url, "Fetching: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(FetchError::Transport)?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(FetchError::Body)?;
        extract_events(&body)
    }
}

/// Pull the `events` array out of a response body.
///
/// A missing `events` key is an empty list. A body that is not JSON, not an
/// object, or whose `events` is anything but an array is an error.
pub fn extract_events(body: &str) -> Result<Vec<EventRecord>, FetchError> {
    let value: Value = serde_json::from_str(body).map_err(|source| FetchError::MalformedBody {
        source,
        snippet: body.chars().take(BODY_SNIPPET_CHARS).collect(),
    })?;

    let mut envelope = match value {
        Value::Object(envelope) => envelope,
        other => {
            return Err(FetchError::UnexpectedShape(format!(
                "expected a JSON object, got {}",
                json_type_name(&other)
            )))
        }
    };

    match envelope.remove("events") {
        None => Ok(Vec::new()),
        Some(Value::Array(events)) => Ok(events),
        Some(other) => Err(FetchError::UnexpectedShape(format!(
            "`events` is {}, expected an array",
            json_type_name(&other)
        ))),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn report_failure(category: &str, err: &FetchError) {
    match err {
        FetchError::Status { status } => {
            warn!(category, status, "Error {} for {}", status, category);
        }
        FetchError::Transport(e) | FetchError::Body(e) => {
            warn!(
                category,
                timeout = e.is_timeout(),
                connect = e.is_connect(),
                error = %e,
                "Request failed for {}",
                category
            );
        }
        FetchError::MalformedBody { source, snippet } => {
            warn!(
                category,
                error = %source,
                raw_response = snippet.as_str(),
                "JSON decode failed for {}",
                category
            );
        }
        FetchError::UnexpectedShape(detail) => {
            warn!(category, detail = detail.as_str(), "Unexpected response for {}", category);
        }
    }
}
