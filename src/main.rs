//  ╦ ╦╔═╗╔═╗╔═╗╦═╗╔╦╗  ╔═╗╔═╗╦  ╦  ╔═╗╔═╗╔╦╗╔═╗╦═╗
//  ╠═╣╠═╣╔═╝╠═╣╠╦╝ ║║  ║  ║ ║║  ║  ║╣ ║   ║ ║ ║╠╦╝
//  ╩ ╩╩ ╩╚═╝╩ ╩╩╚══╩╝  ╚═╝╚═╝╩═╝╩═╝╚═╝╚═╝ ╩ ╚═╝╩╚═
//
// Asks NASA EONET what storms, floods, droughts and fires happened in the
// last couple of days, one category at a time, and drops the answers into
// public/coastal_events_last24h.json for the dashboard.
//
// Exit status: 0 when the file was written (even if every category failed),
// non-zero when the configuration is unusable or the file could not be saved.

mod collector;
mod config;
mod models;
mod stats;
mod writer;

use anyhow::{Context, Result};
use tracing::{debug, error, info, info_span, Instrument};
use tracing_subscriber::{fmt, EnvFilter};
use uuid::Uuid;

use crate::collector::EventCollector;
use crate::config::Config;
use crate::writer::ResultWriter;

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt().with_env_filter(filter).with_target(true);

    if json {
        builder.json().init();
    } else {
        builder.with_ansi(true).init();
    }
}

/// One full collection: fetch everything, then write once.
async fn run(config: &Config) -> Result<()> {
    let collector = EventCollector::new(config)?;
    let writer = ResultWriter::new(&config.output_path);

    let (results, summary) = collector.collect().await;

    info!(
        attempted = summary.categories_attempted,
        succeeded = summary.categories_succeeded,
        failed = summary.categories_failed,
        events = summary.events_collected,
        elapsed_ms = (summary.finished_at - summary.started_at).num_milliseconds(),
        "Collection finished"
    );
    match serde_json::to_string(&summary) {
        Ok(json) => debug!(summary = %json, "Run summary"),
        Err(e) => debug!(error = %e, "Run summary not serializable"),
    }

    writer.write(&results).map_err(|e| {
        error!(error = %e, "Failed to save file");
        e
    })?;

    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Logging goes up before the config is parsed so bad overrides are reported.
    config::load_env_file();
    init_tracing(config::json_logs_requested(&config::env_lookup));
    let config = Config::from_env();

    config.validate().context("invalid configuration")?;
    info!(
        categories = ?config.categories,
        output = %config.output_path.display(),
        "Hazard event collector starting"
    );

    let run_id = Uuid::new_v4();
    run(&config)
        .instrument(info_span!("collection_run", %run_id))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_write_failure_surfaces_as_error_after_fetching() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("public");
        std::fs::write(&blocker, "not a directory").unwrap();

        // Nothing listens on port 9 locally; every category fails fast.
        let config = Config {
            api_base_url: "http://127.0.0.1:9/events".into(),
            categories: vec!["floods".into()],
            request_timeout: Duration::from_secs(2),
            request_delay: Duration::ZERO,
            output_path: blocker.join("events.json"),
            ..Config::default()
        };

        assert!(run(&config).await.is_err());
    }

    #[tokio::test]
    async fn test_run_writes_every_category_even_when_all_fail() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("public").join("events.json");

        let config = Config {
            api_base_url: "http://127.0.0.1:9/events".into(),
            categories: vec!["severeStorms".into(), "floods".into(), "severeStorms".into()],
            request_timeout: Duration::from_secs(2),
            request_delay: Duration::ZERO,
            output_path: output.clone(),
            ..Config::default()
        };

        run(&config).await.unwrap();

        let parsed: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(
            parsed,
            serde_json::json!({"severeStorms": [], "floods": []})
        );
    }
}
