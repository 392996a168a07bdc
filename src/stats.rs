// ═══════════════════════════════════════════════════════════════
// RUN STATS - How did this run go, in one log line
// ═══════════════════════════════════════════════════════════════
//
// A run is single-threaded, so plain counters do the job. The
// snapshot is logged at the end of every run, never written into
// the output file.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Why a category ended up with an empty list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Non-200 answer.
    Status,
    /// Connect / DNS / timeout / body read.
    Transport,
    /// 200, but not JSON.
    Malformed,
    /// JSON, but not the envelope we expect.
    Unexpected,
}

/// Counters for a single collection run.
#[derive(Debug)]
pub struct RunStats {
    started_at: DateTime<Utc>,
    attempted: u64,
    succeeded: u64,
    status_failures: u64,
    transport_failures: u64,
    malformed_failures: u64,
    unexpected_failures: u64,
    events_collected: u64,
}

/// Serializable summary of a finished run.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub categories_attempted: u64,
    pub categories_succeeded: u64,
    pub categories_failed: u64,
    pub status_failures: u64,
    pub transport_failures: u64,
    pub malformed_failures: u64,
    pub unexpected_failures: u64,
    pub events_collected: u64,
}

impl RunStats {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            attempted: 0,
            succeeded: 0,
            status_failures: 0,
            transport_failures: 0,
            malformed_failures: 0,
            unexpected_failures: 0,
            events_collected: 0,
        }
    }

    pub fn record_success(&mut self, events: usize) {
        self.attempted += 1;
        self.succeeded += 1;
        self.events_collected += events as u64;
    }

    pub fn record_failure(&mut self, kind: FailureKind) {
        self.attempted += 1;
        match kind {
            FailureKind::Status => self.status_failures += 1,
            FailureKind::Transport => self.transport_failures += 1,
            FailureKind::Malformed => self.malformed_failures += 1,
            FailureKind::Unexpected => self.unexpected_failures += 1,
        }
    }

    pub fn snapshot(&self) -> RunSummary {
        let failed = self.status_failures
            + self.transport_failures
            + self.malformed_failures
            + self.unexpected_failures;

        RunSummary {
            started_at: self.started_at,
            finished_at: Utc::now(),
            categories_attempted: self.attempted,
            categories_succeeded: self.succeeded,
            categories_failed: failed,
            status_failures: self.status_failures,
            transport_failures: self.transport_failures,
            malformed_failures: self.malformed_failures,
            unexpected_failures: self.unexpected_failures,
            events_collected: self.events_collected,
        }
    }
}

impl Default for RunStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_add_up() {
        let mut stats = RunStats::new();
        stats.record_success(3);
        stats.record_success(0);
        stats.record_failure(FailureKind::Status);
        stats.record_failure(FailureKind::Malformed);
        stats.record_failure(FailureKind::Transport);

        let summary = stats.snapshot();
        assert_eq!(summary.categories_attempted, 5);
        assert_eq!(summary.categories_succeeded, 2);
        assert_eq!(summary.categories_failed, 3);
        assert_eq!(summary.status_failures, 1);
        assert_eq!(summary.malformed_failures, 1);
        assert_eq!(summary.transport_failures, 1);
        assert_eq!(summary.unexpected_failures, 0);
        assert_eq!(summary.events_collected, 3);
        assert!(summary.finished_at >= summary.started_at);
    }

    #[test]
    fn test_summary_serializes_for_the_log() {
        let mut stats = RunStats::new();
        stats.record_success(2);
        stats.record_failure(FailureKind::Unexpected);

        let value = serde_json::to_value(stats.snapshot()).unwrap();
        assert_eq!(value["categories_attempted"], 2);
        assert_eq!(value["categories_failed"], 1);
        assert_eq!(value["unexpected_failures"], 1);
        assert_eq!(value["events_collected"], 2);
        assert!(value["started_at"].is_string());
    }
}
