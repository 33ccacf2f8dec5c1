//! Run statistics collected per virtual user and merged into a report.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::config::Scenario;
use crate::error::{DriverError, FailureClass};
use crate::selection::Operation;

#[derive(Debug, Clone, Default)]
pub struct OperationStats {
    pub completed: u64,
    pub skipped: u64,
    pub failed: u64,
    latencies_us: Vec<u64>,
}

impl OperationStats {
    pub fn latencies_us(&self) -> &[u64] {
        &self.latencies_us
    }

    fn merge(&mut self, other: OperationStats) {
        self.completed += other.completed;
        self.skipped += other.skipped;
        self.failed += other.failed;
        self.latencies_us.extend(other.latencies_us);
    }
}

/// Counters owned by one virtual user while it runs.
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    pub operations: BTreeMap<Operation, OperationStats>,
    pub failures: BTreeMap<FailureClass, u64>,
    pub iterations_completed: u64,
    pub iterations_aborted: u64,
}

impl RunStats {
    pub fn record_completed(&mut self, op: Operation, elapsed: Duration) {
        let stats = self.operations.entry(op).or_default();
        stats.completed += 1;
        stats.latencies_us.push(elapsed.as_micros() as u64);
    }

    pub fn record_skipped(&mut self, op: Operation) {
        self.operations.entry(op).or_default().skipped += 1;
    }

    pub fn record_failed(&mut self, op: Operation, elapsed: Duration, err: &DriverError) {
        let stats = self.operations.entry(op).or_default();
        stats.failed += 1;
        stats.latencies_us.push(elapsed.as_micros() as u64);
        *self.failures.entry(err.class()).or_default() += 1;
    }

    pub fn iteration_completed(&mut self) {
        self.iterations_completed += 1;
    }

    pub fn iteration_aborted(&mut self) {
        self.iterations_aborted += 1;
    }

    pub fn merge(&mut self, other: RunStats) {
        for (op, stats) in other.operations {
            self.operations.entry(op).or_default().merge(stats);
        }
        for (class, count) in other.failures {
            *self.failures.entry(class).or_default() += count;
        }
        self.iterations_completed += other.iterations_completed;
        self.iterations_aborted += other.iterations_aborted;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LatencySummary {
    pub min_us: u64,
    pub mean_us: f64,
    pub p95_us: u64,
    pub max_us: u64,
}

impl LatencySummary {
    /// Nearest-rank summary; all zero for an empty sample.
    pub fn from_samples(samples: &[u64]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }
        let mut sorted = samples.to_vec();
        sorted.sort_unstable();
        let n = sorted.len();
        let rank = ((n as f64) * 0.95).ceil() as usize;
        Self {
            min_us: sorted[0],
            mean_us: sorted.iter().sum::<u64>() as f64 / n as f64,
            p95_us: sorted[rank.clamp(1, n) - 1],
            max_us: sorted[n - 1],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OperationSummary {
    pub completed: u64,
    pub skipped: u64,
    pub failed: u64,
    pub latency: LatencySummary,
}

/// End-of-run summary.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub vus: usize,
    pub scenario: Scenario,
    pub iterations_completed: u64,
    pub iterations_aborted: u64,
    pub operations: BTreeMap<Operation, OperationSummary>,
    pub failures: BTreeMap<FailureClass, u64>,
}

impl RunReport {
    pub fn new(
        started_at: DateTime<Utc>,
        elapsed: Duration,
        vus: usize,
        scenario: Scenario,
        stats: RunStats,
    ) -> Self {
        let operations = stats
            .operations
            .iter()
            .map(|(op, s)| {
                (
                    *op,
                    OperationSummary {
                        completed: s.completed,
                        skipped: s.skipped,
                        failed: s.failed,
                        latency: LatencySummary::from_samples(s.latencies_us()),
                    },
                )
            })
            .collect();
        Self {
            started_at,
            elapsed_ms: elapsed.as_millis() as u64,
            vus,
            scenario,
            iterations_completed: stats.iterations_completed,
            iterations_aborted: stats.iterations_aborted,
            operations,
            failures: stats.failures,
        }
    }

    pub fn iterations(&self) -> u64 {
        self.iterations_completed + self.iterations_aborted
    }

    pub fn log(&self) {
        info!(
            vus = self.vus,
            scenario = %self.scenario,
            elapsed_ms = self.elapsed_ms,
            iterations_completed = self.iterations_completed,
            iterations_aborted = self.iterations_aborted,
            "run finished"
        );
        for (op, s) in &self.operations {
            info!(
                op = %op,
                completed = s.completed,
                skipped = s.skipped,
                failed = s.failed,
                min_us = s.latency.min_us,
                mean_us = s.latency.mean_us,
                p95_us = s.latency.p95_us,
                max_us = s.latency.max_us,
                "operation summary"
            );
        }
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("report serialization failed")?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }
}
