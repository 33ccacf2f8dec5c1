//! # Run harness
//!
//! Runs `vus` virtual users concurrently until the shared iteration budget is
//! used up, the run duration elapses, or shutdown is requested. Each user
//! owns its own [`WorkloadDriver`]; the only shared state is the read-only
//! corpus, the HTTP client, the budget counter and the cancellation token.

use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::client::TextStore;
use crate::config::{LoadConfig, Scenario};
use crate::corpus::Corpus;
use crate::driver::WorkloadDriver;
use crate::report::{RunReport, RunStats};

/// Iteration counter shared by all virtual users.
#[derive(Debug)]
pub struct IterationBudget {
    limit: Option<u64>,
    started: AtomicU64,
}

impl IterationBudget {
    pub fn new(limit: Option<u64>) -> Self {
        Self {
            limit,
            started: AtomicU64::new(0),
        }
    }

    /// Claim one iteration; false once the budget is spent.
    pub fn try_acquire(&self) -> bool {
        let claimed = self.started.fetch_add(1, Ordering::Relaxed);
        self.limit.map_or(true, |limit| claimed < limit)
    }
}

fn rng_for(seed: Option<u64>, vu: usize) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(vu as u64)),
        None => StdRng::from_entropy(),
    }
}

async fn virtual_user(
    mut driver: WorkloadDriver,
    scenario: Scenario,
    warmup_creates: u32,
    budget: Arc<IterationBudget>,
    cancel: CancellationToken,
) -> RunStats {
    let vu = driver.vu();
    if warmup_creates > 0 {
        if let Err(e) = driver.warm_up(warmup_creates).await {
            warn!(vu, error = %e, "warm-up aborted");
        }
    }

    let mut iterations = RunStats::default();
    while !cancel.is_cancelled() && budget.try_acquire() {
        let result = match scenario {
            Scenario::Sequential => driver.run_iteration().await,
            Scenario::Weighted => driver.run_weighted().await.map(|_| ()),
        };
        match result {
            Ok(()) => iterations.iteration_completed(),
            Err(e) => {
                warn!(vu, error = %e, "iteration aborted");
                iterations.iteration_aborted();
            }
        }
    }

    let mut stats = driver.into_stats();
    stats.merge(iterations);
    stats
}

/// Run the configured load and return the merged report.
///
/// `shutdown` stops the run early; iterations already in flight finish.
pub async fn run(
    load: &LoadConfig,
    corpus: Arc<Corpus>,
    store: Arc<dyn TextStore>,
    shutdown: CancellationToken,
) -> RunReport {
    let started_at = Utc::now();
    let started = Instant::now();
    let cancel = shutdown.child_token();
    let budget = Arc::new(IterationBudget::new(load.iteration_limit()));

    info!(
        vus = load.vus,
        scenario = %load.scenario,
        iterations = load.iterations,
        duration_s = load.duration_seconds,
        corpus_lines = corpus.len(),
        "starting load run"
    );

    let deadline = {
        let cancel = cancel.clone();
        let duration = load.duration();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(duration) => {
                    info!("run duration elapsed");
                    cancel.cancel();
                }
                _ = cancel.cancelled() => {}
            }
        })
    };

    let mut users = JoinSet::new();
    for vu in 0..load.vus {
        let driver = WorkloadDriver::new(
            vu,
            Arc::clone(&store),
            Arc::clone(&corpus),
            rng_for(load.seed, vu),
        );
        users.spawn(virtual_user(
            driver,
            load.scenario,
            load.warmup_creates,
            Arc::clone(&budget),
            cancel.clone(),
        ));
    }

    let mut stats = RunStats::default();
    while let Some(joined) = users.join_next().await {
        match joined {
            Ok(user_stats) => stats.merge(user_stats),
            Err(e) => warn!(error = %e, "virtual user panicked"),
        }
    }

    cancel.cancel();
    let _ = deadline.await;

    RunReport::new(started_at, started.elapsed(), load.vus, load.scenario, stats)
}
