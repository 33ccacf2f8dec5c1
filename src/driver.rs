//! # Workload driver
//!
//! One driver per virtual user. It owns the user's [`RecordCache`], RNG and
//! statistics, and issues create / read / search / delete requests against a
//! [`TextStore`], checking every response. Any unexpected status, missing
//! field or mismatched value is returned as a [`DriverError`], which aborts
//! the current iteration. Nothing is retried.

use rand::rngs::StdRng;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use crate::cache::RecordCache;
use crate::client::{ApiResponse, TextStore};
use crate::corpus::Corpus;
use crate::error::DriverError;
use crate::report::RunStats;
use crate::selection::{search_probe, strip_non_ascii, Operation, SearchProbe};

/// Result of an operation that may have nothing to act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Completed(T),
    /// The cache was empty (or did not hold the requested id).
    Skipped,
}

impl<T> Outcome<T> {
    pub fn is_skipped(&self) -> bool {
        matches!(self, Outcome::Skipped)
    }

    pub fn completed(self) -> Option<T> {
        match self {
            Outcome::Completed(value) => Some(value),
            Outcome::Skipped => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Created {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Searched {
    pub id: String,
    pub term: String,
    pub found: bool,
}

pub struct WorkloadDriver {
    vu: usize,
    store: Arc<dyn TextStore>,
    corpus: Arc<Corpus>,
    cache: RecordCache,
    rng: StdRng,
    stats: RunStats,
}

fn expect_status<T>(
    op: Operation,
    expected: u16,
    resp: &ApiResponse<T>,
) -> Result<(), DriverError> {
    if resp.status == expected {
        Ok(())
    } else {
        Err(DriverError::UnexpectedStatus {
            op,
            expected,
            actual: resp.status,
            body: resp.body.clone(),
        })
    }
}

impl WorkloadDriver {
    pub fn new(vu: usize, store: Arc<dyn TextStore>, corpus: Arc<Corpus>, rng: StdRng) -> Self {
        Self {
            vu,
            store,
            corpus,
            cache: RecordCache::new(),
            rng,
            stats: RunStats::default(),
        }
    }

    pub fn vu(&self) -> usize {
        self.vu
    }

    pub fn cache(&self) -> &RecordCache {
        &self.cache
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn into_stats(self) -> RunStats {
        self.stats
    }

    /// Store a random corpus line (non-ASCII stripped) and cache its id.
    pub async fn create(&mut self) -> Result<Created, DriverError> {
        let text = strip_non_ascii(self.corpus.sample(&mut self.rng));
        let resp = self.store.create(&text).await?;
        expect_status(Operation::Create, 201, &resp)?;

        let id = resp
            .parsed
            .and_then(|body| body.id)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| DriverError::MissingField {
                op: Operation::Create,
                field: "id",
                body: resp.body,
            })?;

        debug!(vu = self.vu, id = %id, "stored text");
        self.cache.insert(id.clone(), text.clone());
        Ok(Created { id, text })
    }

    /// Fetch a random cached record and compare it with the cached text.
    pub async fn read(&mut self) -> Result<Outcome<Created>, DriverError> {
        let Some((id, text)) = self.pick_cached() else {
            debug!(vu = self.vu, "no cached data available for retrieval");
            return Ok(Outcome::Skipped);
        };

        let resp = self.store.read(&id).await?;
        expect_status(Operation::Read, 200, &resp)?;

        let data = resp
            .parsed
            .and_then(|body| body.data)
            .ok_or_else(|| DriverError::MissingField {
                op: Operation::Read,
                field: "data",
                body: resp.body,
            })?;
        if data != text {
            return Err(DriverError::DataMismatch {
                id,
                expected: text,
                actual: data,
            });
        }

        debug!(vu = self.vu, id = %id, "retrieved and verified text");
        Ok(Outcome::Completed(Created { id, text }))
    }

    /// Search a random cached record for either one of its words or a
    /// counter-example token, and check the found flag.
    pub async fn search(&mut self) -> Result<Outcome<Searched>, DriverError> {
        let Some((id, text)) = self.pick_cached() else {
            debug!(vu = self.vu, "no cached data available to search");
            return Ok(Outcome::Skipped);
        };
        let probe = search_probe(&text, &mut self.rng);
        self.search_with(&id, &probe).await
    }

    /// Run `probe` against the cached record `id`.
    pub async fn search_with(
        &self,
        id: &str,
        probe: &SearchProbe,
    ) -> Result<Outcome<Searched>, DriverError> {
        let Some(text) = self.cache.get(id) else {
            return Ok(Outcome::Skipped);
        };

        let resp = self.store.search(id, &probe.term).await?;
        expect_status(Operation::Search, 200, &resp)?;

        let found = resp
            .parsed
            .and_then(|body| body.found)
            .ok_or_else(|| DriverError::MissingField {
                op: Operation::Search,
                field: "found",
                body: resp.body,
            })?;
        if found != probe.expect_found {
            return Err(DriverError::SearchMismatch {
                id: id.to_string(),
                term: probe.term.clone(),
                text: text.to_string(),
                expected: probe.expect_found,
                actual: found,
            });
        }

        debug!(
            vu = self.vu,
            id = %id,
            term = %probe.term,
            expected = probe.expect_found,
            "search verified"
        );
        Ok(Outcome::Completed(Searched {
            id: id.to_string(),
            term: probe.term.clone(),
            found,
        }))
    }

    /// Delete a random cached record and forget it once the server confirms.
    pub async fn delete(&mut self) -> Result<Outcome<String>, DriverError> {
        let Some((id, _)) = self.pick_cached() else {
            debug!(vu = self.vu, "no cached data available for deletion");
            return Ok(Outcome::Skipped);
        };

        let resp = self.store.delete(&id).await?;
        expect_status(Operation::Delete, 204, &resp)?;

        self.cache.remove(&id);
        debug!(vu = self.vu, id = %id, "deleted text");
        Ok(Outcome::Completed(id))
    }

    /// Run one operation and record its outcome and latency.
    pub async fn step(&mut self, op: Operation) -> Result<(), DriverError> {
        let started = Instant::now();
        let skipped = match op {
            Operation::Create => self.create().await.map(|_| false),
            Operation::Read => self.read().await.map(|o| o.is_skipped()),
            Operation::Search => self.search().await.map(|o| o.is_skipped()),
            Operation::Delete => self.delete().await.map(|o| o.is_skipped()),
        };
        match skipped {
            Ok(true) => self.stats.record_skipped(op),
            Ok(false) => self.stats.record_completed(op, started.elapsed()),
            Err(ref err) => self.stats.record_failed(op, started.elapsed(), err),
        }
        skipped.map(|_| ())
    }

    /// Create, read, search and delete in order; the first failure aborts.
    pub async fn run_iteration(&mut self) -> Result<(), DriverError> {
        for op in Operation::SEQUENCE {
            self.step(op).await?;
        }
        Ok(())
    }

    /// Run one operation drawn from the weighted mix.
    pub async fn run_weighted(&mut self) -> Result<Operation, DriverError> {
        let op = Operation::choose_weighted(&mut self.rng);
        self.step(op).await?;
        Ok(op)
    }

    /// Pre-populate the cache with `count` creates.
    pub async fn warm_up(&mut self, count: u32) -> Result<(), DriverError> {
        for _ in 0..count {
            self.step(Operation::Create).await?;
        }
        Ok(())
    }

    fn pick_cached(&mut self) -> Option<(String, String)> {
        self.cache
            .pick(&mut self.rng)
            .map(|(id, text)| (id.to_string(), text.to_string()))
    }
}
