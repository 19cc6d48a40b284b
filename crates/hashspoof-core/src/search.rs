//! The bounded search that ties prefix, mutator, storage and digest together.
//!
//! ```text
//! Idle -> Searching -> Matched | Exhausted | Cancelled | Failed
//! ```
//!
//! Iterations run strictly in order and the loop stops at the first match,
//! so the reported iteration is always the lowest matching one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, trace};

use crate::digest::{DigestResult, Digester};
use crate::error::SpoofError;
use crate::media::SourceImage;
use crate::mutator::ImageMutator;
use crate::prefix::PrefixSpec;
use crate::result::Result;
use crate::storage::CandidateStore;

/// Attempt budget when nothing else is configured
pub const DEFAULT_MAX_ATTEMPTS: u64 = 100_000;

/// terminal result of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    Matched {
        iteration: u64,
        digest: DigestResult,
        elapsed: Duration,
    },
    Exhausted {
        attempts: u64,
    },
    /// stopped from outside before the budget was used up
    Cancelled {
        attempts: u64,
    },
}

impl SearchOutcome {
    pub fn is_match(&self) -> bool {
        matches!(self, SearchOutcome::Matched { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchState {
    Idle,
    Searching { iteration: u64 },
    Matched,
    Exhausted,
    Cancelled,
    /// an iteration errored and the run was aborted
    Failed { iteration: u64 },
}

/// Receives `(current_attempt, max_attempts)` once per non-matching iteration
pub trait ProgressObserver {
    fn on_progress(&mut self, current: u64, max: u64);
}

impl<F: FnMut(u64, u64)> ProgressObserver for F {
    fn on_progress(&mut self, current: u64, max: u64) {
        self(current, max)
    }
}

/// ignores all progress
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_progress(&mut self, _current: u64, _max: u64) {}
}

/// Shared flag to stop a running search from another thread or a signal handler
#[derive(Debug, Default, Clone)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct SearchLoop<M, D, S> {
    mutator: M,
    digester: D,
    store: S,
    cancellation: CancellationToken,
    state: SearchState,
}

impl<M, D, S> SearchLoop<M, D, S>
where
    M: ImageMutator,
    D: Digester,
    S: CandidateStore,
{
    pub fn new(mutator: M, digester: D, store: S) -> Self {
        Self {
            mutator,
            digester,
            store,
            cancellation: CancellationToken::default(),
            state: SearchState::Idle,
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn state(&self) -> SearchState {
        self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Runs iterations `0..max_attempts` until the digest of a candidate
    /// matches `prefix`. Any failure aborts the run and is reported with the
    /// iteration it happened in.
    pub fn run(
        &mut self,
        image: &SourceImage,
        prefix: &PrefixSpec,
        max_attempts: u64,
        progress: &mut dyn ProgressObserver,
    ) -> Result<SearchOutcome> {
        let start = Instant::now();
        info!("Searching for a digest starting with {prefix}, at most {max_attempts} attempts");

        for iteration in 0..max_attempts {
            if self.cancellation.is_cancelled() {
                info!("Search cancelled after {iteration} attempts");
                self.state = SearchState::Cancelled;
                return Ok(SearchOutcome::Cancelled {
                    attempts: iteration,
                });
            }
            self.state = SearchState::Searching { iteration };

            let digest = self.attempt(image, iteration).map_err(|source| {
                debug!("Aborting search at iteration {iteration}: {source}");
                self.state = SearchState::Failed { iteration };
                SpoofError::IterationFailed {
                    iteration,
                    source: Box::new(source),
                }
            })?;
            trace!("iteration {iteration}: {digest}");

            if prefix.matches(digest.as_str()) {
                let elapsed = start.elapsed();
                info!("Iteration {iteration} matched {prefix} after {elapsed:?}: {digest}");
                self.state = SearchState::Matched;
                return Ok(SearchOutcome::Matched {
                    iteration,
                    digest,
                    elapsed,
                });
            }

            progress.on_progress(iteration + 1, max_attempts);
        }

        info!("No digest matched {prefix} within {max_attempts} attempts");
        self.state = SearchState::Exhausted;
        Ok(SearchOutcome::Exhausted {
            attempts: max_attempts,
        })
    }

    fn attempt(&mut self, image: &SourceImage, iteration: u64) -> Result<DigestResult> {
        let candidate = self.mutator.mutate(image, iteration)?;
        self.store.persist(&candidate.bytes)?;
        let mut reader = self.store.open()?;
        self.digester.digest_reader(&mut reader)
    }
}
