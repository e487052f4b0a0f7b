mod report;

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::Instant;

use futures::FutureExt;
use tokio_util::task::TaskTracker;
use tracing::{trace, warn};

use crate::dispatch::{CallError, CallOutcome};

pub use report::Report;

/// Success and failure counters, shared by every task of a run
#[derive(Debug, Default)]
pub struct RunStats {
    success: AtomicU64,
    failure: AtomicU64,
}

impl RunStats {
    pub fn record(&self, outcome: &CallOutcome) {
        // readers only look at the counters after the tracker barrier, which
        // already orders every increment before them
        match outcome {
            CallOutcome::Success => self.success.fetch_add(1, Ordering::Relaxed),
            CallOutcome::Failure(_) => self.failure.fetch_add(1, Ordering::Relaxed),
        };
    }

    pub fn success(&self) -> u64 {
        self.success.load(Ordering::Relaxed)
    }

    pub fn failure(&self) -> u64 {
        self.failure.load(Ordering::Relaxed)
    }
}

/// Progress of a run that has not completed yet
///
/// A completed run is represented by its [`Report`], since [`Aggregator::wait`]
/// consumes the aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    NotStarted,
    Running,
}

/// Owns the counters and completion barrier of a single run
///
/// Every task spawned through [`Aggregator::spawn`] records its outcome before it
/// is considered finished, so once [`Aggregator::wait`] returns the counters are final.
/// A task that panics is recorded as a failure.
#[derive(Debug)]
pub struct Aggregator {
    stats: Arc<RunStats>,
    tracker: TaskTracker,
    state: RunState,
    dispatched: u64,
    started_at: Instant,
}

impl Aggregator {
    /// Starts the run clock
    pub fn start() -> Self {
        Self {
            stats: Default::default(),
            tracker: TaskTracker::new(),
            state: RunState::NotStarted,
            dispatched: 0,
            started_at: Instant::now(),
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn dispatched(&self) -> u64 {
        self.dispatched
    }

    /// Spawns a task whose outcome is recorded into the run's counters
    pub fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = CallOutcome> + Send + 'static,
    {
        self.state = RunState::Running;
        self.dispatched += 1;

        let stats = self.stats.clone();
        self.tracker.spawn(async move {
            let outcome = AssertUnwindSafe(task)
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    warn!("call panicked");
                    CallOutcome::Failure(CallError::Panicked)
                });
            trace!(?outcome);
            stats.record(&outcome);
        });
    }

    /// Waits for every spawned task to finish, and produces the final report
    ///
    /// Without a timeout on the tasks themselves, this does not return while any of
    /// them is still pending.
    pub async fn wait(self) -> Report {
        self.tracker.close();
        self.tracker.wait().await;

        Report {
            success: self.stats.success(),
            failure: self.stats.failure(),
            total: self.dispatched,
            elapsed: self.started_at.elapsed(),
        }
    }
}
