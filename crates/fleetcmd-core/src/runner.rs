// ── Batch runner ──
//
// Drives work items through the executor with bounded concurrency. In
// batched scheduling every unit of batch N finishes before batch N+1
// starts; in pool scheduling a fixed set of workers drains one queue.
// Results stream to the sink as each unit completes.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::vec;

use futures_util::FutureExt;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{Instrument, error, info, info_span};

use crate::executor::{DeviceExecutor, panic_message};
use crate::model::{ExecutionResult, FailureKind, WorkItem};
use crate::plan::Batch;
use crate::session::SessionConnector;
use crate::sink::ResultSink;

/// Per-batch (or per-pool) outcome counts, used for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub succeeded: usize,
    pub failed: usize,
}

impl Tally {
    fn add(&mut self, success: bool) {
        if success {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }

    fn merge(&mut self, other: Self) {
        self.succeeded += other.succeeded;
        self.failed += other.failed;
    }

    pub fn attempted(self) -> usize {
        self.succeeded + self.failed
    }
}

/// Runs work items concurrently against one executor and one sink.
pub struct BatchRunner<C, S> {
    executor: Arc<DeviceExecutor<C>>,
    sink: Arc<S>,
}

impl<C: SessionConnector, S: ResultSink> BatchRunner<C, S> {
    pub fn new(executor: Arc<DeviceExecutor<C>>, sink: Arc<S>) -> Self {
        Self { executor, sink }
    }

    /// Run `batches` in order, one concurrent unit per item, with a full
    /// barrier between batches.
    pub async fn run_batches(&self, batches: Vec<Batch>) -> Tally {
        let mut total = Tally::default();

        for batch in batches {
            let index = batch.index;
            let size = batch.len();
            info!(batch = index, size, "batch started");

            let mut units = JoinSet::new();
            for item in batch.items {
                let span = info_span!("device", address = %item.device, batch = index);
                units.spawn(
                    run_unit(Arc::clone(&self.executor), Arc::clone(&self.sink), item)
                        .instrument(span),
                );
            }

            let mut tally = Tally::default();
            while let Some(joined) = units.join_next().await {
                match joined {
                    Ok(success) => tally.add(success),
                    Err(e) => {
                        error!(batch = index, error = %e, "device task did not complete");
                        tally.add(false);
                    }
                }
            }

            info!(
                batch = index,
                size,
                succeeded = tally.succeeded,
                failed = tally.failed,
                "batch finished"
            );
            total.merge(tally);
        }

        total
    }

    /// Run `items` with exactly `workers` concurrent units pulling from one
    /// shared queue in order. No barriers.
    pub async fn run_pool(&self, items: Vec<WorkItem>, workers: usize) -> Tally {
        let size = items.len();
        let workers = workers.clamp(1, size.max(1));
        info!(size, workers, "pool started");

        let queue: Arc<Mutex<vec::IntoIter<WorkItem>>> = Arc::new(Mutex::new(items.into_iter()));
        let mut pool = JoinSet::new();

        for worker in 0..workers {
            let queue = Arc::clone(&queue);
            let executor = Arc::clone(&self.executor);
            let sink = Arc::clone(&self.sink);

            pool.spawn(async move {
                let mut tally = Tally::default();
                loop {
                    // Hold the queue lock only long enough to take one item.
                    let next = queue.lock().await.next();
                    let Some(item) = next else { break };
                    let span = info_span!("device", address = %item.device, worker);
                    let success = run_unit(Arc::clone(&executor), Arc::clone(&sink), item)
                        .instrument(span)
                        .await;
                    tally.add(success);
                }
                tally
            });
        }

        let mut total = Tally::default();
        while let Some(joined) = pool.join_next().await {
            match joined {
                Ok(tally) => total.merge(tally),
                Err(e) => error!(error = %e, "pool worker did not complete"),
            }
        }

        info!(
            size,
            succeeded = total.succeeded,
            failed = total.failed,
            "pool finished"
        );
        total
    }
}

/// Execute one item, convert a panic into a session failure, hand the
/// result to the sink. Returns whether the device succeeded.
async fn run_unit<C: SessionConnector, S: ResultSink>(
    executor: Arc<DeviceExecutor<C>>,
    sink: Arc<S>,
    item: WorkItem,
) -> bool {
    let device = item.device.clone();

    let result = match AssertUnwindSafe(executor.execute(item)).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => ExecutionResult::failure(
            device,
            FailureKind::SessionError,
            format!("session panicked: {}", panic_message(panic.as_ref())),
        ),
    };

    sink.record(&result).await;
    result.is_success()
}
