// ── Dispatcher ──
//
// The engine's entry point: plan the run, then drive it with the chosen
// scheduling. Pre-dispatch problems abort with `CoreError`; once the first
// device is contacted the run always completes.

use std::sync::Arc;
use std::time::Instant;

use chrono::Local;
use tracing::info;

use crate::config::{Credentials, DispatchConfig, Scheduling};
use crate::error::CoreError;
use crate::executor::DeviceExecutor;
use crate::model::{DeviceDirectory, RunSummary};
use crate::plan::{self, Batch};
use crate::runner::BatchRunner;
use crate::session::SessionConnector;
use crate::sink::ResultSink;

/// Runs one directory through the whole pipeline: builder, partitioner,
/// runner, sink.
pub struct Dispatcher<C, S> {
    config: DispatchConfig,
    runner: BatchRunner<C, S>,
}

impl<C: SessionConnector, S: ResultSink> Dispatcher<C, S> {
    pub fn new(config: DispatchConfig, connector: C, credentials: Credentials, sink: S) -> Self {
        let executor = Arc::new(DeviceExecutor::new(connector, credentials));
        Self {
            config,
            runner: BatchRunner::new(executor, Arc::new(sink)),
        }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Plan without dispatching.
    pub fn plan(&self, directory: &DeviceDirectory) -> Result<Vec<Batch>, CoreError> {
        plan::plan(directory, &self.config)
    }

    /// Dispatch every work item built from `directory`.
    ///
    /// Per-device failures never surface here; they are recorded through
    /// the sink. The returned summary carries the wall-clock duration from
    /// before the first batch to after the last one.
    pub async fn run(&self, directory: &DeviceDirectory) -> Result<RunSummary, CoreError> {
        let batches = self.plan(directory)?;
        let items = plan::item_count(&batches);

        let started_at = Local::now();
        let clock = Instant::now();

        let tally = match self.config.scheduling {
            Scheduling::Batched => self.runner.run_batches(batches).await,
            Scheduling::Pool => {
                let queue = batches.into_iter().flat_map(|b| b.items).collect();
                self.runner.run_pool(queue, self.config.batch_size).await
            }
        };

        let elapsed = clock.elapsed();
        info!(
            items,
            succeeded = tally.succeeded,
            failed = tally.failed,
            elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            "run finished"
        );

        Ok(RunSummary {
            started_at,
            elapsed,
        })
    }
}
