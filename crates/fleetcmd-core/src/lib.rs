//! Batch dispatch engine between `fleetcmd-api` and the `fleetcmd` CLI.
//!
//! This crate owns the pipeline that turns a device directory into
//! per-device result artifacts:
//!
//! - **[`DeviceDirectory`]**: parsed `address;payload` records, first-seen
//!   address order, payload order preserved per device.
//!
//! - **Planning** ([`plan`]): [`build_work_items`] expands the directory
//!   under the run's [`ExecutionMode`], [`partition`] splits the result into
//!   capacity-bounded [`Batch`]es. Nothing touches a device until planning
//!   succeeds.
//!
//! - **[`Dispatcher`]**: the entry point. Drives batches through the
//!   [`BatchRunner`] (batch-then-barrier or a fixed worker pool), executing
//!   each [`WorkItem`] in its own session via [`DeviceExecutor`].
//!
//! - **Seams**: [`SessionConnector`] / [`DeviceSession`] abstract the device
//!   connection ([`SshConnector`] is the production one); [`ResultSink`]
//!   abstracts result persistence ([`FileSink`] writes text artifacts).
//!
//! Per-device failures are values ([`ExecutionResult::Failure`]), never
//! errors: one bad device cannot abort a run.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod executor;
pub mod model;
pub mod plan;
pub mod runner;
pub mod session;
pub mod sink;
pub mod ssh;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{Credentials, DEFAULT_BATCH_SIZE, DEFAULT_COMMAND, DispatchConfig, Scheduling};
pub use dispatcher::Dispatcher;
pub use error::{CoreError, SinkError};
pub use executor::DeviceExecutor;
pub use plan::{Batch, build_work_items, partition};
pub use runner::{BatchRunner, Tally};
pub use session::{DeviceSession, SessionConnector, SessionFailure};
pub use sink::{FileSink, ResultSink};
pub use ssh::SshConnector;

// Transport settings are built by callers and handed to `SshConnector`.
pub use fleetcmd_api::TransportConfig;

pub use model::{
    DeviceDirectory, ExecutionMode, ExecutionResult, Failure, FailureKind, Payload, RunSummary,
    Success, WorkItem,
};
