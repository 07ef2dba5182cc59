//! Domain model for a dispatch run.

pub mod directory;
pub mod result;
pub mod work;

pub use directory::{DeviceDirectory, parse_snippet, read_snippet};
pub use result::{ExecutionResult, Failure, FailureKind, RunSummary, Success};
pub use work::{ExecutionMode, Payload, WorkItem};
