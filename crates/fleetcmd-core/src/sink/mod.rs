//! Where execution results go once a device has been served.
//!
//! The runner hands each result to a [`ResultSink`] the moment it is
//! produced. Sinks are shared by every concurrent unit, so implementations
//! must tolerate concurrent `record` calls, including two calls for the
//! same device.

mod file;

use std::future::Future;
use std::sync::Arc;

pub use file::{FileSink, artifact_name, render_record};

use crate::model::ExecutionResult;

/// Consumes execution results. Never fails the caller: an implementation
/// that cannot persist a result reports it and returns.
pub trait ResultSink: Send + Sync + 'static {
    fn record(&self, result: &ExecutionResult) -> impl Future<Output = ()> + Send;
}

impl<S: ResultSink> ResultSink for Arc<S> {
    fn record(&self, result: &ExecutionResult) -> impl Future<Output = ()> + Send {
        S::record(self, result)
    }
}
