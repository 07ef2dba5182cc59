// ── Core error types ──
//
// Only pre-dispatch problems are errors here: a malformed directory or an
// inconsistent run configuration aborts the run before any device is
// touched. Per-device failures are values (`ExecutionResult::Failure`),
// and sink write failures are reported, never propagated into the runner.

use std::path::PathBuf;

use thiserror::Error;

/// Fatal, pre-dispatch errors for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Input errors ─────────────────────────────────────────────────
    #[error("Invalid device directory: {reason}")]
    InvalidDirectory { reason: String },

    #[error("Invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },

    // ── IO errors ────────────────────────────────────────────────────
    #[error("Cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CoreError {
    pub(crate) fn invalid_directory(reason: impl Into<String>) -> Self {
        Self::InvalidDirectory {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_configuration(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            reason: reason.into(),
        }
    }
}

/// Failure to persist one result. Reported on the diagnostic stream; the
/// run carries on.
#[derive(Debug, Error)]
#[error("Cannot write result for {device} to {}: {source}", path.display())]
pub struct SinkError {
    pub device: String,
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}
