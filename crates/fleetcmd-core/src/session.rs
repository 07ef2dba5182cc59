// ── Device session seam ──
//
// The executor only ever talks to a device through these two traits.
// The SSH implementation lives in `crate::ssh`; tests plug in scripted
// stubs.

use std::future::Future;

use thiserror::Error;

use crate::config::Credentials;
use crate::model::FailureKind;

/// A per-device session failure, already classified.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {detail}")]
pub struct SessionFailure {
    pub kind: FailureKind,
    pub detail: String,
}

impl SessionFailure {
    pub fn new(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    pub fn timeout(detail: impl Into<String>) -> Self {
        Self::new(FailureKind::Timeout, detail)
    }

    pub fn auth_rejected(detail: impl Into<String>) -> Self {
        Self::new(FailureKind::AuthRejected, detail)
    }

    pub fn session(detail: impl Into<String>) -> Self {
        Self::new(FailureKind::SessionError, detail)
    }
}

impl From<fleetcmd_api::Error> for SessionFailure {
    fn from(err: fleetcmd_api::Error) -> Self {
        let kind = if err.is_timeout() {
            FailureKind::Timeout
        } else if err.is_auth() {
            FailureKind::AuthRejected
        } else {
            FailureKind::SessionError
        };
        Self::new(kind, err.to_string())
    }
}

/// Opens sessions to devices. Shared by every concurrent unit of a run.
pub trait SessionConnector: Send + Sync + 'static {
    type Session: DeviceSession;

    /// Connect and authenticate to `address`.
    fn open(
        &self,
        address: &str,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<Self::Session, SessionFailure>> + Send;
}

/// An open, authenticated command channel to one device.
pub trait DeviceSession: Send {
    /// Probe the prompt; the device's self-reported identity, terminator
    /// included (e.g. `core-sw01#`).
    fn resolve_identity(&mut self) -> impl Future<Output = Result<String, SessionFailure>> + Send;

    /// Run one command and capture its output.
    fn run_command(
        &mut self,
        command: &str,
    ) -> impl Future<Output = Result<String, SessionFailure>> + Send;

    /// Apply ordered configuration lines as one transaction and capture the
    /// transcript.
    fn run_configuration(
        &mut self,
        lines: &[String],
    ) -> impl Future<Output = Result<String, SessionFailure>> + Send;

    /// Tear the session down. Idempotent; never fails the caller.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}
