use std::time::Duration;

use chrono::{DateTime, Local};
use serde::Serialize;
use strum::{Display, IntoStaticStr};

use super::work::Payload;

/// Why a single device could not be served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FailureKind {
    /// The device did not answer within the connect timeout.
    Timeout,
    /// The device rejected the credentials.
    AuthRejected,
    /// Anything else that went wrong inside the session.
    SessionError,
}

/// A payload that ran to completion on a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Success {
    pub device: String,
    /// Hostname from the device prompt, terminator stripped.
    pub hostname: String,
    /// The payload exactly as it was sent.
    pub payload: Payload,
    /// Captured textual response.
    pub output: String,
    pub timestamp: DateTime<Local>,
}

/// A work item that did not complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub device: String,
    pub kind: FailureKind,
    pub detail: String,
}

impl Failure {
    /// One operator-facing line naming the device and what went wrong.
    pub fn diagnostic_line(&self) -> String {
        let headline = match self.kind {
            FailureKind::Timeout => format!("{} timed out", self.device),
            FailureKind::AuthRejected => format!("Wrong credentials for {}", self.device),
            FailureKind::SessionError => format!("Session error on {}", self.device),
        };
        if self.detail.is_empty() {
            format!("{headline} [{}]", self.kind)
        } else {
            format!("{headline} [{}]: {}", self.kind, self.detail)
        }
    }
}

/// Outcome of one work item. Handed to the sink and then dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExecutionResult {
    Success(Success),
    Failure(Failure),
}

impl ExecutionResult {
    pub fn failure(device: impl Into<String>, kind: FailureKind, detail: impl Into<String>) -> Self {
        Self::Failure(Failure {
            device: device.into(),
            kind,
            detail: detail.into(),
        })
    }

    /// Device address this result belongs to.
    pub fn device(&self) -> &str {
        match self {
            Self::Success(s) => &s.device,
            Self::Failure(f) => &f.device,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Aggregate timing for one invocation. Per-device outcomes live in the
/// sink's artifacts, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Local>,
    pub elapsed: Duration,
}
