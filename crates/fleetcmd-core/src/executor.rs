// ── Device executor ──
//
// Runs one work item against one device: open, identify, execute, close.
// Every failure is turned into an `ExecutionResult::Failure` here, so
// nothing a device does can unwind into the runner. Operator-facing
// diagnostics for failures are the sink's job.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use chrono::Local;
use fleetcmd_api::prompt::hostname_from_prompt;
use futures_util::FutureExt;
use tracing::debug;

use crate::config::Credentials;
use crate::model::{ExecutionResult, Failure, Payload, Success, WorkItem};
use crate::session::{DeviceSession, SessionConnector, SessionFailure};

/// Executes work items with a shared connector and shared credentials.
#[derive(Debug)]
pub struct DeviceExecutor<C> {
    connector: C,
    credentials: Credentials,
}

impl<C: SessionConnector> DeviceExecutor<C> {
    pub fn new(connector: C, credentials: Credentials) -> Self {
        Self {
            connector,
            credentials,
        }
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Run one work item to completion. A single attempt; never retries.
    pub async fn execute(&self, item: WorkItem) -> ExecutionResult {
        let WorkItem { device, payload } = item;

        match self.attempt(&device, &payload).await {
            Ok((hostname, output)) => {
                debug!(device = %device, hostname = %hostname, "payload executed");
                ExecutionResult::Success(Success {
                    device,
                    hostname,
                    payload,
                    output,
                    timestamp: Local::now(),
                })
            }
            Err(SessionFailure { kind, detail }) => {
                debug!(device = %device, kind = %kind, "device failed");
                ExecutionResult::Failure(Failure {
                    device,
                    kind,
                    detail,
                })
            }
        }
    }

    /// Open a session and drive it; the session is closed on every path
    /// once it has been opened.
    async fn attempt(
        &self,
        device: &str,
        payload: &Payload,
    ) -> Result<(String, String), SessionFailure> {
        let mut session = self.connector.open(device, &self.credentials).await?;
        debug!(device, "session opened");

        let outcome = AssertUnwindSafe(drive(&mut session, payload))
            .catch_unwind()
            .await;
        session.close().await;
        debug!(device, "session closed");

        outcome.unwrap_or_else(|panic| {
            Err(SessionFailure::session(format!(
                "session panicked: {}",
                panic_message(panic.as_ref())
            )))
        })
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}

async fn drive<S: DeviceSession>(
    session: &mut S,
    payload: &Payload,
) -> Result<(String, String), SessionFailure> {
    let prompt = session.resolve_identity().await?;
    let hostname = hostname_from_prompt(&prompt).to_owned();

    let output = match payload {
        Payload::Command(command) => session.run_command(command).await?,
        Payload::Configuration(lines) => session.run_configuration(lines).await?,
    };

    Ok((hostname, output))
}
