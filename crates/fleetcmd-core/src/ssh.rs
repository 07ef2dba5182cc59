// ── SSH-backed device sessions ──
//
// Adapts `fleetcmd_api::SshSession` to the `DeviceSession` seam. One
// connection per work item; nothing is pooled or reused.

use fleetcmd_api::{SshSession, TransportConfig};

use crate::config::Credentials;
use crate::session::{DeviceSession, SessionConnector, SessionFailure};

/// Opens a fresh interactive SSH shell for every work item.
#[derive(Debug, Clone, Default)]
pub struct SshConnector {
    transport: TransportConfig,
}

impl SshConnector {
    pub fn new(transport: TransportConfig) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &TransportConfig {
        &self.transport
    }
}

impl SessionConnector for SshConnector {
    type Session = SshSession;

    async fn open(
        &self,
        address: &str,
        credentials: &Credentials,
    ) -> Result<SshSession, SessionFailure> {
        let session = SshSession::connect(
            address,
            &credentials.username,
            &credentials.password,
            &self.transport,
        )
        .await?;
        Ok(session)
    }
}

impl DeviceSession for SshSession {
    async fn resolve_identity(&mut self) -> Result<String, SessionFailure> {
        Ok(self.find_prompt().await?)
    }

    async fn run_command(&mut self, command: &str) -> Result<String, SessionFailure> {
        Ok(self.send_command(command).await?)
    }

    async fn run_configuration(&mut self, lines: &[String]) -> Result<String, SessionFailure> {
        Ok(self.send_config_set(lines).await?)
    }

    async fn close(&mut self) {
        SshSession::close(self).await;
    }
}
