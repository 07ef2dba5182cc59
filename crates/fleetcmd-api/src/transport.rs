// Shared transport configuration for SSH device sessions.
//
// Every session in a run shares the same port, timeouts, and terminal
// geometry, so the russh client config is built once per connect from here.

use std::sync::Arc;
use std::time::Duration;

/// Commands sent right after login to turn off paging and line wrapping.
pub const SESSION_PREPARATION: &[&str] = &["terminal length 0", "terminal width 511"];

/// Shared transport configuration for device sessions.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// TCP port of the SSH service.
    pub port: u16,
    /// Upper bound for TCP connect + SSH handshake + authentication.
    pub connect_timeout: Duration,
    /// Upper bound for waiting on a prompt after sending input.
    pub read_timeout: Duration,
    /// Columns requested for the pseudo-terminal.
    pub terminal_width: u32,
    /// Commands run after login, before any payload.
    pub preparation: Vec<String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            port: 22,
            connect_timeout: Duration::from_secs(20),
            read_timeout: Duration::from_secs(60),
            terminal_width: 511,
            preparation: SESSION_PREPARATION.iter().map(|s| (*s).to_owned()).collect(),
        }
    }
}

impl TransportConfig {
    /// Build the russh client configuration for one connection.
    pub fn build_ssh_config(&self) -> Arc<russh::client::Config> {
        Arc::new(russh::client::Config {
            inactivity_timeout: Some(self.read_timeout.saturating_mul(2)),
            ..Default::default()
        })
    }
}
