use thiserror::Error;

/// Top-level error type for the `fleetcmd-api` crate.
///
/// Covers every failure mode of a device CLI session: TCP connect,
/// SSH handshake, authentication, channel setup, and prompt matching.
/// `fleetcmd-core` folds these into its per-device failure taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Connection ──────────────────────────────────────────────────
    /// TCP connect or SSH handshake did not finish within the connect timeout.
    #[error("Connection to {host} timed out after {timeout_secs}s")]
    Timeout { host: String, timeout_secs: u64 },

    /// TCP connect or SSH handshake failed outright (refused, unreachable, kex mismatch).
    #[error("Cannot connect to {host}: {reason}")]
    Connect { host: String, reason: String },

    // ── Authentication ──────────────────────────────────────────────
    /// The device rejected the username/password pair.
    #[error("Authentication failed for {username}@{host}")]
    Authentication { host: String, username: String },

    // ── Session ─────────────────────────────────────────────────────
    /// The interactive channel closed before the expected prompt arrived.
    #[error("Channel to {host} closed unexpectedly")]
    ChannelClosed { host: String },

    /// No prompt was seen within the read timeout.
    #[error("No prompt from {host} after {timeout_secs}s (last output: {tail:?})")]
    PromptNotFound {
        host: String,
        timeout_secs: u64,
        tail: String,
    },

    /// The session was already closed when an operation was attempted.
    #[error("Session to {host} is closed")]
    SessionClosed { host: String },

    // ── Transport ───────────────────────────────────────────────────
    /// Lower-level SSH protocol failure.
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Classify a connect-phase `russh::Error` for the given host.
    pub(crate) fn from_connect(host: &str, timeout_secs: u64, err: russh::Error) -> Self {
        match err {
            russh::Error::ConnectionTimeout | russh::Error::InactivityTimeout => Self::Timeout {
                host: host.to_owned(),
                timeout_secs,
            },
            russh::Error::IO(ref io) if io.kind() == std::io::ErrorKind::TimedOut => {
                Self::Timeout {
                    host: host.to_owned(),
                    timeout_secs,
                }
            }
            other => Self::Connect {
                host: host.to_owned(),
                reason: other.to_string(),
            },
        }
    }

    /// Whether this error means the device never answered in time.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Io(e) => e.kind() == std::io::ErrorKind::TimedOut,
            _ => false,
        }
    }

    /// Whether this error is a credential rejection.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }
}
