//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and stable exit codes.

use std::io;
use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use fleetcmd_config::ConfigError;
use fleetcmd_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const DEVICE_FAILURES: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Credentials ──────────────────────────────────────────────────

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(fleetcmd::no_credentials),
        help(
            "Configure a profile with: fleetcmd config init\n\
             Or pass --username and set FLEETCMD_PASSWORD."
        )
    )]
    NoCredentials { profile: String },

    #[error("Could not access the system keyring")]
    #[diagnostic(
        code(fleetcmd::keyring),
        help("Use a profile's password_env or FLEETCMD_PASSWORD instead.")
    )]
    Keyring {
        #[source]
        source: ConfigError,
    },

    // ── Input files ──────────────────────────────────────────────────

    #[error("{what} not found: {}", path.display())]
    #[diagnostic(code(fleetcmd::not_found), help("Check the path and try again."))]
    FileNotFound { what: String, path: PathBuf },

    #[error("Cannot read {}", path.display())]
    #[diagnostic(code(fleetcmd::read))]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid device directory: {reason}")]
    #[diagnostic(
        code(fleetcmd::invalid_directory),
        help("Each line is `address` or `address;command`. Lines starting with # are ignored.")
    )]
    InvalidDirectory { reason: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(fleetcmd::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(fleetcmd::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: fleetcmd config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error(transparent)]
    #[diagnostic(
        code(fleetcmd::config),
        help("Check the config file with: fleetcmd config show")
    )]
    Config(ConfigError),

    // ── Run outcome ──────────────────────────────────────────────────

    #[error("{failed} of {attempted} work items failed")]
    #[diagnostic(
        code(fleetcmd::device_failures),
        help("Failed devices are listed above and in the log file, if one was configured.")
    )]
    DeviceFailures { failed: usize, attempted: usize },

    // ── IO ───────────────────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NoCredentials { .. } | Self::Keyring { .. } => exit_code::AUTH,
            Self::FileNotFound { .. } => exit_code::NOT_FOUND,
            Self::InvalidDirectory { .. } | Self::Validation { .. } => exit_code::USAGE,
            Self::DeviceFailures { .. } => exit_code::DEVICE_FAILURES,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidDirectory { reason } => CliError::InvalidDirectory { reason },

            CoreError::InvalidConfiguration { reason } => CliError::Validation {
                field: "run options".into(),
                reason,
            },

            CoreError::Read { path, source } if source.kind() == io::ErrorKind::NotFound => {
                CliError::FileNotFound {
                    what: "File".into(),
                    path,
                }
            }

            CoreError::Read { path, source } => CliError::ReadFailed { path, source },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::ProfileNotFound { name, available } => {
                CliError::ProfileNotFound { name, available }
            }
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            err @ ConfigError::Keyring(_) => CliError::Keyring { source: err },
            other => CliError::Config(other),
        }
    }
}
