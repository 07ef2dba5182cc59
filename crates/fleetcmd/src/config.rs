//! Resolution of run options and credentials.
//!
//! Precedence for every option: CLI flag (or its env var) > profile >
//! `[defaults]` > built-in default. Core receives only the resolved
//! `DispatchConfig`, `Credentials`, and `TransportConfig`.

use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::time::Duration;

use dialoguer::Input;
use secrecy::SecretString;
use tracing::debug;

use fleetcmd_config::{Config, ConfigError, Profile};
use fleetcmd_core::model::read_snippet;
use fleetcmd_core::{
    CoreError, Credentials, DeviceDirectory, DispatchConfig, ExecutionMode, Scheduling,
    TransportConfig,
};

use crate::cli::{GlobalOpts, ModeArg, RunArgs, SchedulingArg, SelectionArgs};
use crate::error::CliError;

pub use fleetcmd_config::{config_path, load_config, save_config};

impl From<ModeArg> for ExecutionMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Show => Self::Show,
            ModeArg::Config => Self::Config,
        }
    }
}

impl From<SchedulingArg> for Scheduling {
    fn from(scheduling: SchedulingArg) -> Self {
        match scheduling {
            SchedulingArg::Batched => Self::Batched,
            SchedulingArg::Pool => Self::Pool,
        }
    }
}

/// Name of the active profile: `--profile`, else the configured default.
pub fn active_profile_name(global: &GlobalOpts, cfg: &Config) -> String {
    cfg.active_profile_name(global.profile.as_deref())
}

/// The active profile, if one is configured. An explicitly requested
/// profile that does not exist is an error.
pub fn active_profile<'a>(global: &GlobalOpts, cfg: &'a Config) -> Result<Option<&'a Profile>, CliError> {
    let name = active_profile_name(global, cfg);
    match cfg.profile(&name) {
        Ok(profile) => Ok(Some(profile)),
        Err(err) if global.profile.is_some() => Err(err.into()),
        Err(_) => Ok(None),
    }
}

// ── Run options ──────────────────────────────────────────────────────

/// Build the dispatch configuration from flags over config defaults.
pub fn dispatch_config(selection: &SelectionArgs, cfg: &Config) -> Result<DispatchConfig, CliError> {
    let configuration = match selection.snippet {
        Some(ref path) => read_snippet(path).map_err(|e| not_found_as(e, "Configuration snippet"))?,
        None => Vec::new(),
    };

    Ok(DispatchConfig {
        mode: selection.mode.into(),
        default_command: selection
            .command
            .clone()
            .unwrap_or_else(|| cfg.defaults.command.clone()),
        configuration,
        batch_size: selection.batch_size.unwrap_or(cfg.defaults.batch_size),
        scheduling: selection
            .scheduling
            .map_or(cfg.defaults.scheduling, Into::into),
    })
}

/// Read and parse the device directory.
pub fn load_directory(path: &Path) -> Result<DeviceDirectory, CliError> {
    let directory = DeviceDirectory::from_path(path).map_err(|e| not_found_as(e, "Device directory"))?;
    debug!(path = %path.display(), devices = directory.len(), "device directory loaded");
    Ok(directory)
}

fn not_found_as(err: CoreError, what: &str) -> CliError {
    match err {
        CoreError::Read { path, source } if source.kind() == io::ErrorKind::NotFound => {
            CliError::FileNotFound {
                what: what.into(),
                path,
            }
        }
        other => other.into(),
    }
}

/// Transport settings: flags over profile over `[defaults]`.
pub fn transport_config(args: &RunArgs, cfg: &Config, profile: Option<&Profile>) -> TransportConfig {
    let mut transport = cfg.transport_config(profile);
    if let Some(port) = args.port {
        transport.port = port;
    }
    if let Some(secs) = args.connect_timeout {
        transport.connect_timeout = Duration::from_secs(secs);
    }
    if let Some(secs) = args.read_timeout {
        transport.read_timeout = Duration::from_secs(secs);
    }
    transport
}

/// Artifact directory: `--output-dir` over `[defaults] output_dir`.
pub fn output_dir(args: &RunArgs, cfg: &Config) -> PathBuf {
    args.output_dir
        .clone()
        .unwrap_or_else(|| cfg.defaults.output_dir.clone())
}

// ── Credentials ──────────────────────────────────────────────────────

/// Resolve login credentials.
///
/// Username: `--username` / `FLEETCMD_USERNAME` → profile → prompt.
/// Password: `--password` / `FLEETCMD_PASSWORD` → profile's `password_env`
/// → keyring → plaintext → prompt. Prompts only happen on a terminal.
pub fn resolve_credentials(global: &GlobalOpts, cfg: &Config) -> Result<Credentials, CliError> {
    let profile_name = active_profile_name(global, cfg);
    let profile = active_profile(global, cfg)?;
    let interactive = io::stdin().is_terminal();

    let username = match global
        .username
        .clone()
        .or_else(|| profile.and_then(|p| p.username.clone()))
    {
        Some(username) => username,
        None if interactive => prompt_username()?,
        None => {
            return Err(CliError::NoCredentials {
                profile: profile_name,
            });
        }
    };

    let password = if let Some(ref pw) = global.password {
        SecretString::from(pw.clone())
    } else {
        let from_profile = match profile {
            Some(p) => match fleetcmd_config::resolve_password(p, &profile_name) {
                Ok(pw) => Some(pw),
                Err(ConfigError::NoCredentials { .. }) => None,
                Err(e) => return Err(e.into()),
            },
            None => None,
        };

        match from_profile {
            Some(pw) => pw,
            None if interactive => prompt_password(&username)?,
            None => {
                return Err(CliError::NoCredentials {
                    profile: profile_name,
                });
            }
        }
    };

    Ok(Credentials::new(username, password))
}

/// Map a dialoguer / interactive I/O failure into CliError.
pub fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn prompt_username() -> Result<String, CliError> {
    let username: String = Input::new()
        .with_prompt("Username")
        .interact_text()
        .map_err(prompt_err)?;
    Ok(username)
}

fn prompt_password(username: &str) -> Result<SecretString, CliError> {
    let pw = rpassword::prompt_password(format!("Password for {username}: ")).map_err(prompt_err)?;
    if pw.is_empty() {
        return Err(CliError::Validation {
            field: "password".into(),
            reason: "password cannot be empty".into(),
        });
    }
    Ok(SecretString::from(pw))
}
