//! Configuration for the fleetcmd CLI.
//!
//! TOML profiles, run defaults, and password resolution (env + keyring +
//! plaintext). The CLI layers its flags on top; `fleetcmd-core` only ever
//! sees the resolved `DispatchConfig`, `Credentials`, and `TransportConfig`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use fleetcmd_core::{DEFAULT_BATCH_SIZE, DEFAULT_COMMAND, Scheduling, TransportConfig};

/// Keyring service name under which passwords are stored.
pub const KEYRING_SERVICE: &str = "fleetcmd";

/// Environment variable that points at an alternative config file.
pub const CONFIG_PATH_ENV: &str = "FLEETCMD_CONFIG";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{name}' not found (available: {available})")]
    ProfileNotFound { name: String, available: String },

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Run defaults applied when neither a flag nor a profile overrides them.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named login profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    /// Show-mode command for devices without a payload of their own.
    #[serde(default = "default_command")]
    pub command: String,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default)]
    pub scheduling: Scheduling,

    /// Directory that receives the per-device artifacts.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,

    /// Seconds.
    #[serde(default = "default_read_timeout")]
    pub read_timeout: u64,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Durable diagnostic log, in addition to stderr.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,

}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            command: default_command(),
            batch_size: default_batch_size(),
            scheduling: Scheduling::default(),
            output_dir: default_output_dir(),
            connect_timeout: default_connect_timeout(),
            read_timeout: default_read_timeout(),
            port: default_port(),
            log_file: None,
        }
    }
}

fn default_command() -> String {
    DEFAULT_COMMAND.into()
}
fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}
fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}
fn default_connect_timeout() -> u64 {
    20
}
fn default_read_timeout() -> u64 {
    60
}
fn default_port() -> u16 {
    22
}

/// A named login profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Profile {
    /// Login name used on every device.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Environment variable name containing the password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_env: Option<String>,

    /// Password (plaintext, prefer keyring).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Override the SSH port.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Override the connect timeout (seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_timeout: Option<u64>,
}

impl Config {
    /// Name of the profile to use: explicit choice, else the configured
    /// default, else `"default"`.
    pub fn active_profile_name(&self, explicit: Option<&str>) -> String {
        explicit
            .or(self.default_profile.as_deref())
            .unwrap_or("default")
            .to_owned()
    }

    /// Look up a profile by name.
    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::ProfileNotFound {
                name: name.into(),
                available: self.available_profiles(),
            })
    }

    /// Comma-separated profile names, or `(none)`.
    pub fn available_profiles(&self) -> String {
        if self.profiles.is_empty() {
            "(none)".into()
        } else {
            self.profiles
                .keys()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        }
    }

    /// Set one key. `defaults.*` keys go to the run defaults; anything else
    /// addresses the named profile, which is created on demand.
    pub fn set_value(
        &mut self,
        profile_name: &str,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let key = key.replace('-', "_");

        if let Some(default_key) = key.strip_prefix("defaults.") {
            return self.defaults.set_value(default_key, value);
        }

        let profile = self.profiles.entry(profile_name.to_owned()).or_default();
        match key.as_str() {
            "username" => profile.username = Some(value.into()),
            "password_env" => profile.password_env = Some(value.into()),
            "password" => profile.password = Some(value.into()),
            "port" => profile.port = Some(parse_field("port", value)?),
            "connect_timeout" => {
                profile.connect_timeout = Some(parse_field("connect_timeout", value)?);
            }
            other => {
                return Err(ConfigError::Validation {
                    field: other.into(),
                    reason: format!(
                        "unknown config key '{other}'. Valid keys: username, password_env, \
                         password, port, connect_timeout, defaults.<key>"
                    ),
                });
            }
        }
        Ok(())
    }

    /// Transport settings for a run: profile overrides over `[defaults]`.
    pub fn transport_config(&self, profile: Option<&Profile>) -> TransportConfig {
        let port = profile.and_then(|p| p.port).unwrap_or(self.defaults.port);
        let connect_timeout = profile
            .and_then(|p| p.connect_timeout)
            .unwrap_or(self.defaults.connect_timeout);

        TransportConfig {
            port,
            connect_timeout: Duration::from_secs(connect_timeout),
            read_timeout: Duration::from_secs(self.defaults.read_timeout),
            ..TransportConfig::default()
        }
    }
}

impl Defaults {
    fn set_value(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "command" => self.command = value.into(),
            "batch_size" => {
                let size: usize = parse_field("batch_size", value)?;
                if size == 0 {
                    return Err(ConfigError::Validation {
                        field: "batch_size".into(),
                        reason: "must be at least 1".into(),
                    });
                }
                self.batch_size = size;
            }
            "scheduling" => self.scheduling = parse_field("scheduling", value)?,
            "output_dir" => self.output_dir = PathBuf::from(value),
            "connect_timeout" => self.connect_timeout = parse_field("connect_timeout", value)?,
            "read_timeout" => self.read_timeout = parse_field("read_timeout", value)?,
            "port" => self.port = parse_field("port", value)?,
            "log_file" => self.log_file = Some(PathBuf::from(value)),
            other => {
                return Err(ConfigError::Validation {
                    field: format!("defaults.{other}"),
                    reason: "unknown key. Valid keys: command, batch_size, scheduling, \
                             output_dir, connect_timeout, read_timeout, port, log_file"
                        .into(),
                });
            }
        }
        Ok(())
    }
}

fn parse_field<T>(field: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::Validation {
        field: field.into(),
        reason: format!("'{value}': {e}"),
    })
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path: `FLEETCMD_CONFIG`, else XDG / platform
/// conventions.
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
        return PathBuf::from(path);
    }

    ProjectDirs::from("com", "fleetcmd", "fleetcmd").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("fleetcmd");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the Config from `path` + `FLEETCMD_*` environment.
///
/// Nested keys use a double underscore: `FLEETCMD_DEFAULTS__BATCH_SIZE=50`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");

    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(
            Env::prefixed("FLEETCMD_")
                .ignore(&["config", "password", "username", "profile"])
                .split("__"),
        );

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution (without CLI flags) ───────────────────────

fn keyring_entry(profile_name: &str) -> Result<keyring::Entry, ConfigError> {
    Ok(keyring::Entry::new(
        KEYRING_SERVICE,
        &format!("{profile_name}/password"),
    )?)
}

/// Resolve the device password from the profile's credential chain:
/// `password_env` variable, then the system keyring, then plaintext.
pub fn resolve_password(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    // 1. Profile's password_env → env var lookup
    if let Some(ref env_name) = profile.password_env {
        if let Ok(val) = std::env::var(env_name) {
            debug!(profile = profile_name, "password from environment");
            return Ok(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring_entry(profile_name) {
        if let Ok(secret) = entry.get_password() {
            debug!(profile = profile_name, "password from keyring");
            return Ok(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    if let Some(ref pw) = profile.password {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Store a profile's password in the system keyring.
pub fn store_password(profile_name: &str, password: &SecretString) -> Result<(), ConfigError> {
    keyring_entry(profile_name)?.set_password(password.expose_secret())?;
    Ok(())
}
