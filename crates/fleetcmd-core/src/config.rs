// ── Runtime dispatch configuration ──
//
// These types describe *what* a run does and *how* it logs in. They are
// immutable once built and passed explicitly into the planner and the
// runner. The CLI constructs them; core never reads config files.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::CoreError;
use crate::model::ExecutionMode;

/// Default number of work items per batch.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Default show-mode command when a device has no payload of its own.
pub const DEFAULT_COMMAND: &str = "show mac address-table | e CPU";

/// Login credentials shared read-only by every session in a run.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: SecretString) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }
}

/// How work items are admitted for execution.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Scheduling {
    /// Launch a whole batch, wait for every unit, then start the next one.
    #[default]
    Batched,
    /// Fixed number of workers draining one shared queue.
    Pool,
}

/// Immutable configuration for one dispatch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchConfig {
    pub mode: ExecutionMode,
    /// Command for devices with no payload of their own (show mode).
    pub default_command: String,
    /// Shared configuration lines (config mode only).
    pub configuration: Vec<String>,
    /// Batch capacity, or worker count in pool scheduling.
    pub batch_size: usize,
    pub scheduling: Scheduling,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::Show,
            default_command: DEFAULT_COMMAND.into(),
            configuration: Vec::new(),
            batch_size: DEFAULT_BATCH_SIZE,
            scheduling: Scheduling::Batched,
        }
    }
}

impl DispatchConfig {
    /// Show-mode configuration with the given default command.
    pub fn show(default_command: impl Into<String>) -> Self {
        Self {
            default_command: default_command.into(),
            ..Self::default()
        }
    }

    /// Config-mode configuration sending `lines` to every device.
    pub fn config(lines: Vec<String>) -> Self {
        Self {
            mode: ExecutionMode::Config,
            configuration: lines,
            ..Self::default()
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_scheduling(mut self, scheduling: Scheduling) -> Self {
        self.scheduling = scheduling;
        self
    }

    /// Reject option combinations that cannot describe a single run.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.batch_size == 0 {
            return Err(CoreError::invalid_configuration(
                "batch size must be at least 1",
            ));
        }

        match self.mode {
            ExecutionMode::Show => {
                if self.default_command.trim().is_empty() {
                    return Err(CoreError::invalid_configuration(
                        "show mode needs a non-empty default command",
                    ));
                }
                if !self.configuration.is_empty() {
                    return Err(CoreError::invalid_configuration(
                        "a configuration snippet was given but the mode is 'show'",
                    ));
                }
            }
            ExecutionMode::Config => {
                if self.configuration.is_empty() {
                    return Err(CoreError::invalid_configuration(
                        "config mode needs a non-empty configuration snippet",
                    ));
                }
            }
        }

        Ok(())
    }
}
