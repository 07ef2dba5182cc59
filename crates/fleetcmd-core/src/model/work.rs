use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Run-wide execution mode, fixed before any work item is built.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ExecutionMode {
    /// One read-only command per work item.
    #[default]
    Show,
    /// The same ordered configuration transaction for every device.
    Config,
}

/// What gets sent to a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Payload {
    /// A single command line (show mode).
    Command(String),
    /// Ordered configuration lines, sent as one transaction (config mode).
    Configuration(Vec<String>),
}

impl Payload {
    /// The mode this payload belongs to.
    pub fn mode(&self) -> ExecutionMode {
        match self {
            Self::Command(_) => ExecutionMode::Show,
            Self::Configuration(_) => ExecutionMode::Config,
        }
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command(command) => f.write_str(command),
            Self::Configuration(lines) => f.write_str(&lines.join("; ")),
        }
    }
}

/// One unit of work: a payload for a device. Consumed exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub device: String,
    pub payload: Payload,
}

impl WorkItem {
    pub fn new(device: impl Into<String>, payload: Payload) -> Self {
        Self {
            device: device.into(),
            payload,
        }
    }

    pub fn command(device: impl Into<String>, command: impl Into<String>) -> Self {
        Self::new(device, Payload::Command(command.into()))
    }
}
