//! Clap derive structures for the `fleetcmd` CLI.
//!
//! Defines the command tree, global flags, and shared value enums.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// fleetcmd -- batch SSH command runner for network device fleets
#[derive(Debug, Parser)]
#[command(
    name = "fleetcmd",
    version,
    about = "Run show commands and configuration sets across network device fleets",
    long_about = "Reads a device directory (one `address;payload` record per line), logs in\n\
        to every device over SSH with bounded concurrency, and appends each device's\n\
        output to its own text artifact. A failing device never stops the run.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Login profile to use
    #[arg(long, short = 'p', env = "FLEETCMD_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Device login name (overrides profile)
    #[arg(long, short = 'u', env = "FLEETCMD_USERNAME", global = true)]
    pub username: Option<String>,

    /// Device password (prefer the keyring or a profile's password_env)
    #[arg(
        long,
        env = "FLEETCMD_PASSWORD",
        global = true,
        hide = true,
        hide_env_values = true
    )]
    pub password: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "FLEETCMD_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Also write a plain-text diagnostic log to this file
    #[arg(long, env = "FLEETCMD_LOG_FILE", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one record per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModeArg {
    /// One read-only command per work item
    Show,
    /// The same configuration snippet applied to every device
    Config,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SchedulingArg {
    /// Whole batches with a barrier between them
    Batched,
    /// Fixed worker pool draining one queue
    Pool,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Dispatch work items to every device in the directory
    #[command(alias = "r")]
    Run(RunArgs),

    /// Build and partition work items without contacting any device
    #[command(alias = "p")]
    Plan(PlanArgs),

    /// Manage configuration profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  RUN / PLAN
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// What to run and how to batch it. Shared by `run` and `plan`.
#[derive(Debug, Args)]
pub struct SelectionArgs {
    /// Device directory: one `address;payload` record per line
    #[arg(long, short = 'd', value_name = "FILE")]
    pub devices: PathBuf,

    /// Execution mode
    #[arg(long, short = 'm', value_enum, default_value = "show")]
    pub mode: ModeArg,

    /// Show-mode command for devices without a payload of their own
    #[arg(long, short = 'c', value_name = "COMMAND")]
    pub command: Option<String>,

    /// Configuration snippet sent to every device (config mode)
    #[arg(long, short = 's', value_name = "FILE")]
    pub snippet: Option<PathBuf>,

    /// Work items per batch (worker count with --scheduling pool)
    #[arg(long, short = 'b', env = "FLEETCMD_BATCH_SIZE", value_name = "N")]
    pub batch_size: Option<usize>,

    /// How work items are admitted
    #[arg(long, value_enum, env = "FLEETCMD_SCHEDULING")]
    pub scheduling: Option<SchedulingArg>,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Directory for the per-device result artifacts
    #[arg(long, env = "FLEETCMD_OUTPUT_DIR", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Seconds allowed for connect + login
    #[arg(long, value_name = "SECS")]
    pub connect_timeout: Option<u64>,

    /// Seconds allowed for a device to return its prompt
    #[arg(long, value_name = "SECS")]
    pub read_timeout: Option<u64>,

    /// SSH port
    #[arg(long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Exit with status 9 when any device failed
    #[arg(long)]
    pub fail_on_error: bool,
}

#[derive(Debug, Args)]
pub struct PlanArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current resolved configuration
    Show,

    /// Set a configuration value
    Set {
        /// Profile key (username, password_env, port, ...) or defaults.<key>
        key: String,

        /// Value to set
        value: String,
    },

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store a device password in the system keyring
    SetPassword {
        /// Profile name
        #[arg(long)]
        profile: Option<String>,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
