mod cli;
mod commands;
mod config;
mod error;
mod output;
mod progress;

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use crate::cli::{Cli, Command};
use crate::error::CliError;

/// Filter for the durable log file, independent of `-v`.
const FILE_FILTER: &str = "info,fleetcmd=debug,fleetcmd_core=debug,fleetcmd_api=debug";

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Hold the guard so buffered file logs are flushed on exit.
    let log_file = resolve_log_file(&cli);
    let _log_guard = init_tracing(cli.global.verbose, log_file.as_deref());

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

/// `--log-file`, else `[defaults] log_file` from the config file.
fn resolve_log_file(cli: &Cli) -> Option<PathBuf> {
    cli.global.log_file.clone().or_else(|| {
        fleetcmd_config::load_config()
            .ok()
            .and_then(|cfg| cfg.defaults.log_file)
    })
}

fn init_tracing(verbosity: u8, log_file: Option<&Path>) -> Option<WorkerGuard> {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let stderr_layer = fmt::layer()
        .with_writer(progress::log_writer)
        .with_target(false)
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)));

    let (file_layer, guard) = match log_file.map(file_writer) {
        Some(Ok((writer, guard))) => {
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_filter(EnvFilter::new(FILE_FILTER));
            (Some(layer), Some(guard))
        }
        Some(Err(e)) => {
            eprintln!("warning: log file disabled: {e}");
            (None, None)
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();

    guard
}

fn file_writer(
    path: &Path,
) -> Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard), String> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let name = path.file_name().unwrap_or(OsStr::new("fleetcmd.log"));

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(name.to_string_lossy())
        .build(dir)
        .map_err(|e| format!("{}: {e}", path.display()))?;

    Ok(tracing_appender::non_blocking(appender))
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "fleetcmd", &mut std::io::stdout());
            Ok(())
        }

        Command::Plan(args) => commands::plan::handle(&args, &cli.global),

        Command::Run(args) => {
            tracing::debug!(devices = %args.selection.devices.display(), "dispatching run");
            commands::run::handle(&args, &cli.global).await
        }
    }
}
