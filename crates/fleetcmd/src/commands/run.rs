//! `run`: dispatch every work item, stream results into artifacts, and
//! print a summary.

use std::io::{self, IsTerminal};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use tracing::info;

use fleetcmd_core::{
    Dispatcher, ExecutionResult, FileSink, ResultSink, RunSummary, SshConnector, plan,
};

use crate::cli::{GlobalOpts, RunArgs};
use crate::config;
use crate::error::CliError;
use crate::output;
use crate::progress;

// ── Progress sink ────────────────────────────────────────────────────

/// Wraps the artifact sink with a progress bar and outcome counters.
struct ProgressSink {
    inner: FileSink,
    bar: ProgressBar,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
}

impl ProgressSink {
    fn new(inner: FileSink, total: usize, visible: bool) -> Self {
        let bar = if visible {
            let bar = ProgressBar::new(u64::try_from(total).unwrap_or(u64::MAX));
            bar.set_style(
                ProgressStyle::with_template(
                    "{spinner} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            bar.enable_steady_tick(Duration::from_millis(120));
            bar
        } else {
            ProgressBar::hidden()
        };

        Self {
            inner,
            bar,
            succeeded: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
        }
    }

    fn succeeded(&self) -> usize {
        self.succeeded.load(Ordering::Relaxed)
    }

    fn failed(&self) -> usize {
        self.failed.load(Ordering::Relaxed)
    }
}

impl ResultSink for ProgressSink {
    async fn record(&self, result: &ExecutionResult) {
        self.inner.record(result).await;

        if result.is_success() {
            self.succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
            self.bar.set_message(format!("{} failed", self.failed()));
        }
        self.bar.inc(1);
    }
}

// ── Handler ──────────────────────────────────────────────────────────

pub async fn handle(args: &RunArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::load_config()?;
    let dispatch = config::dispatch_config(&args.selection, &cfg)?;
    let directory = config::load_directory(&args.selection.devices)?;

    // Plan before asking for credentials so bad input fails fast.
    let batches = plan::plan(&directory, &dispatch)?;
    let total = plan::item_count(&batches);

    let credentials = config::resolve_credentials(global, &cfg)?;
    let profile = config::active_profile(global, &cfg)?;
    let transport = config::transport_config(args, &cfg, profile);

    let output_dir = config::output_dir(args, &cfg);
    std::fs::create_dir_all(&output_dir)?;

    info!(
        devices = directory.len(),
        items = total,
        batches = batches.len(),
        mode = %dispatch.mode,
        scheduling = %dispatch.scheduling,
        output_dir = %output_dir.display(),
        "starting run"
    );

    let show_bar = !global.quiet && global.verbose == 0 && io::stderr().is_terminal();
    let sink = Arc::new(ProgressSink::new(
        FileSink::new(&output_dir),
        total,
        show_bar,
    ));

    // Failure diagnostics are logged to stderr while the bar is drawn there.
    let attached = show_bar.then(|| progress::attach(&sink.bar));

    let dispatcher = Dispatcher::new(
        dispatch,
        SshConnector::new(transport),
        credentials,
        Arc::clone(&sink),
    );
    let summary = dispatcher.run(&directory).await;
    drop(attached);
    sink.bar.finish_and_clear();
    let summary = summary?;

    let succeeded = sink.succeeded();
    let failed = sink.failed();

    if !global.quiet {
        print_summary(&summary, total, succeeded, failed, &output_dir, global);
    }

    if args.fail_on_error && failed > 0 {
        return Err(CliError::DeviceFailures {
            failed,
            attempted: total,
        });
    }
    Ok(())
}

fn print_summary(
    summary: &RunSummary,
    attempted: usize,
    succeeded: usize,
    failed: usize,
    output_dir: &Path,
    global: &GlobalOpts,
) {
    let color = output::should_color(&global.color);
    let millis = u64::try_from(summary.elapsed.as_millis()).unwrap_or(u64::MAX);
    let elapsed = humantime::format_duration(Duration::from_millis(millis)).to_string();

    let failed_text = failed.to_string();
    let failed_text = if color && failed > 0 {
        failed_text.red().bold().to_string()
    } else {
        failed_text
    };
    let headline = if color {
        format!("{} Operation took {}", "✓".green(), elapsed.bold())
    } else {
        format!("Operation took {elapsed}")
    };

    eprintln!();
    eprintln!("{headline}");
    eprintln!(
        "  Started:   {}",
        summary.started_at.format("%Y-%m-%d %H:%M:%S")
    );
    eprintln!("  Attempted: {attempted}");
    eprintln!("  Succeeded: {succeeded}");
    eprintln!("  Failed:    {failed_text}");
    eprintln!("  Results:   {}", output_dir.display());
}
