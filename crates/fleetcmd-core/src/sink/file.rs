// ── Per-device text artifacts ──
//
// One append-mode file per device, `<address>_<hostname>.txt`, shared by
// every payload that device receives in a run. Appends to the same file
// are serialised through a per-artifact lock and each record goes out in a
// single write.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use super::ResultSink;
use crate::error::SinkError;
use crate::model::{ExecutionResult, Payload, Success};

const BANNER_WIDTH: usize = 72;
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Writes successes to per-device artifacts under one output directory.
/// Failures go to the diagnostic stream only.
#[derive(Debug)]
pub struct FileSink {
    dir: PathBuf,
    locks: DashMap<PathBuf, Arc<Mutex<()>>>,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            locks: DashMap::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Full path of the artifact for `success`.
    pub fn artifact_path(&self, success: &Success) -> PathBuf {
        self.dir
            .join(artifact_name(&success.device, &success.hostname))
    }

    /// Append one rendered record to the device's artifact.
    pub async fn try_record(&self, success: &Success) -> Result<PathBuf, SinkError> {
        let path = self.artifact_path(success);
        let record = render_record(success);

        let lock = self.lock_for(&path);
        let _guard = lock.lock().await;

        let sink_error = |source| SinkError {
            device: success.device.clone(),
            path: path.clone(),
            source,
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(sink_error)?;
        file.write_all(record.as_bytes())
            .await
            .map_err(sink_error)?;
        file.flush().await.map_err(sink_error)?;

        Ok(path)
    }

    fn lock_for(&self, path: &Path) -> Arc<Mutex<()>> {
        // Clone out of the map so the shard guard is released before awaiting.
        Arc::clone(
            self.locks
                .entry(path.to_path_buf())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        )
    }
}

impl ResultSink for FileSink {
    async fn record(&self, result: &ExecutionResult) {
        match result {
            ExecutionResult::Success(success) => match self.try_record(success).await {
                Ok(path) => debug!(device = %success.device, path = %path.display(), "result recorded"),
                Err(e) => error!(device = %success.device, error = %e, "result not recorded"),
            },
            ExecutionResult::Failure(failure) => {
                warn!(device = %failure.device, kind = %failure.kind, "{}", failure.diagnostic_line());
            }
        }
    }
}

/// Artifact file name for a device: `<address>_<hostname>.txt`, with any
/// character outside `[A-Za-z0-9._-]` replaced by `_`.
pub fn artifact_name(address: &str, hostname: &str) -> String {
    let mut name = String::with_capacity(address.len() + hostname.len() + 5);
    for c in address.chars().chain(std::iter::once('_')).chain(hostname.chars()) {
        name.push(if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
            c
        } else {
            '_'
        });
    }
    name.push_str(".txt");
    name
}

/// Render one delimited success record: banner, identity, payload echo,
/// separator, captured output, trailing newline.
pub fn render_record(success: &Success) -> String {
    let timestamp = success.timestamp.format(TIMESTAMP_FORMAT);
    let mut out = String::with_capacity(success.output.len() + 256);

    let _ = writeln!(out, "{}", "=".repeat(BANNER_WIDTH));
    let _ = writeln!(out, "Hostname  : {}", success.hostname);
    let _ = writeln!(out, "IP        : {}", success.device);
    let _ = writeln!(out, "Timestamp : {timestamp}");
    match &success.payload {
        Payload::Command(command) => {
            let _ = writeln!(out, "Command   : {command}");
        }
        Payload::Configuration(lines) => {
            let _ = writeln!(out, "Configuration :");
            for line in lines {
                let _ = writeln!(out, "    {line}");
            }
        }
    }
    let _ = writeln!(out, "{}", "-".repeat(BANNER_WIDTH));
    out.push_str(&success.output);
    if !success.output.ends_with('\n') {
        out.push('\n');
    }
    out
}
