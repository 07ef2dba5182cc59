//! Stderr log writer that stays out of the way of an active progress bar.
//!
//! While a bar is attached, every log write hides the bar, writes, and
//! redraws it, so diagnostics never land in the middle of the bar line.

use std::io::{self, Write};
use std::sync::RwLock;

use indicatif::ProgressBar;

static ACTIVE: RwLock<Option<ProgressBar>> = RwLock::new(None);

/// Keeps a bar attached to the log writer until dropped.
#[must_use = "the bar is detached as soon as this is dropped"]
pub struct Attached(());

impl Drop for Attached {
    fn drop(&mut self) {
        if let Ok(mut slot) = ACTIVE.write() {
            *slot = None;
        }
    }
}

/// Route stderr log output around `bar` for as long as the guard lives.
pub fn attach(bar: &ProgressBar) -> Attached {
    if let Ok(mut slot) = ACTIVE.write() {
        *slot = Some(bar.clone());
    }
    Attached(())
}

fn active() -> Option<ProgressBar> {
    ACTIVE.read().ok().and_then(|slot| slot.clone())
}

/// `MakeWriter` for the stderr tracing layer.
pub fn log_writer() -> LogWriter {
    LogWriter
}

pub struct LogWriter;

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match active() {
            Some(bar) => bar.suspend(|| io::stderr().write(buf)),
            None => io::stderr().write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}
