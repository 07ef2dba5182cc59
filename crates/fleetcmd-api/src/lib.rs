//! Async SSH client for driving network device CLIs.
//!
//! - **[`SshSession`]**: one authenticated PTY shell per device, with prompt
//!   detection, paging suppression, single commands, and configuration sets.
//! - **[`TransportConfig`]**: port, timeouts, and terminal preparation shared
//!   by every session of a run.
//! - **[`prompt`]**: pure helpers for prompt matching and output cleanup.
//!
//! `fleetcmd-core` consumes this crate through its `DeviceSession` seam and
//! maps [`Error`] into per-device failure kinds.

pub mod error;
pub mod prompt;
pub mod ssh;
pub mod transport;

pub use error::Error;
pub use ssh::SshSession;
pub use transport::TransportConfig;
