//! Turning a directory into an ordered list of batches.

pub mod batch;
pub mod builder;

pub use batch::{Batch, partition};
pub use builder::build_work_items;

use crate::config::DispatchConfig;
use crate::error::CoreError;
use crate::model::DeviceDirectory;

/// Validate the configuration, build work items, and partition them.
///
/// Everything that can make a run fail as a whole happens here, before any
/// device is contacted.
pub fn plan(directory: &DeviceDirectory, config: &DispatchConfig) -> Result<Vec<Batch>, CoreError> {
    config.validate()?;
    let items = build_work_items(directory, config)?;
    partition(items, config.batch_size)
}

/// Total number of work items across `batches`.
pub fn item_count(batches: &[Batch]) -> usize {
    batches.iter().map(Batch::len).sum()
}
