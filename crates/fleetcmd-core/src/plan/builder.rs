// ── Work-item builder ──
//
// Flattens the device directory into an ordered list of work items.
// Config mode replaces every device's payloads with the shared snippet;
// show mode sends each directory payload, or the default command when a
// device has none.

use crate::config::DispatchConfig;
use crate::error::CoreError;
use crate::model::{DeviceDirectory, ExecutionMode, Payload, WorkItem};

/// Build the ordered work-item sequence for a run.
pub fn build_work_items(
    directory: &DeviceDirectory,
    config: &DispatchConfig,
) -> Result<Vec<WorkItem>, CoreError> {
    let mut items = Vec::with_capacity(directory.len());

    for (address, payloads) in directory.iter() {
        if address.trim().is_empty() {
            return Err(CoreError::invalid_directory("empty device address"));
        }

        match config.mode {
            ExecutionMode::Config => {
                items.push(WorkItem::new(
                    address,
                    Payload::Configuration(config.configuration.clone()),
                ));
            }
            ExecutionMode::Show if payloads.is_empty() => {
                items.push(WorkItem::command(address, config.default_command.clone()));
            }
            ExecutionMode::Show => {
                for (idx, raw) in payloads.iter().enumerate() {
                    let command = std::str::from_utf8(raw).map_err(|_| {
                        CoreError::invalid_directory(format!(
                            "payload #{} for {address} is not valid UTF-8",
                            idx + 1
                        ))
                    })?;
                    items.push(WorkItem::command(address, command));
                }
            }
        }
    }

    Ok(items)
}
