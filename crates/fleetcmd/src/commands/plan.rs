//! `plan`: build and partition work items, print them, touch nothing.

use serde::Serialize;
use tabled::Tabled;

use fleetcmd_core::{Batch, Payload, WorkItem, plan};

use crate::cli::{GlobalOpts, PlanArgs};
use crate::config;
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct PlanRow {
    #[tabled(rename = "Batch")]
    batch: usize,
    #[tabled(rename = "Device")]
    device: String,
    #[tabled(rename = "Mode")]
    mode: String,
    #[tabled(rename = "Payload")]
    payload: String,
}

/// One planned work item with its batch position, for serialized output.
#[derive(Serialize)]
struct PlannedItem<'a> {
    batch: usize,
    #[serde(flatten)]
    item: &'a WorkItem,
}

fn planned(batches: &[Batch]) -> Vec<PlannedItem<'_>> {
    batches
        .iter()
        .flat_map(|b| b.items.iter().map(move |item| PlannedItem { batch: b.index, item }))
        .collect()
}

fn to_row(p: &PlannedItem<'_>) -> PlanRow {
    PlanRow {
        batch: p.batch,
        device: p.item.device.clone(),
        mode: p.item.payload.mode().to_string(),
        payload: match &p.item.payload {
            Payload::Command(command) => command.clone(),
            Payload::Configuration(lines) => lines.join("\n"),
        },
    }
}

fn to_line(p: &PlannedItem<'_>) -> String {
    format!("{}\t{}\t{}", p.batch, p.item.device, p.item.payload)
}

pub fn handle(args: &PlanArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::load_config()?;
    let dispatch = config::dispatch_config(&args.selection, &cfg)?;
    let directory = config::load_directory(&args.selection.devices)?;

    let batches = plan::plan(&directory, &dispatch)?;
    let items = planned(&batches);

    let out = output::render_list(&global.output, &items, to_row, to_line);
    output::print_output(&out, global.quiet);

    if !global.quiet {
        eprintln!(
            "{} work items for {} devices in {} batches of up to {} ({})",
            items.len(),
            directory.len(),
            batches.len(),
            dispatch.batch_size,
            dispatch.scheduling,
        );
    }
    Ok(())
}
