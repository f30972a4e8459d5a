//! Records command: inspect the local record store.

use tabled::Tabled;

use sensilink_core::{FsRecordStore, ProjectionRecord, StoredRecord};

use crate::cli::{GlobalOpts, RecordsArgs};
use crate::config;
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct RecordRow {
    #[tabled(rename = "Event")]
    id: String,
    #[tabled(rename = "Device")]
    device: String,
    #[tabled(rename = "Stored")]
    stored_at: String,
    #[tabled(rename = "Mode")]
    mode: String,
}

impl RecordRow {
    fn new(record: &StoredRecord, color: bool) -> Self {
        let status = record.event.device_status();
        Self {
            id: record.event.id().to_string(),
            device: record.event.device_id().to_owned(),
            stored_at: record.stored_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            mode: util::mode_of(status).map_or_else(|| "-".into(), |m| output::paint_mode(m, color)),
        }
    }
}

pub async fn handle(args: RecordsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let store = FsRecordStore::new(config::resolve_store_dir(global)?);
    let mut records = store.records().await?;
    if let Some(limit) = args.limit {
        let skip = records.len().saturating_sub(limit);
        records.drain(..skip);
    }

    let color = output::should_color(&global.color);
    let out = if args.projected {
        let projected: Vec<ProjectionRecord> = records.iter().map(StoredRecord::project).collect();
        output::render_list(
            &global.output,
            &projected,
            |r| util::ProjectionRow::new(r, color),
            |r| r.id.to_string(),
        )?
    } else {
        output::render_list(
            &global.output,
            &records,
            |r| RecordRow::new(r, color),
            |r| r.event.id().to_string(),
        )?
    };
    output::print_output(&out, global.quiet);
    Ok(())
}
