//! Relay command: project stored records and stream them as one batch.

use sensilink_core::{BatchSink, FsRecordStore, WebhookSink, stream_records};

use crate::cli::{GlobalOpts, RelayArgs, RelayTarget};
use crate::config::{self, Endpoint};
use crate::error::CliError;
use crate::output;
use crate::sink::StdoutSink;

pub async fn handle(args: RelayArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let store = FsRecordStore::new(config::resolve_store_dir(global)?);
    let records = store.records().await?;

    let sink: Box<dyn BatchSink> = match args.to {
        RelayTarget::Stdout => Box::new(StdoutSink::new(
            global.output.clone(),
            output::should_color(&global.color),
            global.quiet,
        )),
        RelayTarget::Batch => {
            let url = config::resolve_endpoint(global, args.batch_url.as_deref(), Endpoint::Batch)?;
            Box::new(WebhookSink::new(url, config::sink_timeout(global))?)
        }
    };

    let count = stream_records(&records, sink.as_ref()).await?;
    if matches!(args.to, RelayTarget::Batch) && !global.quiet {
        eprintln!("✓ streamed {count} record(s)");
    }
    Ok(())
}
