//! Ingest command: store one serialized status event.

use tokio::io::AsyncReadExt;

use sensilink_core::{FsRecordStore, ingest_message};

use crate::cli::{GlobalOpts, IngestArgs};
use crate::config;
use crate::error::CliError;

async fn read_input(input: &str) -> Result<String, CliError> {
    if input == "-" {
        let mut buf = String::new();
        tokio::io::stdin().read_to_string(&mut buf).await?;
        Ok(buf)
    } else {
        Ok(tokio::fs::read_to_string(input).await?)
    }
}

pub async fn handle(args: IngestArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let message = read_input(&args.input).await?;
    let store = FsRecordStore::new(config::resolve_store_dir(global)?);

    let event = ingest_message(&message, &store).await?;
    if !global.quiet {
        eprintln!(
            "✓ stored {} in {}",
            event.id(),
            store.dir().display()
        );
    }
    Ok(())
}
