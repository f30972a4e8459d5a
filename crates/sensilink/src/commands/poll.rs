//! Poll command: fetch status on a cadence and deliver each event.

use std::time::Duration;

use tracing::{debug, warn};

use sensilink_core::{
    EventSink, FsRecordStore, InvocationContext, StatusPoller, WebhookSink, relay_status,
};

use crate::cli::{GlobalOpts, PollArgs, PollTarget};
use crate::config::{self, Endpoint};
use crate::error::CliError;
use crate::output;
use crate::sink::StdoutSink;

fn build_sink(args: &PollArgs, global: &GlobalOpts) -> Result<Box<dyn EventSink>, CliError> {
    let sink: Box<dyn EventSink> = match args.to {
        PollTarget::Stdout => Box::new(StdoutSink::new(
            global.output.clone(),
            output::should_color(&global.color),
            global.quiet,
        )),
        PollTarget::Store => Box::new(FsRecordStore::new(config::resolve_store_dir(global)?)),
        PollTarget::Topic => {
            let url = config::resolve_endpoint(global, args.topic_url.as_deref(), Endpoint::Topic)?;
            Box::new(WebhookSink::new(url, config::sink_timeout(global))?)
        }
    };
    Ok(sink)
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: PollArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let poller_config = config::resolve_poller_config(global)?;
    let poller = StatusPoller::from_config(&poller_config)?;
    let sink = build_sink(&args, global)?;

    let result = run_cycles(&poller, sink.as_ref(), &args, global).await;

    // The cached policy leaves a connection open between cycles.
    if let Err(err) = poller.close().await {
        warn!(error = %err, "failed to close cached session");
    }
    result
}

async fn run_cycles(
    poller: &StatusPoller,
    sink: &dyn EventSink,
    args: &PollArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let mut cycle: u64 = 0;
    loop {
        cycle += 1;
        let last = args.count != 0 && cycle >= args.count;
        let ctx = InvocationContext::now();

        match relay_status(poller, &ctx, sink).await {
            Ok(event) => {
                debug!(cycle, event_id = %event.id(), "cycle complete");
                if !matches!(args.to, PollTarget::Stdout) && !global.quiet {
                    eprintln!("✓ status {} delivered", event.id());
                }
            }
            // Between cycles, expiry and empty polls are routine; the next
            // cycle re-handshakes or polls again.
            Err(err) if !last && err.is_recoverable() => {
                warn!(cycle, error = %err, "cycle produced no status");
            }
            Err(err) => return Err(err.into()),
        }

        if last {
            return Ok(());
        }

        tokio::select! {
            () = tokio::time::sleep(Duration::from_secs(args.interval)) => {}
            _ = tokio::signal::ctrl_c() => {
                debug!("interrupted; stopping");
                return Ok(());
            }
        }
    }
}
