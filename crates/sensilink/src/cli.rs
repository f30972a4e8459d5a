//! Clap derive structures for the `sensilink` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use sensilink_core::LifecyclePolicy;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// sensilink -- relay Sensi thermostat status to local sinks
#[derive(Debug, Parser)]
#[command(
    name = "sensilink",
    version,
    about = "Poll Sensi thermostats and relay their status",
    long_about = "Fetches thermostat status over the Sensi cloud's realtime long-poll\n\
        session and relays it to a local record store, a webhook topic,\n\
        or stdout. Stored records can be projected and streamed in batches.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Account profile to use
    #[arg(long, short = 'p', env = "SENSILINK_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Service root URL (overrides profile)
    #[arg(long, env = "SENSILINK_BASE_URL", global = true)]
    pub base_url: Option<String>,

    /// Account username (overrides profile)
    #[arg(long, short = 'u', env = "SENSILINK_USERNAME", global = true, hide_env = true)]
    pub username: Option<String>,

    /// Thermostat device id (overrides profile)
    #[arg(long, short = 'd', env = "SENSILINK_DEVICE", global = true)]
    pub device: Option<String>,

    /// Session lifecycle policy
    #[arg(long, env = "SENSILINK_POLICY", global = true)]
    pub policy: Option<LifecyclePolicy>,

    /// Record store directory (overrides profile)
    #[arg(long, env = "SENSILINK_STORE_DIR", global = true)]
    pub store_dir: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "SENSILINK_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines on stderr
    #[arg(long, env = "SENSILINK_LOG_JSON", global = true)]
    pub log_json: bool,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip TLS certificate verification
    #[arg(long, short = 'k', env = "SENSILINK_INSECURE", global = true)]
    pub insecure: bool,

    /// Per-step request timeout in seconds
    #[arg(long, env = "SENSILINK_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Long-poll timeout in seconds
    #[arg(long, env = "SENSILINK_POLL_TIMEOUT", global = true)]
    pub poll_timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch the thermostat's current status and deliver it
    Poll(PollArgs),

    /// List the thermostats registered to the account
    #[command(alias = "ls")]
    Discover,

    /// Store a serialized status event (e.g. a topic message)
    Ingest(IngestArgs),

    /// Project stored records and stream them as one batch
    Relay(RelayArgs),

    /// Show records in the local store
    Records(RecordsArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  POLL
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PollTarget {
    /// Print the event
    Stdout,
    /// Write to the local record store
    Store,
    /// POST to the profile's topic URL
    Topic,
}

#[derive(Debug, Args)]
pub struct PollArgs {
    /// Where to deliver the status event
    #[arg(long, default_value = "stdout")]
    pub to: PollTarget,

    /// Topic endpoint (overrides profile topic_url)
    #[arg(long, env = "SENSILINK_TOPIC_URL")]
    pub topic_url: Option<String>,

    /// Number of fetch cycles to run (0 = until interrupted)
    #[arg(long, short = 'n', default_value = "1")]
    pub count: u64,

    /// Seconds to wait between cycles
    #[arg(long, short = 'i', default_value = "60")]
    pub interval: u64,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  INGEST / RELAY / RECORDS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct IngestArgs {
    /// File holding one serialized status event (`-` for stdin)
    #[arg(default_value = "-")]
    pub input: String,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RelayTarget {
    /// POST the projection batch to the profile's batch URL
    Batch,
    /// Print the projection batch
    Stdout,
}

#[derive(Debug, Args)]
pub struct RelayArgs {
    /// Where to send the projection batch
    #[arg(long, default_value = "stdout")]
    pub to: RelayTarget,

    /// Batch endpoint (overrides profile batch_url)
    #[arg(long, env = "SENSILINK_BATCH_URL")]
    pub batch_url: Option<String>,
}

#[derive(Debug, Args)]
pub struct RecordsArgs {
    /// Only show the N most recent records
    #[arg(long, short = 'l')]
    pub limit: Option<usize>,

    /// Show projection records instead of full events
    #[arg(long)]
    pub projected: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current resolved configuration
    Show,

    /// Print the config file path
    Path,

    /// Set a configuration value on the active profile
    Set {
        /// Config key (e.g. "device_id", "policy", "topic_url")
        key: String,

        /// Value to set
        value: String,
    },

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store the account password in the system keyring
    SetPassword {
        /// Profile name
        #[arg(long)]
        profile: Option<String>,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
