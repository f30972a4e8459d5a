//! Discover command: list the account's thermostats.

use tabled::Tabled;

use sensilink_core::{Thermostat, discover_with_config};

use crate::cli::GlobalOpts;
use crate::config;
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct ThermostatRow {
    #[tabled(rename = "Device ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Model")]
    model: String,
}

impl From<&Thermostat> for ThermostatRow {
    fn from(t: &Thermostat) -> Self {
        Self {
            id: t.icd.clone().unwrap_or_else(|| "-".into()),
            name: t.device_name.clone().unwrap_or_else(|| "-".into()),
            model: util::cell(t.extra.get("ModelNumber")),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let poller_config = config::resolve_poller_config(global)?;
    let thermostats = discover_with_config(&poller_config).await?;

    let out = output::render_list(
        &global.output,
        &thermostats,
        |t| ThermostatRow::from(t),
        |t| t.icd.clone().unwrap_or_default(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
