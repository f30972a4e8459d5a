//! CLI config: thin wrappers around `sensilink_config` that layer
//! `GlobalOpts` overrides onto profile values.

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use sensilink_config::{Config, Profile};
use sensilink_core::{PollerConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use sensilink_config::{
    config_path, default_store_dir, load_config_or_default, resolve_password, save_config,
    store_keyring_password,
};

/// Determine the active profile name: --profile flag, then config default.
pub fn active_profile_name(global: &GlobalOpts, cfg: &Config) -> String {
    global
        .profile
        .clone()
        .unwrap_or_else(|| cfg.active_profile_name().to_owned())
}

/// The active profile, or an empty one when running from flags/env alone.
///
/// Naming a profile explicitly that does not exist is an error.
fn active_profile(global: &GlobalOpts, cfg: &Config) -> Result<(String, Profile), CliError> {
    let name = active_profile_name(global, cfg);
    match cfg.profiles.get(&name) {
        Some(profile) => Ok((name, profile.clone())),
        None if global.profile.is_some() => Err(CliError::ProfileNotFound {
            available: available_profiles(cfg),
            name,
        }),
        None => Ok((name, Profile::default())),
    }
}

pub fn available_profiles(cfg: &Config) -> String {
    let mut names: Vec<_> = cfg.profiles.keys().cloned().collect();
    if names.is_empty() {
        return "(none)".into();
    }
    names.sort();
    names.join(", ")
}

/// Build a `PollerConfig` from the config file, profile, and CLI overrides.
pub fn resolve_poller_config(global: &GlobalOpts) -> Result<PollerConfig, CliError> {
    let cfg = load_config_or_default();
    let (profile_name, profile) = active_profile(global, &cfg)?;

    let username = global
        .username
        .clone()
        .or_else(|| profile.username.clone())
        .ok_or_else(|| {
            if cfg.profiles.is_empty() {
                CliError::NoConfig {
                    path: config_path().display().to_string(),
                }
            } else {
                CliError::NoCredentials {
                    profile: profile_name.clone(),
                }
            }
        })?;
    let password = resolve_password(&profile, &profile_name)?;

    let mut config = PollerConfig::new(username, password);

    if let Some(base_url) = global.base_url.as_ref().or(profile.base_url.as_ref()) {
        Url::parse(base_url).map_err(|e| CliError::Validation {
            field: "base_url".into(),
            reason: format!("invalid URL '{base_url}': {e}"),
        })?;
        config.base_url.clone_from(base_url);
    }

    config.tls = if global.insecure || profile.insecure.unwrap_or(false) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    config.device_id = global.device.clone().or_else(|| profile.device_id.clone());
    config.policy = global
        .policy
        .or(profile.policy)
        .unwrap_or(cfg.defaults.policy);

    let timeout = global
        .timeout
        .or(profile.timeout)
        .unwrap_or(cfg.defaults.timeout);
    let poll_timeout = global
        .poll_timeout
        .or(profile.poll_timeout)
        .unwrap_or(cfg.defaults.poll_timeout);
    config.timeout = Duration::from_secs(timeout);
    config.poll_timeout = Duration::from_secs(poll_timeout);

    Ok(config)
}

/// Where the record store lives: --store-dir, profile, then platform default.
pub fn resolve_store_dir(global: &GlobalOpts) -> Result<PathBuf, CliError> {
    if let Some(ref dir) = global.store_dir {
        return Ok(dir.clone());
    }
    let cfg = load_config_or_default();
    let (_, profile) = active_profile(global, &cfg)?;
    Ok(profile.store_dir.unwrap_or_else(default_store_dir))
}

/// Which endpoint a webhook sink posts to.
#[derive(Debug, Clone, Copy)]
pub enum Endpoint {
    Topic,
    Batch,
}

impl Endpoint {
    fn field(self) -> &'static str {
        match self {
            Self::Topic => "topic_url",
            Self::Batch => "batch_url",
        }
    }
}

/// Resolve a sink endpoint URL: explicit flag, then profile.
pub fn resolve_endpoint(
    global: &GlobalOpts,
    flag: Option<&str>,
    endpoint: Endpoint,
) -> Result<Url, CliError> {
    let field = endpoint.field();
    let raw = match flag {
        Some(url) => url.to_owned(),
        None => {
            let cfg = load_config_or_default();
            let (_, profile) = active_profile(global, &cfg)?;
            let configured = match endpoint {
                Endpoint::Topic => profile.topic_url,
                Endpoint::Batch => profile.batch_url,
            };
            configured.ok_or_else(|| CliError::Validation {
                field: field.into(),
                reason: format!("not configured; pass --{} or set {field}", field.replace('_', "-")),
            })?
        }
    };

    Url::parse(&raw).map_err(|e| CliError::Validation {
        field: field.into(),
        reason: format!("invalid URL '{raw}': {e}"),
    })
}

/// Request timeout for webhook sinks.
pub fn sink_timeout(global: &GlobalOpts) -> Duration {
    let cfg = load_config_or_default();
    Duration::from_secs(global.timeout.unwrap_or(cfg.defaults.timeout))
}
