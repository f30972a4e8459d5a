//! Configuration for the sensilink CLI.
//!
//! TOML profiles, credential resolution (env + keyring + encrypted blob +
//! plaintext), and translation to `sensilink_core::PollerConfig`. The CLI
//! layers its flag overrides on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use sensilink_core::{
    CommandDecryptor, LifecyclePolicy, PasswordSource, PollerConfig, TlsVerification,
};

/// Environment variable that overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "SENSILINK_CONFIG";

/// Keyring service name; entries are `<profile>/password`.
pub const KEYRING_SERVICE: &str = "sensilink";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{name}' not found in config")]
    UnknownProfile { name: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named account profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Name of the profile to use when none is given explicitly.
    pub fn active_profile_name(&self) -> &str {
        self.default_profile.as_deref().unwrap_or("default")
    }

    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProfile { name: name.into() })
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    /// Per-step timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Long-poll timeout in seconds.
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout: u64,

    #[serde(default)]
    pub policy: LifecyclePolicy,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            poll_timeout: default_poll_timeout(),
            policy: LifecyclePolicy::default(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}
fn default_poll_timeout() -> u64 {
    120
}

/// A named account profile.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Service root. Defaults to the production cloud.
    pub base_url: Option<String>,

    /// Account login (email address).
    pub username: Option<String>,

    /// Password (plaintext -- prefer keyring, env, or an encrypted blob).
    pub password: Option<String>,

    /// Environment variable name containing the password.
    pub password_env: Option<String>,

    /// Encrypted password blob, decrypted by `decrypt_command`.
    pub password_encrypted: Option<String>,

    /// Command (argv) that reads the blob on stdin and prints the password.
    pub decrypt_command: Option<Vec<String>>,

    /// Thermostat to watch (see `sensilink discover`).
    pub device_id: Option<String>,

    /// Session lifecycle policy override.
    pub policy: Option<LifecyclePolicy>,

    /// Override per-step timeout (seconds).
    pub timeout: Option<u64>,

    /// Override long-poll timeout (seconds).
    pub poll_timeout: Option<u64>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Skip TLS verification.
    pub insecure: Option<bool>,

    /// Directory for the record store.
    pub store_dir: Option<PathBuf>,

    /// Endpoint that receives published status events.
    pub topic_url: Option<String>,

    /// Endpoint that receives projection batches.
    pub batch_url: Option<String>,
}

// ── Config file path ────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "sensilink", "sensilink")
}

/// Resolve the config file path: `$SENSILINK_CONFIG`, else XDG / platform
/// conventions.
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
        return PathBuf::from(path);
    }
    project_dirs().map_or_else(
        || dirs_fallback().join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Default record store directory under the platform data dir.
pub fn default_store_dir() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback().join("records"),
        |dirs| dirs.data_dir().join("records"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("sensilink");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load config from `path`, layered under `SENSILINK_*` env overrides.
///
/// Nested keys use a double underscore: `SENSILINK_DEFAULTS__POLICY=cached`.
/// A missing file is not an error.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("SENSILINK_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution (without CLI flags) ───────────────────────

/// Resolve the account username: profile, then `SENSILINK_USERNAME`.
pub fn resolve_username(profile: &Profile, profile_name: &str) -> Result<String, ConfigError> {
    profile
        .username
        .clone()
        .or_else(|| std::env::var("SENSILINK_USERNAME").ok())
        .ok_or_else(|| ConfigError::NoCredentials {
            profile: profile_name.into(),
        })
}

/// Resolve where the password comes from.
///
/// Order: the profile's `password_env` variable, `SENSILINK_PASSWORD`, the
/// system keyring, an encrypted blob, then plaintext in the config file.
/// Encrypted blobs are not decrypted here; that happens lazily, once.
pub fn resolve_password(
    profile: &Profile,
    profile_name: &str,
) -> Result<PasswordSource, ConfigError> {
    resolve_password_with(profile, profile_name, &|name| std::env::var(name).ok(), true)
}

fn resolve_password_with(
    profile: &Profile,
    profile_name: &str,
    env: &dyn Fn(&str) -> Option<String>,
    use_keyring: bool,
) -> Result<PasswordSource, ConfigError> {
    // 1. Profile's password_env → env var lookup
    if let Some(pw) = profile.password_env.as_deref().and_then(env) {
        return Ok(PasswordSource::Plain(SecretString::from(pw)));
    }

    // 2. Global env var
    if let Some(pw) = env("SENSILINK_PASSWORD") {
        return Ok(PasswordSource::Plain(SecretString::from(pw)));
    }

    // 3. System keyring
    if use_keyring {
        if let Some(pw) = keyring_password(profile_name) {
            return Ok(PasswordSource::Plain(SecretString::from(pw)));
        }
    }

    // 4. Encrypted blob + decrypt command
    if let Some(ref blob) = profile.password_encrypted {
        let argv = profile.decrypt_command.as_deref().unwrap_or_default();
        let decryptor =
            CommandDecryptor::from_argv(argv).ok_or_else(|| ConfigError::Validation {
                field: "decrypt_command".into(),
                reason: "required when password_encrypted is set".into(),
            })?;
        return Ok(PasswordSource::Encrypted {
            blob: blob.clone(),
            decryptor: Arc::new(decryptor),
        });
    }

    // 5. Plaintext in config
    if let Some(ref pw) = profile.password {
        return Ok(PasswordSource::Plain(SecretString::from(pw.clone())));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

fn keyring_password(profile_name: &str) -> Option<String> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/password"))
        .ok()?
        .get_password()
        .ok()
}

/// Store a password in the system keyring for `profile_name`.
pub fn store_keyring_password(profile_name: &str, password: &str) -> Result<(), ConfigError> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/password"))
        .and_then(|entry| entry.set_password(password))
        .map_err(|e| ConfigError::Validation {
            field: "keyring".into(),
            reason: e.to_string(),
        })
}

// ── Profile → PollerConfig ──────────────────────────────────────────

/// Validate an optional URL field.
pub fn parse_url(field: &str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|e| ConfigError::Validation {
        field: field.into(),
        reason: format!("invalid URL '{value}': {e}"),
    })
}

/// Build a `PollerConfig` from a profile, no CLI flag overrides.
pub fn profile_to_poller_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<PollerConfig, ConfigError> {
    let username = resolve_username(profile, profile_name)?;
    let password = resolve_password(profile, profile_name)?;
    build_poller_config(profile, defaults, username, password)
}

fn build_poller_config(
    profile: &Profile,
    defaults: &Defaults,
    username: String,
    password: PasswordSource,
) -> Result<PollerConfig, ConfigError> {
    let mut config = PollerConfig::new(username, password);

    if let Some(ref base_url) = profile.base_url {
        parse_url("base_url", base_url)?;
        config.base_url.clone_from(base_url);
    }

    config.tls = if profile.insecure.unwrap_or(false) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    config.device_id.clone_from(&profile.device_id);
    config.policy = profile.policy.unwrap_or(defaults.policy);
    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    config.poll_timeout =
        Duration::from_secs(profile.poll_timeout.unwrap_or(defaults.poll_timeout));

    Ok(config)
}
