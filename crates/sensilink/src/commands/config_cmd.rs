//! Config subcommand handlers.

use std::fmt::Write as _;
use std::str::FromStr;

use dialoguer::{Input, Select};

use sensilink_config::{Config, Profile};
use sensilink_core::LifecyclePolicy;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

/// Format config for display, masking sensitive fields.
fn format_config_redacted(cfg: &Config) -> String {
    let mut out = String::new();

    if let Some(ref default) = cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "timeout = {}", cfg.defaults.timeout);
    let _ = writeln!(out, "poll_timeout = {}", cfg.defaults.poll_timeout);
    let _ = writeln!(out, "policy = \"{}\"", cfg.defaults.policy);

    let mut names: Vec<_> = cfg.profiles.keys().collect();
    names.sort();
    for name in names {
        let p = &cfg.profiles[name];
        let _ = writeln!(out);
        let _ = writeln!(out, "[profiles.{name}]");
        write_opt(&mut out, "base_url", p.base_url.as_deref());
        write_opt(&mut out, "username", p.username.as_deref());
        if p.password.is_some() {
            let _ = writeln!(out, "password = \"****\"");
        }
        write_opt(&mut out, "password_env", p.password_env.as_deref());
        if p.password_encrypted.is_some() {
            let _ = writeln!(out, "password_encrypted = \"****\"");
        }
        if let Some(ref argv) = p.decrypt_command {
            let _ = writeln!(out, "decrypt_command = {argv:?}");
        }
        write_opt(&mut out, "device_id", p.device_id.as_deref());
        if let Some(policy) = p.policy {
            let _ = writeln!(out, "policy = \"{policy}\"");
        }
        if let Some(timeout) = p.timeout {
            let _ = writeln!(out, "timeout = {timeout}");
        }
        if let Some(poll_timeout) = p.poll_timeout {
            let _ = writeln!(out, "poll_timeout = {poll_timeout}");
        }
        if let Some(ref ca) = p.ca_cert {
            let _ = writeln!(out, "ca_cert = \"{}\"", ca.display());
        }
        if let Some(insecure) = p.insecure {
            let _ = writeln!(out, "insecure = {insecure}");
        }
        if let Some(ref dir) = p.store_dir {
            let _ = writeln!(out, "store_dir = \"{}\"", dir.display());
        }
        write_opt(&mut out, "topic_url", p.topic_url.as_deref());
        write_opt(&mut out, "batch_url", p.batch_url.as_deref());
    }

    out
}

fn write_opt(out: &mut String, key: &str, value: Option<&str>) {
    if let Some(v) = value {
        let _ = writeln!(out, "{key} = \"{v}\"");
    }
}

/// Copy of the config with secrets masked, for structured output formats.
fn redacted(cfg: &Config) -> Config {
    Config {
        default_profile: cfg.default_profile.clone(),
        defaults: sensilink_config::Defaults {
            timeout: cfg.defaults.timeout,
            poll_timeout: cfg.defaults.poll_timeout,
            policy: cfg.defaults.policy,
        },
        profiles: cfg
            .profiles
            .iter()
            .map(|(name, p)| {
                let mut p = p.clone();
                p.password = p.password.as_ref().map(|_| "****".to_owned());
                p.password_encrypted = p.password_encrypted.as_ref().map(|_| "****".to_owned());
                (name.clone(), p)
            })
            .collect(),
    }
}

fn save_config(cfg: &Config) -> Result<(), CliError> {
    config::save_config(cfg)?;
    Ok(())
}

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> CliError {
    CliError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

fn parse_policy(value: &str) -> Result<LifecyclePolicy, CliError> {
    LifecyclePolicy::from_str(value).map_err(|_| invalid("policy", "must be 'ephemeral' or 'cached'"))
}

fn parse_seconds(field: &str, value: &str) -> Result<u64, CliError> {
    value
        .parse()
        .map_err(|_| invalid(field, "must be a number (seconds)"))
}

fn parse_url(field: &str, value: String) -> Result<String, CliError> {
    sensilink_config::parse_url(field, &value)?;
    Ok(value)
}

/// Apply `key = value` to a profile.
fn set_profile_key(profile: &mut Profile, key: &str, value: String) -> Result<(), CliError> {
    match key {
        "base_url" | "base-url" => profile.base_url = Some(parse_url("base_url", value)?),
        "username" => profile.username = Some(value),
        "password_env" | "password-env" => profile.password_env = Some(value),
        "password_encrypted" | "password-encrypted" => profile.password_encrypted = Some(value),
        "decrypt_command" | "decrypt-command" => {
            let argv: Vec<String> = value.split_whitespace().map(str::to_owned).collect();
            if argv.is_empty() {
                return Err(invalid("decrypt_command", "command cannot be empty"));
            }
            profile.decrypt_command = Some(argv);
        }
        "device_id" | "device-id" | "device" => profile.device_id = Some(value),
        "policy" => profile.policy = Some(parse_policy(&value)?),
        "timeout" => profile.timeout = Some(parse_seconds("timeout", &value)?),
        "poll_timeout" | "poll-timeout" => {
            profile.poll_timeout = Some(parse_seconds("poll_timeout", &value)?);
        }
        "insecure" => {
            profile.insecure = Some(
                value
                    .parse()
                    .map_err(|_| invalid("insecure", "must be 'true' or 'false'"))?,
            );
        }
        "ca_cert" | "ca-cert" => profile.ca_cert = Some(value.into()),
        "store_dir" | "store-dir" => profile.store_dir = Some(value.into()),
        "topic_url" | "topic-url" => profile.topic_url = Some(parse_url("topic_url", value)?),
        "batch_url" | "batch-url" => profile.batch_url = Some(parse_url("batch_url", value)?),
        other => {
            return Err(invalid(
                other,
                format!(
                    "unknown config key '{other}'. Valid keys: base_url, username, \
                     password_env, password_encrypted, decrypt_command, device_id, policy, \
                     timeout, poll_timeout, insecure, ca_cert, store_dir, topic_url, batch_url"
                ),
            ));
        }
    }
    Ok(())
}

fn profile_not_found(cfg: &Config, name: String) -> CliError {
    CliError::ProfileNotFound {
        name,
        available: config::available_profiles(cfg),
    }
}

// ── Init wizard ─────────────────────────────────────────────────────

fn init_wizard() -> Result<(), CliError> {
    let config_path = config::config_path();
    eprintln!("sensilink -- configuration wizard");
    eprintln!("   Config path: {}\n", config_path.display());

    // 1. Profile name
    let profile_name: String = Input::new()
        .with_prompt("Profile name")
        .default("default".into())
        .interact_text()
        .map_err(prompt_err)?;

    // 2. Account
    let username: String = Input::new()
        .with_prompt("Sensi account email")
        .interact_text()
        .map_err(prompt_err)?;
    let password = rpassword::prompt_password("Password: ").map_err(prompt_err)?;
    if username.is_empty() || password.is_empty() {
        return Err(invalid(
            "credentials",
            "username and password cannot be empty",
        ));
    }

    // 3. Password storage
    let choices = &[
        "Store in system keyring (recommended)",
        "Save to config file (plaintext)",
    ];
    let selection = Select::new()
        .with_prompt("Where to store the password?")
        .items(choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;
    let password_field = if selection == 0 {
        config::store_keyring_password(&profile_name, &password)?;
        eprintln!("   ✓ Password stored in system keyring");
        None
    } else {
        Some(password)
    };

    // 4. Device (optional; `sensilink discover` lists them)
    let device_id: String = Input::new()
        .with_prompt("Thermostat device id (blank to set later)")
        .allow_empty(true)
        .interact_text()
        .map_err(prompt_err)?;

    // 5. Policy
    let policies = &[
        "ephemeral -- new session every poll",
        "cached -- reuse one session across polls",
    ];
    let policy = match Select::new()
        .with_prompt("Session policy")
        .items(policies)
        .default(0)
        .interact()
        .map_err(prompt_err)?
    {
        0 => LifecyclePolicy::Ephemeral,
        _ => LifecyclePolicy::Cached,
    };

    // 6. Build and write config, keeping any other profiles
    let mut cfg = config::load_config_or_default();
    cfg.profiles.insert(
        profile_name.clone(),
        Profile {
            username: Some(username),
            password: password_field,
            device_id: (!device_id.is_empty()).then_some(device_id),
            policy: Some(policy),
            ..Profile::default()
        },
    );
    cfg.default_profile = Some(profile_name.clone());
    save_config(&cfg)?;

    eprintln!("\n✓ Configuration written to {}", config_path.display());
    eprintln!("  Active profile: {profile_name}");
    eprintln!("\n  Test it: sensilink discover");
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => init_wizard(),

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = redacted(&config::load_config_or_default());
            let out = output::render_single(&global.output, &cfg, format_config_redacted, |_| {
                "config".into()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Path ────────────────────────────────────────────────────
        ConfigCommand::Path => {
            println!("{}", config::config_path().display());
            Ok(())
        }

        // ── Set <key> <value> ───────────────────────────────────────
        ConfigCommand::Set { key, value } => {
            let mut cfg = config::load_config_or_default();
            let profile_name = config::active_profile_name(global, &cfg);

            let profile = cfg.profiles.entry(profile_name.clone()).or_default();
            set_profile_key(profile, &key, value)?;

            save_config(&cfg)?;
            if !global.quiet {
                eprintln!("✓ Set {key} on profile '{profile_name}'");
            }
            Ok(())
        }

        // ── Profiles ────────────────────────────────────────────────
        ConfigCommand::Profiles => {
            let cfg = config::load_config_or_default();
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: sensilink config init");
                return Ok(());
            }
            let default = cfg.active_profile_name();
            let mut names: Vec<_> = cfg.profiles.keys().collect();
            names.sort();
            for name in names {
                let marker = if name == default { " *" } else { "" };
                println!("{name}{marker}");
            }
            Ok(())
        }

        // ── Use <name> ─────────────────────────────────────────────
        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config_or_default();
            if !cfg.profiles.contains_key(&name) {
                return Err(profile_not_found(&cfg, name));
            }

            cfg.default_profile = Some(name.clone());
            save_config(&cfg)?;
            if !global.quiet {
                eprintln!("✓ Default profile set to '{name}'");
            }
            Ok(())
        }

        // ── SetPassword ─────────────────────────────────────────────
        ConfigCommand::SetPassword { profile } => {
            let cfg = config::load_config_or_default();
            let profile_name = profile.unwrap_or_else(|| config::active_profile_name(global, &cfg));
            if !cfg.profiles.contains_key(&profile_name) {
                return Err(profile_not_found(&cfg, profile_name));
            }

            let secret = rpassword::prompt_password("Password: ").map_err(prompt_err)?;
            if secret.is_empty() {
                return Err(invalid("password", "value cannot be empty"));
            }
            config::store_keyring_password(&profile_name, &secret)?;
            if !global.quiet {
                eprintln!("✓ Password stored in keyring for profile '{profile_name}'");
            }
            Ok(())
        }
    }
}
