//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use sensilink_config::ConfigError;
use sensilink_core::{CoreError, DecryptError, SinkError};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NO_DATA: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const SESSION_EXPIRED: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Session protocol ─────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(sensilink::auth_failed),
        help(
            "Verify the account username and password.\n\
             Run: sensilink config set-password --profile {profile}"
        )
    )]
    AuthFailed { profile: String, message: String },

    #[error("Session {step} failed: {message}")]
    #[diagnostic(
        code(sensilink::session_failed),
        help("The Sensi cloud refused or garbled the {step} step. Retry, or run with -vv for details.")
    )]
    SessionFailed { step: String, message: String },

    #[error("Session expired")]
    #[diagnostic(
        code(sensilink::session_expired),
        help("The cached session was discarded. The next poll re-authenticates.")
    )]
    SessionExpired,

    #[error("No status available for device {device_id}")]
    #[diagnostic(
        code(sensilink::no_data),
        help("The thermostat queued no status this cycle. Poll again later.")
    )]
    NoData { device_id: String },

    #[error("Teardown failed: {message}")]
    #[diagnostic(
        code(sensilink::teardown_failed),
        help("Status was delivered, but the remote connection may still be open.")
    )]
    TeardownFailed { message: String },

    #[error("Request timed out: {message}")]
    #[diagnostic(
        code(sensilink::timeout),
        help("Increase --timeout or --poll-timeout, or check network connectivity.")
    )]
    Timeout { message: String },

    #[error("API error: {message}")]
    #[diagnostic(code(sensilink::api_error))]
    ApiError { message: String },

    // ── Credentials ──────────────────────────────────────────────────
    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(sensilink::no_credentials),
        help(
            "Configure credentials with: sensilink config init\n\
             Or set SENSILINK_USERNAME and SENSILINK_PASSWORD."
        )
    )]
    NoCredentials { profile: String },

    #[error("Could not decrypt the account password")]
    #[diagnostic(
        code(sensilink::decrypt_failed),
        help("Check the profile's decrypt_command and password_encrypted values.")
    )]
    Decryption(#[source] DecryptError),

    // ── Delivery ─────────────────────────────────────────────────────
    #[error("Delivery failed")]
    #[diagnostic(code(sensilink::delivery_failed))]
    Delivery(#[source] SinkError),

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(sensilink::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(sensilink::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: sensilink config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Configuration file not found")]
    #[diagnostic(
        code(sensilink::no_config),
        help(
            "Create one with: sensilink config init\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error("Configuration error: {0}")]
    #[diagnostic(code(sensilink::config))]
    Config(#[source] ConfigError),

    // ── IO / Serialization ────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    #[diagnostic(code(sensilink::json))]
    Json(#[from] serde_json::Error),

    #[error("Invalid YAML: {0}")]
    #[diagnostic(code(sensilink::yaml))]
    Yaml(#[from] serde_yaml::Error),

    #[error("Internal error: {0}")]
    #[diagnostic(code(sensilink::internal))]
    Internal(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::AuthFailed { .. } | Self::NoCredentials { .. } | Self::Decryption(_) => {
                exit_code::AUTH
            }
            Self::SessionFailed { .. } | Self::TeardownFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::SessionExpired => exit_code::SESSION_EXPIRED,
            Self::NoData { .. } => exit_code::NO_DATA,
            Self::Validation { .. } | Self::ProfileNotFound { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Timeout { message, .. } => CliError::Timeout { message },
            CoreError::AuthenticationFailure { message } => CliError::AuthFailed {
                profile: "current".into(),
                message,
            },
            CoreError::NegotiationFailure { message } => session_failed("negotiate", message),
            CoreError::ConnectionFailure { message } => session_failed("connect", message),
            CoreError::SubscriptionFailure { message } => session_failed("subscribe", message),
            CoreError::PollFailure { message } => session_failed("poll", message),
            CoreError::SessionExpired => CliError::SessionExpired,
            CoreError::NoDataAvailable { device_id } => CliError::NoData { device_id },
            CoreError::TeardownFailure { message, .. } => CliError::TeardownFailed { message },
            CoreError::Api { message, status } => CliError::ApiError {
                message: match status {
                    Some(code) => format!("{message} (HTTP {code})"),
                    None => message,
                },
            },
            CoreError::Decryption(e) => CliError::Decryption(e),
            CoreError::Sink(e) => CliError::Delivery(e),
            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },
            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

fn session_failed(step: &str, message: String) -> CliError {
    CliError::SessionFailed {
        step: step.into(),
        message,
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::UnknownProfile { name } => CliError::ProfileNotFound {
                name,
                available: "(see: sensilink config profiles)".into(),
            },
            other => CliError::Config(other),
        }
    }
}

impl From<SinkError> for CliError {
    fn from(err: SinkError) -> Self {
        CliError::Delivery(err)
    }
}

#[cfg(test)]
mod tests {
    use sensilink_core::Step;

    use super::*;

    #[test]
    fn exit_codes_follow_the_taxonomy() {
        let cases = [
            (CoreError::SessionExpired, exit_code::SESSION_EXPIRED),
            (
                CoreError::NoDataAvailable {
                    device_id: "d".into(),
                },
                exit_code::NO_DATA,
            ),
            (
                CoreError::AuthenticationFailure {
                    message: "HTTP 401".into(),
                },
                exit_code::AUTH,
            ),
            (
                CoreError::Timeout {
                    step: Some(Step::Negotiate),
                    message: "negotiate: operation timed out".into(),
                },
                exit_code::TIMEOUT,
            ),
            (
                CoreError::NegotiationFailure {
                    message: "request timed out (upstream said so)".into(),
                },
                exit_code::CONNECTION,
            ),
            (
                CoreError::PollFailure {
                    message: "HTTP 502".into(),
                },
                exit_code::CONNECTION,
            ),
        ];

        for (core, expected) in cases {
            let label = core.to_string();
            assert_eq!(CliError::from(core).exit_code(), expected, "{label}");
        }
    }
}
