// Shared transport configuration for building reqwest::Client instances.
//
// The realtime hub and the account REST endpoints share TLS and timeout
// settings through this module. Session cookies are NOT kept in a jar:
// the realtime protocol threads the cookie explicitly through `Session`.

use std::path::PathBuf;
use std::time::Duration;

/// TLS verification mode.
#[derive(Debug, Clone, Default)]
pub enum TlsMode {
    /// Use the system certificate store.
    #[default]
    System,
    /// Use a custom CA certificate from the given PEM file.
    CustomCa(PathBuf),
    /// Accept any certificate (test rigs behind an intercepting proxy).
    DangerAcceptInvalid,
}

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    /// Bound applied to every request (authenticate, negotiate, connect,
    /// subscribe, teardown, discovery).
    pub timeout: Duration,
    /// Bound applied to the long-poll request only. The hub holds a poll
    /// open until data arrives or its own timeout elapses, so this is
    /// normally longer than `timeout`.
    pub poll_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::System,
            timeout: Duration::from_secs(30),
            poll_timeout: Duration::from_secs(120),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    ///
    /// The client-level timeout is the larger of the two bounds; each
    /// request then applies its own bound through `RequestBuilder::timeout`.
    pub fn build_client(&self) -> Result<reqwest::Client, crate::error::Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout.max(self.poll_timeout))
            .user_agent(concat!("sensilink/", env!("CARGO_PKG_VERSION")));

        match &self.tls {
            TlsMode::System => {}
            TlsMode::CustomCa(path) => {
                let cert_pem = std::fs::read(path).map_err(|e| {
                    crate::error::Error::Tls(format!("failed to read CA cert: {e}"))
                })?;
                let cert = reqwest::Certificate::from_pem(&cert_pem)
                    .map_err(|e| crate::error::Error::Tls(format!("invalid CA cert: {e}")))?;
                builder = builder.add_root_certificate(cert);
            }
            TlsMode::DangerAcceptInvalid => {
                builder = builder.danger_accept_invalid_certs(true);
            }
        }

        builder
            .build()
            .map_err(|e| crate::error::Error::Tls(format!("failed to build HTTP client: {e}")))
    }
}
