// ── Runtime poller configuration ──
//
// Describes *how* to reach the vendor service and which device to watch.
// Never touches disk: the CLI builds a `PollerConfig` from its profile
// and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use sensilink_api::{DEFAULT_BASE_URL, TlsMode, TransportConfig};

use crate::credentials::PasswordSource;
use crate::lifecycle::LifecyclePolicy;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict). The vendor cloud has a public certificate.
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (intercepting proxies in test rigs).
    DangerAcceptInvalid,
}

/// Everything needed to build a [`StatusPoller`](crate::StatusPoller).
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Service root, e.g. `https://bus-serv.sensicomfort.com`.
    pub base_url: String,
    pub username: String,
    pub password: PasswordSource,
    /// Device to subscribe to. Not needed for discovery.
    pub device_id: Option<String>,
    pub policy: LifecyclePolicy,
    pub tls: TlsVerification,
    /// Bound on every handshake step and on teardown.
    pub timeout: Duration,
    /// Bound on the long-poll request.
    pub poll_timeout: Duration,
}

impl PollerConfig {
    /// A config against the production service with default bounds.
    pub fn new(username: impl Into<String>, password: PasswordSource) -> Self {
        let transport = TransportConfig::default();
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            username: username.into(),
            password,
            device_id: None,
            policy: LifecyclePolicy::default(),
            tls: TlsVerification::default(),
            timeout: transport.timeout,
            poll_timeout: transport.poll_timeout,
        }
    }

    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: tls_to_transport(&self.tls),
            timeout: self.timeout,
            poll_timeout: self.poll_timeout,
        }
    }
}

fn tls_to_transport(tls: &TlsVerification) -> TlsMode {
    match tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    }
}
