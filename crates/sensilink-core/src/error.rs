// ── Core error types ──
//
// What callers of sensilink-core see. HTTP details stay in sensilink-api;
// the `From<sensilink_api::Error>` impl folds them into the taxonomy below.

use sensilink_api::Step;
use thiserror::Error;

use crate::credentials::DecryptError;
use crate::model::StatusEvent;
use crate::sink::SinkError;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Handshake errors ─────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    AuthenticationFailure { message: String },

    #[error("Negotiation failed: {message}")]
    NegotiationFailure { message: String },

    #[error("Connection failed: {message}")]
    ConnectionFailure { message: String },

    #[error("Subscription failed: {message}")]
    SubscriptionFailure { message: String },

    /// The vendor rejected a reused session. Any cached session has
    /// already been cleared when this is returned.
    #[error("Session expired -- the next request will re-run the handshake")]
    SessionExpired,

    // ── Polling errors ───────────────────────────────────────────────
    #[error("Poll failed: {message}")]
    PollFailure { message: String },

    #[error("No status available for device {device_id}")]
    NoDataAvailable { device_id: String },

    /// A request ran past its deadline. `step` is the protocol step that
    /// was in flight, if the request belonged to one.
    #[error("Request timed out: {message}")]
    Timeout {
        step: Option<Step>,
        message: String,
    },

    /// The abort request failed after a successful poll. When the poll
    /// produced an event it rides along so it can still be delivered.
    #[error("Teardown failed: {message}")]
    TeardownFailure {
        message: String,
        event: Option<Box<StatusEvent>>,
    },

    // ── Account API errors ───────────────────────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Collaborator errors ──────────────────────────────────────────
    #[error("Credential decryption failed: {0}")]
    Decryption(#[from] DecryptError),

    #[error("Delivery failed: {0}")]
    Sink(#[from] SinkError),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Whether simply invoking again (with a fresh handshake) may succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::SessionExpired | Self::NoDataAvailable { .. })
    }

    /// Whether a protocol step failed because its request timed out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// The event a failed teardown could not hand back normally.
    pub fn take_event(self) -> Option<StatusEvent> {
        match self {
            Self::TeardownFailure { event, .. } => event.map(|e| *e),
            _ => None,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<sensilink_api::Error> for CoreError {
    fn from(err: sensilink_api::Error) -> Self {
        use sensilink_api::Error as Api;

        match err {
            Api::Authentication { message } => CoreError::AuthenticationFailure { message },
            Api::Negotiation { message } => CoreError::NegotiationFailure { message },
            Api::Connection { message } => CoreError::ConnectionFailure { message },
            Api::Subscription { message } => CoreError::SubscriptionFailure { message },
            Api::SessionExpired => CoreError::SessionExpired,
            Api::Poll { message } => CoreError::PollFailure { message },
            Api::Teardown { message } => CoreError::TeardownFailure {
                message,
                event: None,
            },
            Api::Timeout { step, message } => CoreError::Timeout {
                step: Some(step),
                message: format!("{step}: {message}"),
            },
            Api::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            Api::Tls(msg) => CoreError::ConnectionFailure {
                message: format!("TLS error: {msg}"),
            },
            Api::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout {
                        step: None,
                        message: e.to_string(),
                    }
                } else if e.is_connect() {
                    CoreError::ConnectionFailure {
                        message: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            Api::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}
