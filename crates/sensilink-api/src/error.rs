use std::fmt;

use thiserror::Error;

/// One network round-trip of the realtime session protocol.
///
/// Used to attribute failures (including timeouts) to the step that
/// produced them, and in log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Authenticate,
    Negotiate,
    Connect,
    Subscribe,
    Poll,
    Teardown,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Authenticate => "authenticate",
            Self::Negotiate => "negotiate",
            Self::Connect => "connect",
            Self::Subscribe => "subscribe",
            Self::Poll => "poll",
            Self::Teardown => "teardown",
        };
        f.write_str(name)
    }
}

/// Top-level error type for the `sensilink-api` crate.
///
/// Every handshake step has its own variant so callers can tell exactly
/// where the chain stopped. Transport failures are folded into the
/// variant of the step that was in flight; timeouts get [`Error::Timeout`],
/// which still names that step.
#[derive(Debug, Error)]
pub enum Error {
    // ── Handshake ───────────────────────────────────────────────────
    /// Credentials rejected, or the authorize response carried no cookie.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// Negotiate response carried no connection token.
    #[error("Negotiation failed: {message}")]
    Negotiation { message: String },

    /// Connect response carried no initial message cursor.
    #[error("Connection failed: {message}")]
    Connection { message: String },

    /// Subscribe response was unparseable or unacknowledged.
    #[error("Subscription failed: {message}")]
    Subscription { message: String },

    /// The hub rejected the session (HTTP 401 or a timed-out flag).
    /// Tokens held by the session are no longer valid.
    #[error("Session expired -- a new handshake is required")]
    SessionExpired,

    // ── Polling ─────────────────────────────────────────────────────
    /// Poll response was unparseable or the request failed.
    #[error("Poll failed: {message}")]
    Poll { message: String },

    /// Abort request failed; the remote connection may still be open.
    #[error("Teardown failed: {message}")]
    Teardown { message: String },

    /// A request ran past its deadline. Counts as a failure of `step`.
    #[error("{step} timed out: {message}")]
    Timeout { step: Step, message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or HTTP client construction error.
    #[error("TLS error: {0}")]
    Tls(String),

    /// Non-realtime request failed at the HTTP layer.
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Build the failure variant belonging to `step`.
    pub fn step(step: Step, message: impl Into<String>) -> Self {
        let message = message.into();
        match step {
            Step::Authenticate => Self::Authentication { message },
            Step::Negotiate => Self::Negotiation { message },
            Step::Connect => Self::Connection { message },
            Step::Subscribe => Self::Subscription { message },
            Step::Poll => Self::Poll { message },
            Step::Teardown => Self::Teardown { message },
        }
    }

    /// Fold a transport error into the failure variant of `step`.
    ///
    /// A timeout fails the step it interrupted, tagged as [`Error::Timeout`].
    pub fn transport(step: Step, err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                step,
                message: err.to_string(),
            }
        } else if err.is_connect() {
            Self::step(step, format!("could not reach server ({err})"))
        } else {
            Self::step(step, err.to_string())
        }
    }

    /// The protocol step this error belongs to, if any.
    pub fn failed_step(&self) -> Option<Step> {
        match self {
            Self::Authentication { .. } => Some(Step::Authenticate),
            Self::Negotiation { .. } => Some(Step::Negotiate),
            Self::Connection { .. } => Some(Step::Connect),
            Self::Subscription { .. } => Some(Step::Subscribe),
            Self::Poll { .. } => Some(Step::Poll),
            Self::Teardown { .. } => Some(Step::Teardown),
            Self::Timeout { step, .. } => Some(*step),
            _ => None,
        }
    }

    /// Returns `true` if the hub signalled that the session must be discarded.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired)
    }

    /// Returns `true` if a request ran past its deadline.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Transport(e) => e.is_timeout(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_builds_matching_variant() {
        let err = Error::step(Step::Negotiate, "no token");
        assert!(matches!(err, Error::Negotiation { ref message } if message == "no token"));
        assert_eq!(err.failed_step(), Some(Step::Negotiate));
    }

    #[test]
    fn session_expired_has_no_step() {
        assert!(Error::SessionExpired.is_session_expired());
        assert_eq!(Error::SessionExpired.failed_step(), None);
    }
}
