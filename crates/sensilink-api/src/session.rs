// Realtime session state
//
// Tokens handed out by each handshake step and echoed on the next one.
// A `Session` is mutated in place by `SessionClient`; it never performs
// I/O itself.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::error::{Error, Step};

/// Mutable state threaded through the realtime handshake.
///
/// Invariants upheld by [`SessionClient`](crate::SessionClient):
/// - `cookie` is set before negotiate is attempted;
/// - `connection_token` is set before connect, subscribe and poll;
/// - `message_cursor` is only ever replaced by a newer cursor, never
///   cleared mid-session;
/// - `connected` is true only between a successful connect and the next
///   reset or teardown.
#[derive(Clone)]
pub struct Session {
    device_id: String,
    cookie: Option<String>,
    connection_token: Option<String>,
    message_cursor: Option<String>,
    group_token: Option<String>,
    connected: bool,
    subscribed: bool,
    established_at: DateTime<Utc>,
}

impl Session {
    /// A fresh, unauthenticated session for `device_id`.
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            cookie: None,
            connection_token: None,
            message_cursor: None,
            group_token: None,
            connected: false,
            subscribed: false,
            established_at: Utc::now(),
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// The `name=value` session cookie set by authenticate.
    pub fn cookie(&self) -> Option<&str> {
        self.cookie.as_deref()
    }

    pub fn connection_token(&self) -> Option<&str> {
        self.connection_token.as_deref()
    }

    pub fn message_cursor(&self) -> Option<&str> {
        self.message_cursor.as_deref()
    }

    pub fn group_token(&self) -> Option<&str> {
        self.group_token.as_deref()
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    pub fn established_at(&self) -> DateTime<Utc> {
        self.established_at
    }

    /// The `_` cache-buster query value: establishment time in epoch millis.
    pub fn cache_buster(&self) -> i64 {
        self.established_at.timestamp_millis()
    }

    /// True when there is nothing on the remote side to tear down.
    pub fn is_idle(&self) -> bool {
        !self.connected && self.connection_token.is_none()
    }

    /// Drop every token and mark the session disconnected.
    ///
    /// The next invocation must run the full handshake again.
    pub fn reset(&mut self) {
        self.cookie = None;
        self.connection_token = None;
        self.message_cursor = None;
        self.group_token = None;
        self.connected = false;
        self.subscribed = false;
    }

    // ── Step preconditions ───────────────────────────────────────────

    pub(crate) fn require_cookie(&self, step: Step) -> Result<&str, Error> {
        self.cookie()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| Error::step(step, "no session cookie (authenticate first)"))
    }

    pub(crate) fn require_connection_token(&self, step: Step) -> Result<&str, Error> {
        self.connection_token()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::step(step, "no connection token (negotiate first)"))
    }

    pub(crate) fn require_connected(&self, step: Step) -> Result<(), Error> {
        if self.connected {
            Ok(())
        } else {
            Err(Error::step(step, "not connected (connect first)"))
        }
    }

    pub(crate) fn require_subscribed(&self, step: Step) -> Result<(), Error> {
        if self.subscribed {
            Ok(())
        } else {
            Err(Error::step(step, "not subscribed (subscribe first)"))
        }
    }

    // ── Step results ─────────────────────────────────────────────────

    pub(crate) fn set_cookie(&mut self, cookie: String) {
        self.cookie = Some(cookie);
        self.established_at = Utc::now();
    }

    pub(crate) fn set_connection_token(&mut self, token: String) {
        self.connection_token = Some(token);
    }

    pub(crate) fn mark_connected(&mut self, cursor: String) {
        self.message_cursor = Some(cursor);
        self.connected = true;
    }

    pub(crate) fn mark_subscribed(&mut self) {
        self.subscribed = true;
    }

    /// Apply the optional tokens of a poll response.
    ///
    /// Each field is replaced only when the response carries it; an absent
    /// field keeps the prior value so no queued message is ever skipped.
    pub(crate) fn advance(&mut self, cursor: Option<String>, group_token: Option<String>) {
        if let Some(cursor) = cursor.filter(|c| !c.is_empty()) {
            self.message_cursor = Some(cursor);
        }
        if let Some(group) = group_token.filter(|g| !g.is_empty()) {
            self.group_token = Some(group);
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("device_id", &self.device_id)
            .field("cookie", &self.cookie.as_ref().map(|_| "[REDACTED]"))
            .field("connection_token", &self.connection_token)
            .field("message_cursor", &self.message_cursor)
            .field("group_token", &self.group_token)
            .field("connected", &self.connected)
            .field("subscribed", &self.subscribed)
            .field("established_at", &self.established_at)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn established() -> Session {
        let mut s = Session::new("dev-1");
        s.set_cookie("ASPXAUTH=abc".into());
        s.set_connection_token("tok".into());
        s.mark_connected("cur-1".into());
        s.mark_subscribed();
        s.advance(None, Some("grp-1".into()));
        s
    }

    #[test]
    fn advance_keeps_prior_cursor_when_absent() {
        let mut s = established();
        s.advance(None, None);
        assert_eq!(s.message_cursor(), Some("cur-1"));
        assert_eq!(s.group_token(), Some("grp-1"));

        s.advance(Some("cur-2".into()), None);
        assert_eq!(s.message_cursor(), Some("cur-2"));
        assert_eq!(s.group_token(), Some("grp-1"));
    }

    #[test]
    fn advance_ignores_empty_tokens() {
        let mut s = established();
        s.advance(Some(String::new()), Some(String::new()));
        assert_eq!(s.message_cursor(), Some("cur-1"));
        assert_eq!(s.group_token(), Some("grp-1"));
    }

    #[test]
    fn reset_clears_everything_but_device() {
        let mut s = established();
        s.reset();
        assert_eq!(s.device_id(), "dev-1");
        assert!(s.cookie().is_none());
        assert!(s.connection_token().is_none());
        assert!(s.message_cursor().is_none());
        assert!(s.group_token().is_none());
        assert!(!s.is_connected());
        assert!(!s.is_subscribed());
        assert!(s.is_idle());
    }

    #[test]
    fn preconditions_name_the_missing_step() {
        let s = Session::new("dev-1");
        let err = s.require_cookie(Step::Negotiate).unwrap_err();
        assert!(matches!(err, Error::Negotiation { .. }));
        let err = s.require_connection_token(Step::Connect).unwrap_err();
        assert!(matches!(err, Error::Connection { .. }));
    }

    #[test]
    fn debug_redacts_cookie() {
        let s = established();
        let rendered = format!("{s:?}");
        assert!(!rendered.contains("ASPXAUTH"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
