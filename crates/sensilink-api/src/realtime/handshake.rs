// Realtime handshake: authenticate -> negotiate -> connect -> subscribe
//
// Each step checks that its predecessor left the state it depends on,
// performs one round-trip, and only then writes its own result into the
// session. A failed step leaves the session exactly as it found it.

use reqwest::StatusCode;
use reqwest::header::SET_COOKIE;
use tracing::{debug, info};

use crate::auth::Credentials;
use crate::error::{Error, Step};
use crate::realtime::client::{LONG_POLLING, SessionClient, TRANSPORT_ID};
use crate::realtime::models::{
    ConnectResponse, Invocation, NegotiateResponse, SendResponse, connection_data,
};
use crate::session::Session;

impl SessionClient {
    /// Submit credentials and capture the session cookie.
    ///
    /// `POST /api/authorize` with `{UserName, Password}`. The response must
    /// set a cookie; its `name=value` pair becomes `session.cookie`.
    pub async fn authenticate(
        &self,
        credentials: &Credentials,
        session: &mut Session,
    ) -> Result<(), Error> {
        let step = Step::Authenticate;
        let url = self.api_url("authorize")?;
        debug!("POST {url}");

        let builder = self
            .http()
            .post(url)
            .headers(Self::api_headers())
            .json(&credentials.authorize_body());
        let resp = self.send(step, builder).await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::step(step, format!("HTTP {status}")));
        }

        let cookie = resp
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(cookie_pair)
            .ok_or_else(|| Error::step(step, "response did not set a session cookie"))?;

        session.set_cookie(cookie);
        debug!("authenticated");
        Ok(())
    }

    /// Request a connection token for the authenticated session.
    ///
    /// `GET /realtime/negotiate`
    pub async fn negotiate(&self, session: &mut Session) -> Result<(), Error> {
        let step = Step::Negotiate;
        let cookie = session.require_cookie(step)?;
        let url = self.realtime_url("negotiate")?;
        debug!("GET {url}");

        let builder = Self::with_cookie(self.http().get(url), step, cookie)?;
        let resp = self.send(step, builder).await?;
        let negotiated: NegotiateResponse = Self::read_json(step, resp).await?;

        let token = negotiated
            .connection_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::step(step, "response carried no connection token"))?;

        session.set_connection_token(token);
        debug!("negotiated connection token");
        Ok(())
    }

    /// Open the long-poll connection on the thermostat hub.
    ///
    /// `GET /realtime/connect?transport=longPolling&connectionToken=..&connectionData=..&tid=4&_=..`
    pub async fn connect(&self, session: &mut Session) -> Result<(), Error> {
        let step = Step::Connect;
        let cookie = session.require_cookie(step)?;
        let token = session.require_connection_token(step)?;
        let url = self.realtime_url("connect")?;
        debug!("GET {url}");

        let query = [
            ("transport", LONG_POLLING.to_owned()),
            ("connectionToken", token.to_owned()),
            ("connectionData", connection_data()),
            ("tid", TRANSPORT_ID.to_string()),
            ("_", session.cache_buster().to_string()),
        ];
        let builder = Self::with_cookie(self.http().get(url).query(&query), step, cookie)?;
        let resp = self.send(step, builder).await?;
        let connected: ConnectResponse = Self::read_json(step, resp).await?;

        let cursor = connected
            .cursor
            .filter(|c| !c.is_empty())
            .ok_or_else(|| Error::step(step, "response carried no message cursor"))?;

        session.mark_connected(cursor);
        info!(device_id = session.device_id(), "realtime connection open");
        Ok(())
    }

    /// Ask the hub to deliver updates for the session's device.
    ///
    /// `POST /realtime/send?transport=longPolling&connectionToken=..` with a
    /// form field `data` holding `{"H":"thermostat-v1","M":"Subscribe","A":[id],"I":0}`.
    ///
    /// HTTP 401 or a timed-out flag yields [`Error::SessionExpired`]: the
    /// only signal that a reused session must be discarded.
    pub async fn subscribe(&self, session: &mut Session) -> Result<(), Error> {
        let step = Step::Subscribe;
        let cookie = session.require_cookie(step)?;
        let token = session.require_connection_token(step)?;
        session.require_connected(step)?;
        let url = self.realtime_url("send")?;
        debug!(device_id = session.device_id(), "POST {url}");

        let data = serde_json::to_string(&Invocation::subscribe(session.device_id()))
            .map_err(|e| Error::step(step, format!("failed to encode invocation: {e}")))?;
        let query = [("transport", LONG_POLLING), ("connectionToken", token)];
        let builder = self
            .http()
            .post(url)
            .query(&query)
            .form(&[("data", data.as_str())]);
        let builder = Self::with_cookie(builder, step, cookie)?;
        let resp = self.send(step, builder).await?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(Error::SessionExpired);
        }
        if !status.is_success() {
            return Err(Error::step(step, format!("HTTP {status}")));
        }

        let sent: SendResponse = Self::read_json(step, resp).await?;
        if sent.timed_out {
            return Err(Error::SessionExpired);
        }
        if !sent.is_acknowledged() {
            return Err(Error::step(step, "hub did not acknowledge the invocation"));
        }

        session.mark_subscribed();
        debug!(device_id = session.device_id(), "subscribed");
        Ok(())
    }
}

/// Extract `name=value` from a `Set-Cookie` header, dropping attributes.
fn cookie_pair(header: &str) -> Option<String> {
    let pair = header.split(';').next()?.trim();
    (pair.contains('=') && !pair.starts_with('=')).then(|| pair.to_owned())
}

#[cfg(test)]
mod tests {
    use super::cookie_pair;

    #[test]
    fn cookie_pair_strips_attributes() {
        assert_eq!(
            cookie_pair(".ASPXAUTH=abc123; path=/; secure; HttpOnly").as_deref(),
            Some(".ASPXAUTH=abc123")
        );
    }

    #[test]
    fn cookie_pair_rejects_garbage() {
        assert_eq!(cookie_pair(""), None);
        assert_eq!(cookie_pair("; path=/"), None);
        assert_eq!(cookie_pair("=value"), None);
    }
}
