// Realtime polling and teardown
//
// One long-poll request per call. Cursor and group token advance only
// after a response has been fully decoded.

use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;

use crate::error::{Error, Step};
use crate::realtime::client::{LONG_POLLING, SessionClient, TRANSPORT_ID};
use crate::realtime::models::{Envelope, connection_data};
use crate::session::Session;

impl SessionClient {
    /// Issue one long-poll request and return the message envelope.
    ///
    /// `GET /realtime/poll?transport=longPolling&connectionToken=..&connectionData=..&tid=4&_=..&messageId=..[&groupsToken=..]`
    ///
    /// Blocks until the hub returns data or its own timeout elapses, bounded
    /// by the client's `poll_timeout`. On success the session's cursor and
    /// group token are replaced only by values present in the response.
    pub async fn poll_once(&self, session: &mut Session) -> Result<Envelope, Error> {
        let step = Step::Poll;
        let cookie = session.require_cookie(step)?;
        let token = session.require_connection_token(step)?;
        session.require_subscribed(step)?;
        let url = self.realtime_url("poll")?;
        debug!(
            device_id = session.device_id(),
            cursor = session.message_cursor(),
            "GET {url}"
        );

        let mut query = vec![
            ("transport", LONG_POLLING.to_owned()),
            ("connectionToken", token.to_owned()),
            ("connectionData", connection_data()),
            ("tid", TRANSPORT_ID.to_string()),
            ("_", session.cache_buster().to_string()),
        ];
        if let Some(cursor) = session.message_cursor() {
            query.push(("messageId", cursor.to_owned()));
        }
        if let Some(group) = session.group_token() {
            query.push(("groupsToken", group.to_owned()));
        }

        let builder = Self::with_cookie(self.http().get(url).query(&query), step, cookie)?;
        let resp = self.send_bounded(step, builder, self.poll_timeout()).await?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(Error::SessionExpired);
        }
        if !status.is_success() {
            return Err(Error::step(step, format!("HTTP {status}")));
        }

        let envelope: Envelope = Self::read_json(step, resp).await?;
        if envelope.timed_out {
            return Err(Error::SessionExpired);
        }

        session.advance(envelope.cursor.clone(), envelope.group_token.clone());
        debug!(
            messages = envelope.messages().len(),
            cursor = session.message_cursor(),
            "poll complete"
        );
        Ok(envelope)
    }

    /// Close the connection on the remote side.
    ///
    /// `POST /realtime/abort?transport=longPolling&connectionToken=..` with an
    /// empty JSON body. Tearing down an idle session is a no-op success. On
    /// success every token is cleared; on failure the session is untouched
    /// so the caller may retry.
    pub async fn teardown(&self, session: &mut Session) -> Result<(), Error> {
        let step = Step::Teardown;
        if session.is_idle() {
            debug!("teardown skipped: session already closed");
            return Ok(());
        }

        let url = self.realtime_url("abort")?;
        debug!("POST {url}");

        let mut query = vec![("transport", LONG_POLLING)];
        if let Some(token) = session.connection_token() {
            query.push(("connectionToken", token));
        }
        let mut builder = self
            .http()
            .post(url)
            .query(&query)
            .header(CONTENT_TYPE, "application/json")
            .body("");
        if let Some(cookie) = session.cookie() {
            builder = Self::with_cookie(builder, step, cookie)?;
        }
        let resp = self.send(step, builder).await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::step(step, format!("HTTP {status}")));
        }

        session.reset();
        debug!("realtime connection closed");
        Ok(())
    }
}
