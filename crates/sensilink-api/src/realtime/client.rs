// Realtime hub HTTP client
//
// Wraps `reqwest::Client` with vendor-specific URL construction, header
// conventions, and per-step error mapping. The handshake and polling
// steps are implemented as inherent methods in `handshake.rs` and
// `poll.rs` to keep this module focused on transport mechanics.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, COOKIE};
use serde::de::DeserializeOwned;
use tracing::trace;
use url::Url;

use crate::error::{Error, Step};
use crate::transport::TransportConfig;

/// Production endpoint of the vendor's cloud service.
pub const DEFAULT_BASE_URL: &str = "https://bus-serv.sensicomfort.com";

/// Fixed transport sub-id the hub expects on connect and poll.
pub(crate) const TRANSPORT_ID: u32 = 4;

/// Transport name for every realtime request.
pub(crate) const LONG_POLLING: &str = "longPolling";

/// Client for the vendor's long-polling realtime hub and account API.
///
/// Stateless apart from connection pooling: all protocol state lives in
/// the [`Session`](crate::Session) passed to each step, so one client can
/// drive any number of sequential sessions.
#[derive(Debug, Clone)]
pub struct SessionClient {
    http: reqwest::Client,
    base_url: Url,
    timeout: Duration,
    poll_timeout: Duration,
}

impl SessionClient {
    /// Create a client from a `TransportConfig`.
    ///
    /// `base_url` is the service root, e.g. [`DEFAULT_BASE_URL`].
    pub fn new(base_url: &str, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url: Self::normalize_base_url(base_url)?,
            timeout: transport.timeout,
            poll_timeout: transport.poll_timeout,
        })
    }

    /// Wrap an existing `reqwest::Client` with default timeouts.
    pub fn with_client(http: reqwest::Client, base_url: &str) -> Result<Self, Error> {
        let defaults = TransportConfig::default();
        Ok(Self {
            http,
            base_url: Self::normalize_base_url(base_url)?,
            timeout: defaults.timeout,
            poll_timeout: defaults.poll_timeout,
        })
    }

    /// Override the per-step and poll bounds.
    pub fn with_timeouts(mut self, timeout: Duration, poll_timeout: Duration) -> Self {
        self.timeout = timeout;
        self.poll_timeout = poll_timeout;
        self
    }

    /// The service root URL (always ends with `/`).
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn poll_timeout(&self) -> Duration {
        self.poll_timeout
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        let path = url.path().trim_end_matches('/').to_owned();
        url.set_path(&format!("{path}/"));
        Ok(url)
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// `{base}/api/{path}`
    pub(crate) fn api_url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(&format!("api/{path}"))?)
    }

    /// `{base}/realtime/{path}`
    pub(crate) fn realtime_url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(&format!("realtime/{path}"))?)
    }

    // ── Header helpers ───────────────────────────────────────────────

    /// Headers the account API expects from its web front-end.
    pub(crate) fn api_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("X-Requested-With", HeaderValue::from_static("XMLHttpRequest"));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json; version=1, */*; q=0.01"),
        );
        headers
    }

    /// Attach the session cookie to a request.
    pub(crate) fn with_cookie(
        builder: reqwest::RequestBuilder,
        step: Step,
        cookie: &str,
    ) -> Result<reqwest::RequestBuilder, Error> {
        let mut value = HeaderValue::from_str(cookie)
            .map_err(|e| Error::step(step, format!("session cookie is not a valid header: {e}")))?;
        value.set_sensitive(true);
        Ok(builder.header(COOKIE, value))
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a request bounded by the per-step timeout.
    pub(crate) async fn send(
        &self,
        step: Step,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, Error> {
        self.send_bounded(step, builder, self.timeout).await
    }

    /// Send a request with an explicit bound, mapping transport failures
    /// (including timeouts) onto `step`.
    pub(crate) async fn send_bounded(
        &self,
        step: Step,
        builder: reqwest::RequestBuilder,
        bound: Duration,
    ) -> Result<reqwest::Response, Error> {
        builder
            .timeout(bound)
            .send()
            .await
            .map_err(|e| Error::transport(step, &e))
    }

    /// Read the body and decode it, attributing failures to `step`.
    pub(crate) async fn read_json<T: DeserializeOwned>(
        step: Step,
        resp: reqwest::Response,
    ) -> Result<T, Error> {
        let body = resp.text().await.map_err(|e| Error::transport(step, &e))?;
        trace!(%step, body_len = body.len(), "response body received");

        serde_json::from_str(&body).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            Error::step(step, format!("unparseable response: {e} (body preview: {preview:?})"))
        })
    }
}
