// ── Session lifecycle ──
//
// Drives one status fetch per invocation under one of two policies:
//
//   Ephemeral  fresh session every time: handshake, poll, teardown.
//   Cached     one session held across invocations, handshake only when
//              not connected; expiry resets it for the next invocation.
//
// No retries happen here. The caller's scheduler re-invokes on its own
// cadence.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sensilink_api::{Envelope, Session, SessionClient};
use strum::{Display, EnumString};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::PollerConfig;
use crate::credentials::CredentialCache;
use crate::error::CoreError;
use crate::model::{InvocationContext, StatusEvent};
use crate::parser;

/// How a [`StatusPoller`] manages its session between invocations.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LifecyclePolicy {
    /// Open and close a session around every fetch.
    #[default]
    Ephemeral,
    /// Keep one session open and reuse it until the service rejects it.
    Cached,
}

/// Fetches device status over the realtime session protocol.
///
/// Invocations against one poller are serialized: the cached session sits
/// behind an async mutex held for the whole fetch, so two handshakes never
/// touch the same tokens.
#[derive(Debug)]
pub struct StatusPoller {
    client: SessionClient,
    credentials: Arc<CredentialCache>,
    device_id: String,
    policy: LifecyclePolicy,
    cached: Mutex<Session>,
}

impl StatusPoller {
    pub fn new(
        client: SessionClient,
        credentials: Arc<CredentialCache>,
        device_id: impl Into<String>,
        policy: LifecyclePolicy,
    ) -> Self {
        let device_id = device_id.into();
        Self {
            client,
            credentials,
            cached: Mutex::new(Session::new(device_id.clone())),
            device_id,
            policy,
        }
    }

    /// Build a poller from runtime config. Fails if no device is set.
    pub fn from_config(config: &PollerConfig) -> Result<Self, CoreError> {
        let device_id = config.device_id.clone().ok_or_else(|| CoreError::Config {
            message: "no device id configured (set device_id or pass --device)".into(),
        })?;
        let client = SessionClient::new(&config.base_url, &config.transport())?;
        let credentials = Arc::new(CredentialCache::new(
            config.username.clone(),
            config.password.clone(),
        ));
        Ok(Self::new(client, credentials, device_id, config.policy))
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn policy(&self) -> LifecyclePolicy {
        self.policy
    }

    pub fn client(&self) -> &SessionClient {
        &self.client
    }

    /// Copy of the session held by the cached policy.
    ///
    /// Always idle under the ephemeral policy.
    pub async fn session_snapshot(&self) -> Session {
        self.cached.lock().await.clone()
    }

    /// Run one fetch cycle and return the device's current status.
    ///
    /// Exactly one terminal outcome: an event, or one [`CoreError`].
    /// `NoDataAvailable` means the cycle completed but the service had no
    /// status message queued.
    pub async fn fetch_status(&self, ctx: &InvocationContext) -> Result<StatusEvent, CoreError> {
        debug!(
            device_id = %self.device_id,
            policy = %self.policy,
            invocation = %ctx.event_id,
            "fetching status"
        );
        match self.policy {
            LifecyclePolicy::Ephemeral => self.fetch_ephemeral(ctx).await,
            LifecyclePolicy::Cached => self.fetch_cached(ctx).await,
        }
    }

    /// Tear down the cached session, if one is open.
    ///
    /// A no-op under the ephemeral policy, which never leaves a session open.
    pub async fn close(&self) -> Result<(), CoreError> {
        let mut session = self.cached.lock().await;
        self.client.teardown(&mut session).await?;
        Ok(())
    }

    // ── Ephemeral ────────────────────────────────────────────────────

    async fn fetch_ephemeral(&self, ctx: &InvocationContext) -> Result<StatusEvent, CoreError> {
        let mut session = Session::new(self.device_id.clone());
        let polled = self.open_and_poll(&mut session).await;

        // Close whatever got opened, even when a later step failed.
        let closed = self.client.teardown(&mut session).await;

        let envelope = match polled {
            Ok(envelope) => envelope,
            Err(err) => {
                if let Err(teardown_err) = closed {
                    warn!(error = %teardown_err, "teardown after failed cycle also failed");
                }
                return Err(err);
            }
        };

        let event = parser::parse(&envelope, &self.device_id, ctx);
        match (event, closed) {
            (Some(event), Ok(())) => {
                info!(device_id = %event.device_id(), event_id = %event.id(), "status received");
                Ok(event)
            }
            (Some(event), Err(teardown_err)) => {
                warn!(error = %teardown_err, event_id = %event.id(), "status received but teardown failed");
                Err(CoreError::TeardownFailure {
                    message: teardown_err.to_string(),
                    event: Some(Box::new(event)),
                })
            }
            (None, Ok(())) => Err(self.no_data()),
            (None, Err(teardown_err)) => Err(teardown_err.into()),
        }
    }

    async fn open_and_poll(&self, session: &mut Session) -> Result<Envelope, CoreError> {
        self.handshake(session).await?;
        self.client.subscribe(session).await?;
        Ok(self.client.poll_once(session).await?)
    }

    // ── Cached ───────────────────────────────────────────────────────

    async fn fetch_cached(&self, ctx: &InvocationContext) -> Result<StatusEvent, CoreError> {
        let mut session = self.cached.lock().await;

        match self.reuse_and_poll(&mut session).await {
            Ok(envelope) => match parser::parse(&envelope, &self.device_id, ctx) {
                Some(event) => {
                    info!(device_id = %event.device_id(), event_id = %event.id(), "status received");
                    Ok(event)
                }
                None => Err(self.no_data()),
            },
            Err(CoreError::SessionExpired) => {
                warn!(
                    device_id = %self.device_id,
                    "cached session expired; next fetch will re-authenticate"
                );
                session.reset();
                Err(CoreError::SessionExpired)
            }
            Err(err) => Err(err),
        }
    }

    async fn reuse_and_poll(&self, session: &mut Session) -> Result<Envelope, CoreError> {
        if session.is_connected() {
            debug!(established_at = %session.established_at(), "reusing cached session");
        } else {
            // Leftovers from a half-finished handshake must not leak into
            // the new one.
            session.reset();
            self.handshake(session).await?;
        }
        self.client.subscribe(session).await?;
        Ok(self.client.poll_once(session).await?)
    }

    // ── Shared ───────────────────────────────────────────────────────

    /// authenticate -> negotiate -> connect
    async fn handshake(&self, session: &mut Session) -> Result<(), CoreError> {
        let credentials = self.credentials.get().await?;
        self.client.authenticate(credentials, session).await?;
        self.client.negotiate(session).await?;
        self.client.connect(session).await?;
        Ok(())
    }

    fn no_data(&self) -> CoreError {
        debug!(device_id = %self.device_id, "poll returned no status message");
        CoreError::NoDataAvailable {
            device_id: self.device_id.clone(),
        }
    }
}
