// Thermostat discovery: which device ids does this account own?

use sensilink_api::{Session, SessionClient, Thermostat};
use tracing::info;

use crate::config::PollerConfig;
use crate::credentials::CredentialCache;
use crate::error::CoreError;

/// Authenticate with a throwaway session and list the account's devices.
///
/// Only the cookie is needed, so no realtime connection is opened.
pub async fn discover_thermostats(
    client: &SessionClient,
    credentials: &CredentialCache,
) -> Result<Vec<Thermostat>, CoreError> {
    let mut session = Session::new(String::new());
    let credentials = credentials.get().await?;
    client.authenticate(credentials, &mut session).await?;

    let thermostats = client.list_thermostats(&session).await?;
    info!(count = thermostats.len(), "discovered thermostats");
    Ok(thermostats)
}

/// [`discover_thermostats`] driven by a runtime config.
pub async fn discover_with_config(config: &PollerConfig) -> Result<Vec<Thermostat>, CoreError> {
    let client = SessionClient::new(&config.base_url, &config.transport())?;
    let credentials = CredentialCache::new(config.username.clone(), config.password.clone());
    discover_thermostats(&client, &credentials).await
}
