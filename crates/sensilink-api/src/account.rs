// Account API endpoints
//
// REST calls outside the realtime hub. They reuse the session cookie
// captured by `authenticate` but never touch the realtime tokens.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{Error, Step};
use crate::realtime::client::SessionClient;
use crate::session::Session;

/// A thermostat registered to the account.
///
/// Only the identifier and display name are interpreted; every other
/// field is kept verbatim because the set varies by model and firmware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thermostat {
    /// Device identifier used as the subscribe argument.
    #[serde(rename = "ICD", default)]
    pub icd: Option<String>,

    #[serde(rename = "DeviceName", default)]
    pub device_name: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SessionClient {
    /// List the thermostats registered to the authenticated account.
    ///
    /// `GET /api/thermostats`
    pub async fn list_thermostats(&self, session: &Session) -> Result<Vec<Thermostat>, Error> {
        let cookie = session.require_cookie(Step::Authenticate)?;
        let url = self.api_url("thermostats")?;
        debug!("GET {url}");

        let builder = self.http().get(url).headers(Self::api_headers());
        let resp = Self::with_cookie(builder, Step::Authenticate, cookie)?
            .timeout(self.timeout())
            .send()
            .await?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::SessionExpired);
        }
        let resp = resp.error_for_status()?;
        let body = resp.text().await?;

        serde_json::from_str(&body).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body: body.clone(),
            }
        })
    }
}
