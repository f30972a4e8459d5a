use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

/// Account credentials for the vendor's authorize endpoint.
///
/// Supplied once per process. The password is already decrypted here;
/// decryption and caching are handled by the caller (see
/// `sensilink_core::CredentialCache`).
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: SecretString) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }

    /// The JSON body expected by `POST /api/authorize`.
    pub(crate) fn authorize_body(&self) -> AuthorizeBody<'_> {
        AuthorizeBody {
            user_name: &self.username,
            password: self.password.expose_secret(),
        }
    }
}

#[derive(Serialize)]
pub(crate) struct AuthorizeBody<'a> {
    #[serde(rename = "UserName")]
    user_name: &'a str,
    #[serde(rename = "Password")]
    password: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorize_body_uses_vendor_field_names() {
        let creds = Credentials::new("me@example.com", SecretString::from("hunter2".to_string()));
        let body = serde_json::to_value(creds.authorize_body()).unwrap_or_default();
        assert_eq!(
            body,
            serde_json::json!({ "UserName": "me@example.com", "Password": "hunter2" })
        );
    }

    #[test]
    fn debug_redacts_password() {
        let creds = Credentials::new("me", SecretString::from("hunter2".to_string()));
        assert!(!format!("{creds:?}").contains("hunter2"));
    }
}
