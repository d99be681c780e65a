//! KeyAuth application API session, used only for login and registration.

use reqwest::Client;
use tracing::{debug, warn};
use url::Url;

use super::client::{AppCredentials, UpstreamResponse};
use super::error::KeyAuthError;

/// One upstream app session.
///
/// Created per login/registration attempt and dropped afterwards. The
/// session id obtained from `init` is never shared with another caller.
pub struct AppSession {
    http: Client,
    url: Url,
    version: String,
    credentials: AppCredentials,
    session_id: Option<String>,
}

impl AppSession {
    pub(super) fn new(http: Client, url: Url, version: String, credentials: AppCredentials) -> Self {
        Self {
            http,
            url,
            version,
            credentials,
            session_id: None,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.session_id.is_some()
    }

    async fn request(
        &self,
        op: &str,
        params: &[(&str, &str)],
    ) -> Result<UpstreamResponse, KeyAuthError> {
        debug!(op, "app api request");

        let mut form: Vec<(&str, &str)> = Vec::with_capacity(params.len() + 4);
        form.push(("type", op));
        form.push(("name", self.credentials.name.as_str()));
        form.push(("ownerid", self.credentials.owner_id.as_str()));
        form.extend_from_slice(params);
        if let Some(sid) = self.session_id.as_deref() {
            form.push(("sessionid", sid));
        }

        let response = self.http.post(self.url.clone()).form(&form).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(KeyAuthError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Open the upstream session. Required before login or register.
    pub async fn init(&mut self) -> Result<UpstreamResponse, KeyAuthError> {
        let version = self.version.clone();
        let resp = self
            .request("init", &[("ver", version.as_str()), ("hash", "")])
            .await?;

        if resp.success {
            self.session_id = resp.text("sessionid");
        }
        Ok(resp)
    }

    async fn ensure_initialized(&mut self) -> Result<(), KeyAuthError> {
        if self.is_initialized() {
            return Ok(());
        }

        let resp = self.init().await?;
        if !resp.success {
            warn!(message = %resp.message, "app session init rejected");
            return Err(KeyAuthError::SessionInit(resp.message));
        }
        if !self.is_initialized() {
            return Err(KeyAuthError::SessionInit("no session id returned".to_string()));
        }
        Ok(())
    }

    pub async fn login(&mut self, username: &str, password: &str) -> Result<UpstreamResponse, KeyAuthError> {
        self.ensure_initialized().await?;
        self.request("login", &[("username", username), ("pass", password)])
            .await
    }

    pub async fn register(
        &mut self,
        username: &str,
        password: &str,
        license_key: &str,
    ) -> Result<UpstreamResponse, KeyAuthError> {
        self.ensure_initialized().await?;
        self.request(
            "register",
            &[("username", username), ("pass", password), ("key", license_key)],
        )
        .await
    }
}
