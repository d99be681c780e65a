//! KeyAuth seller API client.

use std::sync::Arc;

use reqwest::Client;
use reqwest::header::ACCEPT;
use secrecy::ExposeSecret;
use tracing::debug;

use super::AppSession;
use super::client::{KeyAuthSettings, LicenseService, Listing, NewLicense, UpstreamResponse};
use super::error::KeyAuthError;
use crate::types::{EndUser, License};

const USER_AGENT: &str = concat!("keyshop/", env!("CARGO_PKG_VERSION"));

/// Shared seller-API client.
///
/// Holds no per-caller state: every call carries the seller key and an
/// operation, so one instance serves all requests.
#[derive(Clone)]
pub struct SellerClient {
    http: Client,
    settings: Arc<KeyAuthSettings>,
}

impl SellerClient {
    pub fn new(settings: KeyAuthSettings) -> Result<Self, KeyAuthError> {
        let http = Client::builder().user_agent(USER_AGENT).build()?;

        Ok(Self {
            http,
            settings: Arc::new(settings),
        })
    }

    /// Open a fresh app session for one login or registration attempt.
    ///
    /// Shares the connection pool but never the upstream session id.
    pub fn app_session(&self) -> Result<AppSession, KeyAuthError> {
        let credentials = self
            .settings
            .app
            .clone()
            .ok_or(KeyAuthError::MissingAppCredentials)?;

        Ok(AppSession::new(
            self.http.clone(),
            self.settings.app_api_url.clone(),
            self.settings.app_version.clone(),
            credentials,
        ))
    }

    async fn request(
        &self,
        op: &str,
        params: &[(&str, String)],
    ) -> Result<UpstreamResponse, KeyAuthError> {
        debug!(op, "seller api request");

        let mut query: Vec<(&str, &str)> = Vec::with_capacity(params.len() + 3);
        query.push(("sellerkey", self.settings.seller_key.expose_secret()));
        query.push(("type", op));
        query.extend(params.iter().map(|(k, v)| (*k, v.as_str())));
        query.push(("format", "json"));

        // The seller key travels in the query string; keep it out of errors.
        let response = self
            .http
            .get(self.settings.seller_api_url.clone())
            .query(&query)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| KeyAuthError::Http(e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(KeyAuthError::Status(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| KeyAuthError::Http(e.without_url()))?;

        let parsed: UpstreamResponse = serde_json::from_slice(&body)?;
        debug!(op, success = parsed.success, "seller api response");
        Ok(parsed)
    }

    fn user(username: &str) -> (&'static str, String) {
        ("user", username.to_string())
    }
}

impl LicenseService for SellerClient {
    async fn fetch_all_licenses(&self) -> Result<Listing<License>, KeyAuthError> {
        let mut resp = self.request("fetchallkeys", &[]).await?.into_checked()?;
        let items: Vec<License> = resp.take_list("keys")?;
        debug!(count = items.len(), "fetched licenses");
        Ok(Listing {
            message: resp.message,
            items,
        })
    }

    async fn create_license(&self, license: &NewLicense) -> Result<UpstreamResponse, KeyAuthError> {
        let mut params = vec![
            ("expiry", license.expiry_days.to_string()),
            ("mask", license.mask.clone()),
            ("level", license.level.to_string()),
            ("amount", license.amount.to_string()),
            ("character", (license.charset as u8).to_string()),
        ];
        if let Some(note) = license.note.as_deref().filter(|n| !n.is_empty()) {
            params.push(("note", note.to_string()));
        }
        self.request("add", &params).await
    }

    async fn delete_license(&self, key: &str) -> Result<UpstreamResponse, KeyAuthError> {
        self.request("del", &[("key", key.to_string())]).await
    }

    async fn license_info(&self, key: &str) -> Result<UpstreamResponse, KeyAuthError> {
        self.request("info", &[("key", key.to_string())]).await
    }

    async fn fetch_all_users(&self) -> Result<Listing<EndUser>, KeyAuthError> {
        let mut resp = self.request("fetchallusers", &[]).await?.into_checked()?;
        let items: Vec<EndUser> = resp.take_list("users")?;
        debug!(count = items.len(), "fetched users");
        Ok(Listing {
            message: resp.message,
            items,
        })
    }

    async fn user_data(&self, username: &str) -> Result<UpstreamResponse, KeyAuthError> {
        self.request("userdata", &[Self::user(username)]).await
    }

    async fn delete_user(&self, username: &str) -> Result<UpstreamResponse, KeyAuthError> {
        self.request("deluser", &[Self::user(username)]).await
    }

    async fn ban_user(&self, username: &str, reason: Option<&str>) -> Result<UpstreamResponse, KeyAuthError> {
        let mut params = vec![Self::user(username)];
        if let Some(reason) = reason.filter(|r| !r.is_empty()) {
            params.push(("reason", reason.to_string()));
        }
        self.request("ban", &params).await
    }

    async fn unban_user(&self, username: &str) -> Result<UpstreamResponse, KeyAuthError> {
        self.request("unban", &[Self::user(username)]).await
    }

    async fn reset_user_hwid(&self, username: &str) -> Result<UpstreamResponse, KeyAuthError> {
        self.request("resetuser", &[Self::user(username)]).await
    }

    async fn extend_user(
        &self,
        username: &str,
        subscription: &str,
        expiry_days: u32,
    ) -> Result<UpstreamResponse, KeyAuthError> {
        let params = [
            Self::user(username),
            ("sub", subscription.to_string()),
            ("expiry", expiry_days.to_string()),
        ];
        self.request("extend", &params).await
    }

    async fn login(&self, username: &str, password: &str) -> Result<UpstreamResponse, KeyAuthError> {
        let mut session = self.app_session()?;
        session.login(username, password).await
    }

    async fn register(
        &self,
        username: &str,
        password: &str,
        license_key: &str,
    ) -> Result<UpstreamResponse, KeyAuthError> {
        let mut session = self.app_session()?;
        session.register(username, password, license_key).await
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;
    use url::Url;
    use wiremock::matchers::{method, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::keyauth::AppCredentials;

    fn client_for(server: &MockServer) -> SellerClient {
        let base = Url::parse(&format!("{}/api/seller/", server.uri())).unwrap();
        SellerClient::new(KeyAuthSettings {
            seller_key: SecretString::from("seller-secret"),
            seller_api_url: base.clone(),
            app_api_url: base,
            app_version: "1.0".to_string(),
            app: Some(AppCredentials {
                name: "demo".to_string(),
                owner_id: "owner".to_string(),
            }),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_all_licenses() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("sellerkey", "seller-secret"))
            .and(query_param("type", "fetchallkeys"))
            .and(query_param("format", "json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "message": "Successfully retrieved keys",
                "keys": [
                    {"key": "K1", "note": "[r:bob]a", "usedby": "player1"},
                    {"key": "K2", "note": "WEBSITE"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let listing = client_for(&server).fetch_all_licenses().await.unwrap();
        assert_eq!(listing.message, "Successfully retrieved keys");
        let keys = listing.items;
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0].redeemer(), Some("player1"));
        assert_eq!(keys[1].note.as_deref(), Some("WEBSITE"));
    }

    #[tokio::test]
    async fn test_listing_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("type", "fetchallusers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": false,
                "message": "Seller key is invalid"
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).fetch_all_users().await.unwrap_err();
        assert!(matches!(err, KeyAuthError::Rejected(ref m) if m == "Seller key is invalid"));
    }

    #[tokio::test]
    async fn test_http_status_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let err = client_for(&server).delete_license("K1").await.unwrap_err();
        assert!(matches!(err, KeyAuthError::Status(502)));
    }

    #[tokio::test]
    async fn test_malformed_body_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&server)
            .await;

        let err = client_for(&server).fetch_all_licenses().await.unwrap_err();
        assert!(matches!(err, KeyAuthError::Json(_)));
    }

    #[tokio::test]
    async fn test_create_license_params() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("type", "add"))
            .and(query_param("expiry", "30"))
            .and(query_param("mask", "******-******-******-******"))
            .and(query_param("level", "1"))
            .and(query_param("amount", "1"))
            .and(query_param("character", "1"))
            .and(query_param("note", "[r:abcd1234]VIP customer"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "message": "License(s) successfully created",
                "key": "NEWKEY-000001"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let license = NewLicense::new(30).with_note("[r:abcd1234]VIP customer");
        let resp = client_for(&server).create_license(&license).await.unwrap();
        assert!(resp.success);
        assert_eq!(resp.text("key").as_deref(), Some("NEWKEY-000001"));
    }

    #[tokio::test]
    async fn test_create_license_omits_empty_note() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("type", "add"))
            .and(query_param_is_missing("note"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true, "message": "ok", "key": "K"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let license = NewLicense::new(1).with_note("");
        client_for(&server).create_license(&license).await.unwrap();
    }

    #[tokio::test]
    async fn test_ban_and_extend_params() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("type", "ban"))
            .and(query_param("user", "player1"))
            .and(query_param("reason", "cheating"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true, "message": "Successfully banned user"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("type", "extend"))
            .and(query_param("user", "player1"))
            .and(query_param("sub", "default"))
            .and(query_param("expiry", "7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true, "message": "Successfully extended user"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert!(client.ban_user("player1", Some("cheating")).await.unwrap().success);
        assert!(client.extend_user("player1", "default", 7).await.unwrap().success);
    }

    #[tokio::test]
    async fn test_rejected_mutation_is_returned_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("type", "deluser"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": false, "message": "User not found"
            })))
            .mount(&server)
            .await;

        let resp = client_for(&server).delete_user("ghost").await.unwrap();
        assert!(!resp.success);
        assert_eq!(resp.message, "User not found");
    }

    #[tokio::test]
    async fn test_app_session_requires_credentials() {
        let server = MockServer::start().await;
        let mut client = client_for(&server);
        Arc::make_mut(&mut client.settings).app = None;

        let err = client.login("alice", "pw").await.unwrap_err();
        assert!(matches!(err, KeyAuthError::MissingAppCredentials));
    }
}
