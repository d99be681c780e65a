//! Upstream service trait and common types.

use std::future::Future;

use secrecy::SecretString;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

use super::error::KeyAuthError;
use crate::types::{EndUser, License};

pub const SELLER_API_URL: &str = "https://keyauth.win/api/seller/";
pub const APP_API_URL: &str = "https://keyauth.win/api/1.2/";
pub const DEFAULT_MASK: &str = "******-******-******-******";

/// Connection settings for one KeyAuth application.
#[derive(Debug, Clone)]
pub struct KeyAuthSettings {
    pub seller_key: SecretString,
    pub seller_api_url: Url,
    pub app_api_url: Url,
    pub app_version: String,
    /// Needed only for the login/register flow.
    pub app: Option<AppCredentials>,
}

#[derive(Debug, Clone)]
pub struct AppCredentials {
    pub name: String,
    pub owner_id: String,
}

/// The `{success, message, ...}` envelope every upstream call answers with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpstreamResponse {
    pub success: bool,

    #[serde(default)]
    pub message: String,

    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl UpstreamResponse {
    /// Turn `success=false` into [`KeyAuthError::Rejected`].
    pub fn into_checked(self) -> Result<Self, KeyAuthError> {
        if self.success {
            Ok(self)
        } else {
            Err(KeyAuthError::Rejected(self.message))
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// A field as text. Numbers are stringified; null and "" are absent.
    pub fn text(&self, name: &str) -> Option<String> {
        match self.fields.get(name)? {
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Take a list field (`keys`, `users`). A missing or null list is empty.
    pub fn take_list<T: DeserializeOwned>(&mut self, name: &str) -> Result<Vec<T>, KeyAuthError> {
        match self.fields.remove(name) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(list) => Ok(serde_json::from_value(list)?),
        }
    }
}

/// Items from a listing call, with the upstream message that came with them.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing<T> {
    pub message: String,
    pub items: Vec<T>,
}

/// Character set for generated keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    Uppercase = 1,
    Lowercase = 2,
}

/// Parameters for the upstream `add` operation.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLicense {
    pub expiry_days: u32,
    pub mask: String,
    pub level: u32,
    pub amount: u32,
    pub charset: Charset,
    /// Omitted from the request when empty.
    pub note: Option<String>,
}

impl NewLicense {
    /// One uppercase level-1 key with the default mask.
    pub fn new(expiry_days: u32) -> Self {
        Self {
            expiry_days,
            mask: DEFAULT_MASK.to_string(),
            level: 1,
            amount: 1,
            charset: Charset::Uppercase,
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Primitive operations of the remote licensing service.
///
/// The seller-side calls are stateless and safe to share between requests.
/// `login` and `register` each run inside their own short-lived app session
/// so concurrent logins never share upstream session state.
pub trait LicenseService: Send + Sync + 'static {
    fn fetch_all_licenses(&self) -> impl Future<Output = Result<Listing<License>, KeyAuthError>> + Send;

    fn create_license(&self, license: &NewLicense) -> impl Future<Output = Result<UpstreamResponse, KeyAuthError>> + Send;

    fn delete_license(&self, key: &str) -> impl Future<Output = Result<UpstreamResponse, KeyAuthError>> + Send;

    fn license_info(&self, key: &str) -> impl Future<Output = Result<UpstreamResponse, KeyAuthError>> + Send;

    fn fetch_all_users(&self) -> impl Future<Output = Result<Listing<EndUser>, KeyAuthError>> + Send;

    fn user_data(&self, username: &str) -> impl Future<Output = Result<UpstreamResponse, KeyAuthError>> + Send;

    fn delete_user(&self, username: &str) -> impl Future<Output = Result<UpstreamResponse, KeyAuthError>> + Send;

    fn ban_user(&self, username: &str, reason: Option<&str>) -> impl Future<Output = Result<UpstreamResponse, KeyAuthError>> + Send;

    fn unban_user(&self, username: &str) -> impl Future<Output = Result<UpstreamResponse, KeyAuthError>> + Send;

    fn reset_user_hwid(&self, username: &str) -> impl Future<Output = Result<UpstreamResponse, KeyAuthError>> + Send;

    fn extend_user(&self, username: &str, subscription: &str, expiry_days: u32) -> impl Future<Output = Result<UpstreamResponse, KeyAuthError>> + Send;

    /// Username/password login. Fails with [`KeyAuthError::SessionInit`] when
    /// the app session cannot be opened.
    fn login(&self, username: &str, password: &str) -> impl Future<Output = Result<UpstreamResponse, KeyAuthError>> + Send;

    /// Register an account, consuming `license_key`.
    fn register(&self, username: &str, password: &str, license_key: &str) -> impl Future<Output = Result<UpstreamResponse, KeyAuthError>> + Send;
}
