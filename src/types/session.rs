use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::ResellerIdentity;

/// How a session was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthType {
    Login,
    Register,
}

/// The structured record carried (signed) in the reseller session cookie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    /// Random per-session id, useful for correlating logs.
    pub sid: Uuid,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// The license key a session was registered with. Takes precedence over
    /// `username` as the reseller identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_type: Option<AuthType>,

    #[serde(default)]
    pub authenticated: bool,

    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    pub timestamp: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<Value>,

    #[serde(default)]
    pub subscriptions: Vec<Value>,
}

impl SessionRecord {
    /// A fresh record for a successful username/password login.
    pub fn login(username: &str, subscriptions: Vec<Value>, now: DateTime<Utc>) -> Self {
        Self {
            sid: Uuid::new_v4(),
            username: Some(username.to_lowercase()),
            license_key: None,
            auth_type: Some(AuthType::Login),
            authenticated: true,
            timestamp: now.timestamp_millis(),
            level: None,
            subscriptions,
        }
    }

    /// The reseller this session speaks for.
    ///
    /// A registration license key wins over a login username; empty values
    /// are treated as absent.
    pub fn identity(&self) -> Option<ResellerIdentity> {
        [self.license_key.as_deref(), self.username.as_deref()]
            .into_iter()
            .flatten()
            .find(|v| !v.is_empty())
            .and_then(ResellerIdentity::parse)
    }
}
