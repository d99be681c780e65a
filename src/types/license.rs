use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::Scalar;

/// A redeemable license key as reported by the upstream `fetchallkeys` call.
///
/// # Ownership
/// The upstream service has no notion of resellers. Ownership is encoded as a
/// tag prefix inside `note` (see `tenancy::tag`) and is computed, never
/// stored as a separate field.
///
/// Fields this service does not interpret are kept in `extra` and passed back
/// to callers unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct License {
    pub key: String,

    /// Free-text note. Reseller-created keys carry the reseller tag as prefix.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,

    /// Expiry, in days (or upstream-formatted duration).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<Scalar>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    /// Subscription level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<Scalar>,

    #[serde(default, rename = "genby", skip_serializing_if = "Option::is_none")]
    pub generated_by: Option<String>,

    /// Creation timestamp.
    #[serde(default, rename = "gendate", skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<Scalar>,

    /// Redemption timestamp, once redeemed.
    #[serde(default, rename = "usedon", skip_serializing_if = "Option::is_none")]
    pub used_on: Option<Scalar>,

    /// Username of the redeemer, once redeemed.
    #[serde(default, rename = "usedby", skip_serializing_if = "Option::is_none")]
    pub used_by: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl License {
    /// Username that redeemed this key, if any. Empty strings count as unredeemed.
    pub fn redeemer(&self) -> Option<&str> {
        self.used_by.as_deref().filter(|u| !u.is_empty())
    }
}

/// A subscription record attached to an upstream user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<Scalar>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeleft: Option<Scalar>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An upstream end-user account as reported by `fetchallusers`.
///
/// Users are never owned directly: a reseller sees a user only if that user
/// redeemed at least one of the reseller's licenses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndUser {
    pub username: String,

    #[serde(default)]
    pub subscriptions: Vec<Subscription>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hwid: Option<String>,

    #[serde(default, rename = "createdate", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Scalar>,

    #[serde(default, rename = "lastlogin", skip_serializing_if = "Option::is_none")]
    pub last_login: Option<Scalar>,

    /// Ban reason while banned; null or empty otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banned: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EndUser {
    pub fn is_banned(&self) -> bool {
        self.banned.as_deref().is_some_and(|b| !b.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_license_from_upstream_json() {
        let json = r#"{
            "id": "42",
            "key": "ABCDEF-GHIJKL",
            "note": "[r:abcd1234]VIP customer",
            "expires": "2592000",
            "status": "Used",
            "level": "1",
            "genby": "seller",
            "gendate": 1700000000,
            "usedon": 1700001000,
            "usedby": "player1",
            "app": "demo"
        }"#;

        let license: License = serde_json::from_str(json).unwrap();
        assert_eq!(license.key, "ABCDEF-GHIJKL");
        assert_eq!(license.redeemer(), Some("player1"));
        assert_eq!(license.level.as_ref().and_then(Scalar::as_u32), Some(1));
        assert_eq!(license.extra.get("app"), Some(&Value::from("demo")));

        // Unknown fields survive a round trip back to the caller.
        let back = serde_json::to_value(&license).unwrap();
        assert_eq!(back["id"], "42");
        assert_eq!(back["usedby"], "player1");
    }

    #[test]
    fn test_unredeemed_license() {
        let license: License =
            serde_json::from_str(r#"{"key": "K1", "usedby": "", "note": null}"#).unwrap();
        assert_eq!(license.redeemer(), None);
        assert!(license.note.is_none());

        let license: License = serde_json::from_str(r#"{"key": "K2"}"#).unwrap();
        assert_eq!(license.redeemer(), None);
    }

    #[test]
    fn test_end_user_from_upstream_json() {
        let json = r#"{
            "username": "player1",
            "subscriptions": [{"subscription": "default", "key": "K1", "expiry": "1800000000"}],
            "ip": "127.0.0.1",
            "hwid": "S-1-5-21",
            "createdate": "1700000000",
            "lastlogin": "1700005000",
            "banned": null
        }"#;

        let user: EndUser = serde_json::from_str(json).unwrap();
        assert_eq!(user.username, "player1");
        assert_eq!(user.subscriptions.len(), 1);
        assert_eq!(user.subscriptions[0].subscription.as_deref(), Some("default"));
        assert!(!user.is_banned());
    }

    #[test]
    fn test_end_user_banned() {
        let user: EndUser =
            serde_json::from_str(r#"{"username": "cheater", "banned": "cheating"}"#).unwrap();
        assert!(user.is_banned());
        assert!(user.subscriptions.is_empty());
    }
}
