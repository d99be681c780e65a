//! Signed session cookie and reseller identity resolution.
//!
//! Cookie value format:
//!
//! ```text
//! base64url(json SessionRecord) "." hex(HMAC-SHA256(secret, base64 part))
//! ```
//!
//! The cookie is the only session store. This module never writes anything
//! except when login or logout asks for a `Set-Cookie` value.

mod codec;

pub use codec::{SessionCodec, SessionError};

use axum::http::HeaderMap;
use axum::http::header::COOKIE;
use tracing::debug;

use crate::types::{ResellerIdentity, SessionRecord};

/// Reads and writes the reseller session cookie.
#[derive(Clone)]
pub struct SessionStore {
    codec: SessionCodec,
    cookie_name: String,
    max_age_secs: u64,
    secure: bool,
}

impl SessionStore {
    pub fn new(codec: SessionCodec, cookie_name: impl Into<String>, max_age_secs: u64, secure: bool) -> Self {
        Self {
            codec,
            cookie_name: cookie_name.into(),
            max_age_secs,
            secure,
        }
    }

    pub fn codec(&self) -> &SessionCodec {
        &self.codec
    }

    /// The session record carried by the request, if present and intact.
    pub fn read(&self, headers: &HeaderMap) -> Option<SessionRecord> {
        let raw = find_cookie(headers, &self.cookie_name)?;
        match self.codec.decode(raw) {
            Ok(record) => Some(record),
            Err(e) => {
                debug!(error = %e, "ignoring invalid session cookie");
                None
            }
        }
    }

    /// Resolve the calling reseller. `None` means unauthenticated.
    pub fn resolve_identity(&self, headers: &HeaderMap) -> Option<ResellerIdentity> {
        self.read(headers)?.identity()
    }

    /// `Set-Cookie` value establishing `record` as the session.
    pub fn issue(&self, record: &SessionRecord) -> Result<String, SessionError> {
        let value = self.codec.encode(record)?;
        Ok(self.cookie(&value, self.max_age_secs))
    }

    /// `Set-Cookie` value that removes the session.
    pub fn clear(&self) -> String {
        self.cookie("", 0)
    }

    fn cookie(&self, value: &str, max_age: u64) -> String {
        let mut cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            self.cookie_name, value, max_age
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

/// Find a cookie by name across all `Cookie` headers.
fn find_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;
    use chrono::Utc;
    use secrecy::SecretString;

    use super::*;

    fn store() -> SessionStore {
        SessionStore::new(
            SessionCodec::new(SecretString::from("test-session-secret")),
            "reseller_session",
            604_800,
            false,
        )
    }

    fn headers_with(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(cookie).unwrap());
        headers
    }

    fn cookie_pair(set_cookie: &str) -> &str {
        set_cookie.split(';').next().unwrap()
    }

    #[test]
    fn test_issue_then_resolve() {
        let store = store();
        let record = SessionRecord::login("Alice", vec![], Utc::now());
        let set_cookie = store.issue(&record).unwrap();

        assert!(set_cookie.contains("HttpOnly"));
        assert!(set_cookie.contains("Max-Age=604800"));
        assert!(!set_cookie.contains("Secure"));

        let headers = headers_with(&format!("theme=dark; {}", cookie_pair(&set_cookie)));
        let identity = store.resolve_identity(&headers).unwrap();
        assert_eq!(identity.as_str(), "alice");
    }

    #[test]
    fn test_missing_cookie_is_unauthenticated() {
        let store = store();
        assert!(store.resolve_identity(&HeaderMap::new()).is_none());
        assert!(store.resolve_identity(&headers_with("theme=dark")).is_none());
    }

    #[test]
    fn test_garbage_cookie_is_unauthenticated() {
        let store = store();
        for value in ["", "abc", "abc.def", "{\"username\":\"alice\"}"] {
            let headers = headers_with(&format!("reseller_session={value}"));
            assert!(store.resolve_identity(&headers).is_none(), "value {value:?}");
        }
    }

    #[test]
    fn test_cookie_signed_with_other_secret_is_rejected() {
        let other = SessionStore::new(
            SessionCodec::new(SecretString::from("someone-elses-secret")),
            "reseller_session",
            60,
            false,
        );
        let set_cookie = other
            .issue(&SessionRecord::login("mallory", vec![], Utc::now()))
            .unwrap();

        let headers = headers_with(cookie_pair(&set_cookie));
        assert!(store().resolve_identity(&headers).is_none());
    }

    #[test]
    fn test_clear_expires_cookie() {
        let cleared = store().clear();
        assert!(cleared.starts_with("reseller_session=;"));
        assert!(cleared.contains("Max-Age=0"));
    }

    #[test]
    fn test_secure_flag() {
        let store = SessionStore::new(
            SessionCodec::new(SecretString::from("s")),
            "reseller_session",
            60,
            true,
        );
        assert!(store.clear().ends_with("; Secure"));
    }
}
