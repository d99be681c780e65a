//! Server configuration.
//!
//! Config is read from `~/.config/keyshop/config.toml` (or `--config`) and
//! contains:
//! - KeyAuth seller/app credentials and API endpoints
//! - Session cookie settings and signing secret
//! - Storefront webhook variant → expiry mapping
//!
//! Secrets may instead come from the environment (see `commands::config::ConfigArgs`).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::keyauth::{APP_API_URL, AppCredentials, KeyAuthSettings, SELLER_API_URL};
use crate::session::{SessionCodec, SessionStore};
use crate::tenancy::has_tag_prefix;

const CONFIG_DIR: &str = "keyshop";
const CONFIG_FILE: &str = "config.toml";

/// Top-level server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address (default: 127.0.0.1:3000).
    #[serde(default = "default_bind")]
    pub bind: String,

    #[serde(default)]
    pub keyauth: KeyAuthConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub storefront: StorefrontConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyAuthConfig {
    #[serde(default)]
    pub seller_key: Option<String>,

    /// Application name, for the login/register flow.
    #[serde(default)]
    pub app_name: Option<String>,

    #[serde(default)]
    pub owner_id: Option<String>,

    #[serde(default = "default_seller_api_url")]
    pub seller_api_url: String,

    #[serde(default = "default_app_api_url")]
    pub app_api_url: String,

    #[serde(default = "default_app_version")]
    pub app_version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// HMAC key for signing session cookies.
    #[serde(default)]
    pub secret: Option<String>,

    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    #[serde(default = "default_max_age")]
    pub max_age_secs: u64,

    /// Mark the cookie `Secure` (enable behind HTTPS).
    #[serde(default)]
    pub secure: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorefrontConfig {
    /// Note stamped on storefront keys. Never a reseller tag.
    #[serde(default = "default_storefront_note")]
    pub note: String,

    /// Expiry used for unknown variant ids.
    #[serde(default = "default_expiry_days")]
    pub default_expiry_days: u32,

    /// Checkout variant id → expiry in days.
    #[serde(default = "default_variants")]
    pub variants: BTreeMap<String, u32>,
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_seller_api_url() -> String {
    SELLER_API_URL.to_string()
}

fn default_app_api_url() -> String {
    APP_API_URL.to_string()
}

fn default_app_version() -> String {
    "1.0".to_string()
}

fn default_cookie_name() -> String {
    "reseller_session".to_string()
}

fn default_max_age() -> u64 {
    60 * 60 * 24 * 7
}

fn default_storefront_note() -> String {
    "WEBSITE".to_string()
}

fn default_expiry_days() -> u32 {
    1
}

fn default_variants() -> BTreeMap<String, u32> {
    BTreeMap::from([
        ("683065".to_string(), 1),
        ("952727".to_string(), 7),
        ("952732".to_string(), 90),
    ])
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            keyauth: KeyAuthConfig::default(),
            session: SessionConfig::default(),
            storefront: StorefrontConfig::default(),
        }
    }
}

impl Default for KeyAuthConfig {
    fn default() -> Self {
        Self {
            seller_key: None,
            app_name: None,
            owner_id: None,
            seller_api_url: default_seller_api_url(),
            app_api_url: default_app_api_url(),
            app_version: default_app_version(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secret: None,
            cookie_name: default_cookie_name(),
            max_age_secs: default_max_age(),
            secure: false,
        }
    }
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            note: default_storefront_note(),
            default_expiry_days: default_expiry_days(),
            variants: default_variants(),
        }
    }
}

impl StorefrontConfig {
    /// Storefront keys belong to no reseller, so the note cannot look like a tag.
    pub fn validate(&self) -> Result<()> {
        if has_tag_prefix(&self.note) {
            bail!(
                "storefront.note {:?} starts with a reseller tag prefix; storefront keys would become reseller-owned",
                self.note
            );
        }
        Ok(())
    }

    /// Expiry for a checkout variant, falling back to the default.
    pub fn expiry_for(&self, variant_id: &str) -> u32 {
        self.variants
            .get(variant_id)
            .copied()
            .unwrap_or(self.default_expiry_days)
    }
}

impl ServerConfig {
    /// Load config from `path`, or from the default location.
    ///
    /// A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config: Self = toml::from_str(&content).context("Failed to parse config file")?;
        config.storefront.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Could not determine config directory")?;

        Ok(config_dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Upstream client settings. Fails without a seller key.
    pub fn keyauth_settings(&self) -> Result<KeyAuthSettings> {
        let seller_key = match self.keyauth.seller_key.as_deref() {
            Some(k) if !k.is_empty() => SecretString::from(k),
            _ => bail!("KEYAUTH_SELLER_KEY is not set"),
        };

        let app = match (&self.keyauth.app_name, &self.keyauth.owner_id) {
            (Some(name), Some(owner_id)) if !name.is_empty() && !owner_id.is_empty() => {
                Some(AppCredentials {
                    name: name.clone(),
                    owner_id: owner_id.clone(),
                })
            }
            _ => None,
        };

        Ok(KeyAuthSettings {
            seller_key,
            seller_api_url: Url::parse(&self.keyauth.seller_api_url)
                .context("Invalid keyauth.seller_api_url")?,
            app_api_url: Url::parse(&self.keyauth.app_api_url)
                .context("Invalid keyauth.app_api_url")?,
            app_version: self.keyauth.app_version.clone(),
            app,
        })
    }

    /// Session cookie store. Fails without a signing secret.
    pub fn session_store(&self) -> Result<SessionStore> {
        let secret = match self.session.secret.as_deref() {
            Some(s) if !s.is_empty() => SecretString::from(s),
            _ => bail!("SESSION_SECRET is not set"),
        };

        Ok(SessionStore::new(
            SessionCodec::new(secret),
            self.session.cookie_name.clone(),
            self.session.max_age_secs,
            self.session.secure,
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind, "127.0.0.1:3000");
        assert_eq!(config.keyauth.seller_api_url, SELLER_API_URL);
        assert_eq!(config.session.cookie_name, "reseller_session");
        assert_eq!(config.session.max_age_secs, 604_800);
        assert_eq!(config.storefront.note, "WEBSITE");
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig::load(Some(&dir.path().join("nope.toml"))).unwrap();
        assert_eq!(config.bind, "127.0.0.1:3000");
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
bind = "0.0.0.0:8080"

[keyauth]
seller_key = "abc"
app_name = "demo"
owner_id = "owner"

[storefront.variants]
"111" = 30
"#
        )
        .unwrap();

        let config = ServerConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.bind, "0.0.0.0:8080");
        assert_eq!(config.keyauth.app_version, "1.0");
        assert_eq!(config.storefront.expiry_for("111"), 30);
        assert_eq!(config.storefront.expiry_for("683065"), 1);

        let settings = config.keyauth_settings().unwrap();
        assert_eq!(settings.app.unwrap().name, "demo");
    }

    #[test]
    fn test_invalid_file_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "bind = [").unwrap();
        assert!(ServerConfig::load(Some(file.path())).is_err());
    }

    #[test]
    fn test_tagged_storefront_note_is_rejected() {
        for note in ["[r:abcd1234]promo", "[r:", "[r:ABCD]"] {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            writeln!(file, "[storefront]\nnote = {note:?}").unwrap();
            let err = ServerConfig::load(Some(file.path())).unwrap_err();
            assert!(err.to_string().contains("storefront.note"), "note {note:?}");
        }
    }

    #[test]
    fn test_untagged_storefront_note_is_accepted() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[storefront]\nnote = \"SHOP r:1\"").unwrap();
        let config = ServerConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.storefront.note, "SHOP r:1");
        assert!(StorefrontConfig::default().validate().is_ok());
    }

    #[test]
    fn test_variant_expiry() {
        let storefront = StorefrontConfig::default();
        assert_eq!(storefront.expiry_for("683065"), 1);
        assert_eq!(storefront.expiry_for("952727"), 7);
        assert_eq!(storefront.expiry_for("952732"), 90);
        assert_eq!(storefront.expiry_for("unknown"), 1);
    }

    #[test]
    fn test_secrets_required() {
        let config = ServerConfig::default();
        assert!(config.keyauth_settings().is_err());
        assert!(config.session_store().is_err());
    }

    #[test]
    fn test_app_credentials_optional() {
        let mut config = ServerConfig::default();
        config.keyauth.seller_key = Some("abc".to_string());
        let settings = config.keyauth_settings().unwrap();
        assert!(settings.app.is_none());
    }
}
