use std::fmt;

/// The identifier a reseller is known by: the license key they registered
/// with, or their login username.
///
/// # Invariants
/// - Never empty. "No identity" is modelled as `Option::None`, never as an
///   empty or anonymous reseller.
/// - Contains at least one alphanumeric character, so the derived tag is
///   never the degenerate `[r:]`.
///
/// Identities are resolved per request from the session and are not
/// persisted anywhere by this service.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResellerIdentity(String);

impl ResellerIdentity {
    /// Accept a raw identity string, or `None` if it cannot name a reseller.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.chars().any(char::is_alphanumeric) {
            Some(Self(raw.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResellerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rejects_empty_and_punctuation_only() {
        assert!(ResellerIdentity::parse("").is_none());
        assert!(ResellerIdentity::parse("----").is_none());
        assert!(ResellerIdentity::parse("   ").is_none());
    }

    #[test]
    fn test_parse_keeps_raw_value() {
        let id = ResellerIdentity::parse("ABCD1234-EFGH").unwrap();
        assert_eq!(id.as_str(), "ABCD1234-EFGH");
        assert_eq!(id.to_string(), "ABCD1234-EFGH");
    }
}
