//! Which licenses and end users belong to which reseller.
//!
//! Ownership is derived from a snapshot of the upstream key list fetched in
//! the current request. Nothing here is cached: a `TenantIndex` lives exactly
//! as long as the snapshot it borrows from.

use std::collections::{HashMap, HashSet};

use super::tag::{ResellerTag, tag};
use crate::types::{License, ResellerIdentity};

/// Tag → licenses index over one license snapshot.
///
/// Built in a single pass; lookups per reseller are then a hash probe rather
/// than a scan of every key.
pub struct TenantIndex<'a> {
    by_tag: HashMap<ResellerTag, Vec<&'a License>>,
}

impl<'a> TenantIndex<'a> {
    pub fn build(licenses: &'a [License]) -> Self {
        let mut by_tag: HashMap<ResellerTag, Vec<&'a License>> = HashMap::new();
        for license in licenses {
            if let Some(owner) = license.note.as_deref().and_then(ResellerTag::from_note) {
                by_tag.entry(owner).or_default().push(license);
            }
        }
        Self { by_tag }
    }

    /// Licenses owned by `identity`, in snapshot order.
    pub fn licenses(&self, identity: &ResellerIdentity) -> &[&'a License] {
        self.by_tag
            .get(&tag(identity))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Usernames that redeemed at least one license owned by `identity`.
    pub fn redeemers(&self, identity: &ResellerIdentity) -> HashSet<&'a str> {
        self.licenses(identity)
            .iter()
            .filter_map(|&license| license.redeemer())
            .collect()
    }

    /// Number of distinct reseller tags present in the snapshot.
    pub fn tenant_count(&self) -> usize {
        self.by_tag.len()
    }
}

/// Usernames of end users owned by `identity`: everyone who redeemed one of
/// its licenses. Unredeemed licenses contribute nothing.
pub fn reseller_usernames(all_licenses: &[License], identity: &ResellerIdentity) -> HashSet<String> {
    TenantIndex::build(all_licenses)
        .redeemers(identity)
        .into_iter()
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::Map;

    use super::*;
    use crate::tenancy::{belongs_to, stamp_note};

    fn id(raw: &str) -> ResellerIdentity {
        ResellerIdentity::parse(raw).unwrap()
    }

    fn license(key: &str, note: Option<String>, used_by: Option<&str>) -> License {
        License {
            key: key.to_string(),
            note,
            expires: None,
            status: None,
            level: None,
            generated_by: None,
            generated_at: None,
            used_on: None,
            used_by: used_by.map(String::from),
            extra: Map::new(),
        }
    }

    fn snapshot() -> Vec<License> {
        let alice = id("ABCD1234-EFGH");
        let bob = id("bob");
        vec![
            license("K1", Some(stamp_note("vip", &alice)), Some("player1")),
            license("K2", Some(stamp_note("", &alice)), None),
            license("K3", Some(stamp_note("", &alice)), Some("")),
            license("K4", Some(stamp_note("x", &bob)), Some("player2")),
            license("K5", Some("WEBSITE".to_string()), Some("player3")),
            license("K6", None, Some("player4")),
            license("K7", Some(stamp_note("again", &alice)), Some("player1")),
            license("K8", Some(stamp_note("both", &bob)), Some("player1")),
            license("K9", Some(stamp_note("intl", &id("ℂompany1"))), Some("player5")),
        ]
    }

    #[test]
    fn test_reseller_usernames() {
        let all = snapshot();
        let alice = reseller_usernames(&all, &id("ABCD1234-EFGH"));
        assert_eq!(alice, HashSet::from(["player1".to_string()]));

        let bob = reseller_usernames(&all, &id("bob"));
        assert_eq!(
            bob,
            HashSet::from(["player1".to_string(), "player2".to_string()])
        );
    }

    #[test]
    fn test_storefront_redeemers_belong_to_nobody() {
        let all = snapshot();
        for raw in ["ABCD1234-EFGH", "bob", "WEBSITE", "someone-else"] {
            let users = reseller_usernames(&all, &id(raw));
            assert!(!users.contains("player3"));
            assert!(!users.contains("player4"));
        }
    }

    #[test]
    fn test_unknown_reseller_sees_nothing() {
        let all = snapshot();
        assert!(reseller_usernames(&all, &id("nobody")).is_empty());
        assert!(TenantIndex::build(&all).licenses(&id("nobody")).is_empty());
    }

    #[test]
    fn test_index_matches_prefix_scan() {
        let all = snapshot();
        let index = TenantIndex::build(&all);
        assert_eq!(index.tenant_count(), 3);

        for raw in ["ABCD1234-EFGH", "bob", "ℂompany1", "ℂOMPANY1", "WEBSITE", "nobody"] {
            let who = id(raw);
            let indexed: Vec<&str> = index.licenses(&who).iter().map(|l| l.key.as_str()).collect();
            let scanned: Vec<&str> = all
                .iter()
                .filter(|l| belongs_to(l, &who))
                .map(|l| l.key.as_str())
                .collect();
            assert_eq!(indexed, scanned, "identity {raw:?}");
        }
    }

    #[test]
    fn test_identity_with_caseless_uppercase_owns_its_keys() {
        let all = snapshot();
        let who = id("ℂompany1");
        let keys: Vec<&str> = TenantIndex::build(&all)
            .licenses(&who)
            .iter()
            .map(|l| l.key.as_str())
            .collect();
        assert_eq!(keys, vec!["K9"]);
        assert_eq!(
            reseller_usernames(&all, &who),
            HashSet::from(["player5".to_string()])
        );
    }

    #[test]
    fn test_empty_snapshot() {
        assert!(reseller_usernames(&[], &id("bob")).is_empty());
    }
}
