//! Reseller tags and the note-prefix ownership scheme.
//!
//! The upstream key namespace is flat and shared. Each reseller's keys are
//! marked by prefixing the key note with a short tag derived from the
//! reseller identity:
//!
//! ```text
//! identity "ABCD1234-EFGH"  ->  tag "[r:abcd1234]"
//! note "VIP customer"       ->  stored note "[r:abcd1234]VIP customer"
//! ```
//!
//! Tags are a heuristic partition, not a cryptographic one. Two identities
//! that share their first eight alphanumeric characters (ignoring case) map
//! to the same tag and see each other's keys. No collision detection is done.

use std::fmt;

use crate::types::{License, ResellerIdentity};

/// Number of identity characters kept in a tag.
pub const TAG_ID_LEN: usize = 8;

const TAG_OPEN: &str = "[r:";
const TAG_CLOSE: char = ']';

/// Deterministic ownership marker for one reseller, e.g. `[r:abcd1234]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResellerTag(String);

impl ResellerTag {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Read the tag a note starts with, if it has one.
    ///
    /// Only the tag shape is checked, so this finds the owner of a note
    /// without knowing any identity up front. Any alphanumeric is accepted:
    /// some uppercase letters (`ℂ`) have no lowercase form and survive
    /// [`tag`] unchanged.
    pub fn from_note(note: &str) -> Option<Self> {
        let body = note.strip_prefix(TAG_OPEN)?;
        let end = body.find(TAG_CLOSE)?;
        let id = &body[..end];
        let well_formed = !id.is_empty()
            && id.chars().count() <= TAG_ID_LEN
            && id.chars().all(char::is_alphanumeric);
        if !well_formed {
            return None;
        }
        Some(Self(note[..TAG_OPEN.len() + end + TAG_CLOSE.len_utf8()].to_string()))
    }
}

impl fmt::Display for ResellerTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derive the tag for a reseller identity.
///
/// The identity is lowercased, punctuation and whitespace are stripped, and
/// the first eight remaining characters kept.
pub fn tag(identity: &ResellerIdentity) -> ResellerTag {
    let short: String = identity
        .as_str()
        .chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_alphanumeric())
        .take(TAG_ID_LEN)
        .collect();
    ResellerTag(format!("{TAG_OPEN}{short}{TAG_CLOSE}"))
}

/// Whether a note starts like a reseller tag, well formed or not.
pub fn has_tag_prefix(note: &str) -> bool {
    note.starts_with(TAG_OPEN)
}

/// Prefix a reseller-supplied note with the reseller's tag.
pub fn stamp_note(raw_note: &str, identity: &ResellerIdentity) -> String {
    format!("{}{}", tag(identity), raw_note)
}

/// Whether `license` is owned by `identity`. False when the note is absent.
pub fn belongs_to(license: &License, identity: &ResellerIdentity) -> bool {
    license
        .note
        .as_deref()
        .is_some_and(|note| note.starts_with(tag(identity).as_str()))
}

/// The note as the reseller should see it, with their own tag removed.
///
/// Notes without the tag are returned unchanged; an absent note is empty.
pub fn display_note(license: &License, identity: &ResellerIdentity) -> String {
    let Some(note) = license.note.as_deref() else {
        return String::new();
    };
    let tag = tag(identity);
    note.strip_prefix(tag.as_str()).unwrap_or(note).to_string()
}
