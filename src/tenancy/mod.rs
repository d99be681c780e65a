//! Reseller tenancy layered over the flat upstream key namespace.

mod ownership;
mod tag;

pub use ownership::{TenantIndex, reseller_usernames};
pub use tag::{belongs_to, display_note, has_tag_prefix, stamp_note, tag};
