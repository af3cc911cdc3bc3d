//! `vault-access` — access level resolution for vault members.
//!
//! Pure decision logic: maps a profile snapshot to an [`AccessLevel`] and to the
//! capability checks used by page and component gates. No IO, no clock, no
//! configuration.

pub mod explain;
pub mod level;
pub mod profile;
pub mod resolve;

pub use explain::{explain_access, AccessExplanation, DenialKind, DenialReason};
pub use level::{AccessLevel, ContentTier};
pub use profile::UserProfile;
pub use resolve::{
    can_access_course, can_access_masterclass, can_view, has_studio_access, resolve,
    show_completion_badge,
};
