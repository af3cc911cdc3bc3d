//! Grant records and profile flag mutations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vault_core::{ContentId, ProductId, UserId};

/// Class of entity an access grant points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantTargetKind {
    Masterclass,
    Chapter,
}

impl GrantTargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Masterclass => "masterclass",
            Self::Chapter => "chapter",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "masterclass" => Some(Self::Masterclass),
            "chapter" => Some(Self::Chapter),
            _ => None,
        }
    }
}

impl core::fmt::Display for GrantTargetKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GrantTarget {
    pub kind: GrantTargetKind,
    pub id: ContentId,
}

impl GrantTarget {
    pub fn masterclass(id: ContentId) -> Self {
        Self {
            kind: GrantTargetKind::Masterclass,
            id,
        }
    }

    pub fn chapter(id: ContentId) -> Self {
        Self {
            kind: GrantTargetKind::Chapter,
            id,
        }
    }
}

/// Persisted link between a member and a purchased masterclass or chapter.
///
/// Unique per `(user_id, target)`; the first insert wins and later inserts for
/// the same pair leave the stored record untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessGrant {
    pub user_id: UserId,
    pub target: GrantTarget,
    pub product_id: ProductId,
    pub granted_at: DateTime<Utc>,
}

impl AccessGrant {
    pub fn new(user_id: UserId, target: GrantTarget, product_id: ProductId) -> Self {
        Self {
            user_id,
            target,
            product_id,
            granted_at: Utc::now(),
        }
    }

    pub fn key(&self) -> (UserId, GrantTarget) {
        (self.user_id, self.target)
    }
}

/// Result of an idempotent grant insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantInsert {
    Created,
    AlreadyPresent,
}

/// Profile-level entitlement flags the grant procedure may set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileFlag {
    FullUnlock,
    CoursePass,
}

impl ProfileFlag {
    /// Column name on the profile row.
    pub fn column(&self) -> &'static str {
        match self {
            Self::FullUnlock => "has_full_unlock",
            Self::CoursePass => "has_course_pass",
        }
    }

    pub fn apply(&self, profile: &mut vault_access::UserProfile) {
        match self {
            Self::FullUnlock => profile.has_full_unlock = true,
            Self::CoursePass => profile.has_course_pass = true,
        }
    }
}
