use serde::Serialize;

use crate::{resolve, AccessLevel, ContentTier, UserProfile};

// ─────────────────────────────────────────────────────────────────────────────
// Access Explanation (Gate Rendering + Audit)
// ─────────────────────────────────────────────────────────────────────────────

/// Detailed explanation of a content gate decision.
///
/// Page gates render from this: the prompt tells the UI which call to action to
/// show, and the reason is what support staff see when auditing a complaint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessExplanation {
    /// Tier of the content being gated.
    pub tier: ContentTier,

    /// Resolved access level of the viewer.
    pub level: AccessLevel,

    /// Whether the content renders unlocked.
    pub granted: bool,

    /// Human-readable reason for the decision.
    pub reason: String,

    /// Call to action shown on the gate.
    pub prompt: &'static str,

    /// If denied, this explains what was missing.
    pub denial_reason: Option<DenialReason>,
}

/// Why a gate stayed locked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DenialReason {
    pub kind: DenialKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    /// Guest or anonymous viewer; nothing beyond previews.
    Restricted,
    RequiresCoursePass,
    RequiresFullAccess,
}

pub const PROMPT_START: &str = "Start Learning";
pub const PROMPT_UNLOCK: &str = "Unlock Now";
pub const PROMPT_MEMBERS_ONLY: &str = "Founding Members Only";

/// Explain whether (and why) a viewer may open content of the given tier.
pub fn explain_access(profile: Option<&UserProfile>, tier: ContentTier) -> AccessExplanation {
    let level = resolve::resolve(profile);

    if resolve::can_view(profile, tier) {
        tracing::trace!(level = %level, ?tier, "content gate unlocked");
        return AccessExplanation {
            tier,
            level,
            granted: true,
            reason: format!("Access level '{level}' unlocks {} content", tier_label(tier)),
            prompt: PROMPT_START,
            denial_reason: None,
        };
    }

    let denial = if level == AccessLevel::Restricted {
        DenialReason {
            kind: DenialKind::Restricted,
            message: match profile {
                None => "No member profile is associated with this session".to_string(),
                Some(_) => "Guest profiles are limited to preview content".to_string(),
            },
        }
    } else if tier == ContentTier::Course {
        DenialReason {
            kind: DenialKind::RequiresCoursePass,
            message: "Course content requires a course pass or full access".to_string(),
        }
    } else {
        DenialReason {
            kind: DenialKind::RequiresFullAccess,
            message: "Masterclass content requires full access".to_string(),
        }
    };

    let prompt = match denial.kind {
        DenialKind::Restricted => PROMPT_MEMBERS_ONLY,
        DenialKind::RequiresCoursePass | DenialKind::RequiresFullAccess => PROMPT_UNLOCK,
    };

    tracing::debug!(level = %level, ?tier, kind = ?denial.kind, "content gate locked");

    AccessExplanation {
        tier,
        level,
        granted: false,
        reason: format!(
            "Access level '{level}' does not unlock {} content",
            tier_label(tier)
        ),
        prompt,
        denial_reason: Some(denial),
    }
}

fn tier_label(tier: ContentTier) -> &'static str {
    match tier {
        ContentTier::Free => "free",
        ContentTier::Course => "course",
        ContentTier::Masterclass => "masterclass",
    }
}
