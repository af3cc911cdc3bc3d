//! Ordered product classification rules.
//!
//! Each rule performs at most one catalog lookup and either yields the action
//! to take or passes. The procedure evaluates the list in order and stops at
//! the first rule that yields an action.

use serde::{Deserialize, Serialize};

use vault_core::ProductId;

use crate::catalog::OfferCategory;
use crate::config::{EntitlementConfig, UnknownOfferPolicy};
use crate::grant::{GrantTarget, ProfileFlag};
use crate::ports::EntitlementDataSource;
use crate::procedure::GrantError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantRule {
    /// Product equals the configured full-access product.
    ConfiguredFullAccess,
    /// Product belongs to an offer in the offer catalog.
    Offer,
    /// Product belongs to a masterclass.
    Masterclass,
    /// Product belongs to a chapter.
    Chapter,
}

impl GrantRule {
    /// Evaluation order used by [`crate::EntitlementGranter::new`].
    pub const DEFAULT_ORDER: [GrantRule; 4] = [
        Self::ConfiguredFullAccess,
        Self::Offer,
        Self::Masterclass,
        Self::Chapter,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::ConfiguredFullAccess => "configured_full_access",
            Self::Offer => "offer",
            Self::Masterclass => "masterclass",
            Self::Chapter => "chapter",
        }
    }

    /// Classify `product_id` under this rule.
    ///
    /// Returns `Ok(None)` when the rule does not apply. Lookup failures abort
    /// classification; they are never treated as "no match".
    pub async fn classify<D>(
        &self,
        source: &D,
        config: &EntitlementConfig,
        product_id: &ProductId,
    ) -> Result<Option<GrantAction>, GrantError>
    where
        D: EntitlementDataSource + ?Sized,
    {
        match self {
            Self::ConfiguredFullAccess => Ok(config
                .is_full_access_product(product_id)
                .then_some(GrantAction::SetFlag {
                    flag: ProfileFlag::FullUnlock,
                    source: FlagSource::ConfiguredProduct,
                })),
            Self::Offer => {
                let Some(offer) = source.find_offer_by_product(product_id).await? else {
                    return Ok(None);
                };
                let flag = match config.classify_offer(&offer) {
                    OfferCategory::FullAccess => ProfileFlag::FullUnlock,
                    OfferCategory::CoursePass => ProfileFlag::CoursePass,
                    OfferCategory::Unrecognized(slug) => match config.unknown_offer_policy {
                        UnknownOfferPolicy::FallThrough => {
                            tracing::warn!(
                                product_id = %product_id,
                                category = %slug,
                                "offer category grants no entitlement; continuing with catalog rules"
                            );
                            return Ok(None);
                        }
                        UnknownOfferPolicy::Reject => {
                            return Err(GrantError::UnrecognizedOfferCategory {
                                product_id: product_id.clone(),
                                category: slug,
                            });
                        }
                    },
                };
                Ok(Some(GrantAction::SetFlag {
                    flag,
                    source: FlagSource::Offer,
                }))
            }
            Self::Masterclass => Ok(source
                .find_masterclass_by_product(product_id)
                .await?
                .map(|entry| GrantAction::Grant {
                    target: GrantTarget::masterclass(entry.id),
                    title: entry.title,
                })),
            Self::Chapter => Ok(source
                .find_chapter_by_product(product_id)
                .await?
                .map(|entry| GrantAction::Grant {
                    target: GrantTarget::chapter(entry.id),
                    title: entry.title,
                })),
        }
    }
}

/// Where a profile flag grant came from (audit only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagSource {
    ConfiguredProduct,
    Offer,
}

/// Mutation a matched rule asks the procedure to persist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GrantAction {
    SetFlag { flag: ProfileFlag, source: FlagSource },
    Grant { target: GrantTarget, title: String },
}

impl GrantAction {
    /// Human-readable outcome recorded in the grant log.
    pub fn describe(&self) -> String {
        match self {
            Self::SetFlag { flag, source } => {
                let what = match flag {
                    ProfileFlag::FullUnlock => "Full Access",
                    ProfileFlag::CoursePass => "Course Pass",
                };
                let origin = match source {
                    FlagSource::ConfiguredProduct => "Env Match",
                    FlagSource::Offer => "Offer",
                };
                format!("Granted {what} ({origin})")
            }
            Self::Grant { target, title } => match target.kind {
                crate::GrantTargetKind::Masterclass => format!("Granted Masterclass: {title}"),
                crate::GrantTargetKind::Chapter => format!("Granted Chapter: {title}"),
            },
        }
    }
}
