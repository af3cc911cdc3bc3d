//! Grant procedure configuration (injected at construction).

use serde::{Deserialize, Serialize};

use vault_core::ProductId;

use crate::catalog::{Offer, OfferCategory};

pub const DEFAULT_FULL_ACCESS_CATEGORY: &str = "full_access";
pub const DEFAULT_COURSE_PASS_CATEGORY: &str = "course_pass";

/// What to do with an offer whose category slug is neither full access nor
/// course pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownOfferPolicy {
    /// Log a warning and continue with the masterclass and chapter rules.
    #[default]
    FallThrough,
    /// Abort the grant with [`crate::GrantError::UnrecognizedOfferCategory`].
    Reject,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitlementConfig {
    /// Product that always grants full unlock, independent of the catalogs.
    pub full_access_product_id: Option<ProductId>,
    pub full_access_category: String,
    pub course_pass_category: String,
    pub unknown_offer_policy: UnknownOfferPolicy,
}

impl Default for EntitlementConfig {
    fn default() -> Self {
        Self {
            full_access_product_id: None,
            full_access_category: DEFAULT_FULL_ACCESS_CATEGORY.to_string(),
            course_pass_category: DEFAULT_COURSE_PASS_CATEGORY.to_string(),
            unknown_offer_policy: UnknownOfferPolicy::default(),
        }
    }
}

impl EntitlementConfig {
    pub fn with_full_access_product(product_id: ProductId) -> Self {
        Self {
            full_access_product_id: Some(product_id),
            ..Self::default()
        }
    }

    pub fn is_full_access_product(&self, product_id: &ProductId) -> bool {
        self.full_access_product_id.as_ref() == Some(product_id)
    }

    pub fn classify_offer(&self, offer: &Offer) -> OfferCategory {
        let slug = offer.category_slug.as_str();
        if slug == self.full_access_category {
            OfferCategory::FullAccess
        } else if slug == self.course_pass_category {
            OfferCategory::CoursePass
        } else {
            OfferCategory::Unrecognized(slug.to_string())
        }
    }
}
