//! Typed catalog records consumed by the grant procedure.
//!
//! Catalog rows arrive loosely typed (nullable columns, joined category
//! slugs). They are converted into [`Offer`] and [`CatalogEntry`] at the
//! boundary, so rule code only ever sees validated values.

use serde::{Deserialize, Serialize};

use vault_core::{ContentId, DomainError, ProductId};

/// Purchasable bundle mapped to a category slug (e.g. `full_access`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offer {
    pub product_id: ProductId,
    pub category_slug: String,
}

/// Classified offer category, resolved against the configured slugs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OfferCategory {
    FullAccess,
    CoursePass,
    Unrecognized(String),
}

/// Masterclass or chapter catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: ContentId,
    pub title: String,
    pub product_id: ProductId,
}

/// Offer row as stored (all columns nullable).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawOfferRow {
    #[serde(alias = "stripe_product_id")]
    pub product_id: Option<String>,
    #[serde(alias = "slug")]
    pub category_slug: Option<String>,
}

/// Masterclass/chapter row as stored (all columns nullable).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCatalogRow {
    pub id: Option<String>,
    pub title: Option<String>,
    #[serde(alias = "stripe_product_id")]
    pub product_id: Option<String>,
}

impl TryFrom<RawOfferRow> for Offer {
    type Error = DomainError;

    fn try_from(row: RawOfferRow) -> Result<Self, Self::Error> {
        let product_id = ProductId::parse(row.product_id.unwrap_or_default())?;
        let category_slug = row
            .category_slug
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| DomainError::validation(format!("offer {product_id} has no category slug")))?;

        Ok(Self {
            product_id,
            category_slug,
        })
    }
}

impl TryFrom<RawCatalogRow> for CatalogEntry {
    type Error = DomainError;

    fn try_from(row: RawCatalogRow) -> Result<Self, Self::Error> {
        let id: ContentId = row
            .id
            .as_deref()
            .ok_or_else(|| DomainError::validation("catalog row has no id"))?
            .parse()?;
        let product_id = ProductId::parse(row.product_id.unwrap_or_default())?;
        let title = row
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| DomainError::validation(format!("catalog entry {id} has no title")))?;

        Ok(Self {
            id,
            title,
            product_id,
        })
    }
}
