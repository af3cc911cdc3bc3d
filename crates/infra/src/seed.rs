//! JSON fixtures for the in-memory data source.
//!
//! Lets `vault-admin` and tests run against a populated catalog without a
//! database. Catalog rows go through the same validation as database rows.

use serde::Deserialize;

use vault_access::UserProfile;
use vault_core::{DomainError, UserId};
use vault_entitlements::{CatalogEntry, InMemoryVaultStore, Offer, RawCatalogRow, RawOfferRow};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VaultSeed {
    pub profiles: Vec<SeedProfile>,
    pub offers: Vec<RawOfferRow>,
    pub masterclasses: Vec<RawCatalogRow>,
    pub chapters: Vec<RawCatalogRow>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedProfile {
    #[serde(alias = "id")]
    pub user_id: UserId,
    #[serde(flatten)]
    pub profile: UserProfile,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub profiles: usize,
    pub offers: usize,
    pub masterclasses: usize,
    pub chapters: usize,
}

impl VaultSeed {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Validate every row, then load them into `store`.
    ///
    /// Nothing is written unless all rows are valid.
    pub fn apply(self, store: &InMemoryVaultStore) -> Result<SeedSummary, DomainError> {
        let offers = self
            .offers
            .into_iter()
            .map(Offer::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        let masterclasses = self
            .masterclasses
            .into_iter()
            .map(CatalogEntry::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        let chapters = self
            .chapters
            .into_iter()
            .map(CatalogEntry::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let summary = SeedSummary {
            profiles: self.profiles.len(),
            offers: offers.len(),
            masterclasses: masterclasses.len(),
            chapters: chapters.len(),
        };

        for seed in self.profiles {
            store.put_profile(seed.user_id, seed.profile);
        }
        offers.into_iter().for_each(|o| store.put_offer(o));
        masterclasses.into_iter().for_each(|m| store.put_masterclass(m));
        chapters.into_iter().for_each(|c| store.put_chapter(c));

        Ok(summary)
    }
}
