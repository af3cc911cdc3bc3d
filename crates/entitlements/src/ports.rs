//! Data-source ports consumed by the grant procedure.
//!
//! These traits make **no storage assumptions**: the in-memory store backs tests
//! and dev, the Postgres adapter in `vault-infra` backs production. Every call is
//! a single atomic operation on the backing store; the procedure never holds a
//! lock across calls.

use std::sync::Arc;

use thiserror::Error;

use vault_access::UserProfile;
use vault_core::{ContentId, DomainError, ProductId, UserId};

use crate::catalog::{CatalogEntry, Offer};
use crate::grant::{AccessGrant, GrantInsert, ProfileFlag};

/// Data-source operation error.
///
/// These are **infrastructure errors** (connectivity, constraints, bad rows) as
/// opposed to the "no matching product" outcome, which is not an error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("data source unavailable: {0}")]
    Unavailable(String),

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("constraint violation: {0}")]
    Conflict(String),

    #[error("invalid row: {0}")]
    InvalidRow(String),
}

impl From<DomainError> for StoreError {
    fn from(err: DomainError) -> Self {
        StoreError::InvalidRow(err.to_string())
    }
}

#[async_trait::async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, user_id: UserId) -> Result<Option<UserProfile>, StoreError>;

    /// Set a single entitlement flag to `true`.
    ///
    /// Fails with [`StoreError::NotFound`] when the member has no profile row.
    async fn set_profile_flag(&self, user_id: UserId, flag: ProfileFlag) -> Result<(), StoreError>;
}

#[async_trait::async_trait]
pub trait OfferCatalog: Send + Sync {
    async fn find_offer_by_product(&self, product_id: &ProductId) -> Result<Option<Offer>, StoreError>;
}

#[async_trait::async_trait]
pub trait MasterclassCatalog: Send + Sync {
    async fn find_masterclass_by_product(
        &self,
        product_id: &ProductId,
    ) -> Result<Option<CatalogEntry>, StoreError>;
}

#[async_trait::async_trait]
pub trait ChapterCatalog: Send + Sync {
    async fn find_chapter_by_product(
        &self,
        product_id: &ProductId,
    ) -> Result<Option<CatalogEntry>, StoreError>;
}

#[async_trait::async_trait]
pub trait GrantStore: Send + Sync {
    /// Insert a grant unless one already exists for `(user_id, target)`.
    async fn insert_grant(&self, grant: AccessGrant) -> Result<GrantInsert, StoreError>;

    /// Whether the member holds a grant for the given masterclass or chapter.
    async fn has_grant(&self, user_id: UserId, target_id: ContentId) -> Result<bool, StoreError>;

    async fn list_grants(&self, user_id: UserId) -> Result<Vec<AccessGrant>, StoreError>;
}

/// Everything the grant procedure reads from or writes to.
pub trait EntitlementDataSource:
    ProfileStore + OfferCatalog + MasterclassCatalog + ChapterCatalog + GrantStore
{
}

impl<T> EntitlementDataSource for T where
    T: ProfileStore + OfferCatalog + MasterclassCatalog + ChapterCatalog + GrantStore + ?Sized
{
}

#[async_trait::async_trait]
impl<S> ProfileStore for Arc<S>
where
    S: ProfileStore + ?Sized,
{
    async fn get_profile(&self, user_id: UserId) -> Result<Option<UserProfile>, StoreError> {
        (**self).get_profile(user_id).await
    }

    async fn set_profile_flag(&self, user_id: UserId, flag: ProfileFlag) -> Result<(), StoreError> {
        (**self).set_profile_flag(user_id, flag).await
    }
}

#[async_trait::async_trait]
impl<S> OfferCatalog for Arc<S>
where
    S: OfferCatalog + ?Sized,
{
    async fn find_offer_by_product(&self, product_id: &ProductId) -> Result<Option<Offer>, StoreError> {
        (**self).find_offer_by_product(product_id).await
    }
}

#[async_trait::async_trait]
impl<S> MasterclassCatalog for Arc<S>
where
    S: MasterclassCatalog + ?Sized,
{
    async fn find_masterclass_by_product(
        &self,
        product_id: &ProductId,
    ) -> Result<Option<CatalogEntry>, StoreError> {
        (**self).find_masterclass_by_product(product_id).await
    }
}

#[async_trait::async_trait]
impl<S> ChapterCatalog for Arc<S>
where
    S: ChapterCatalog + ?Sized,
{
    async fn find_chapter_by_product(
        &self,
        product_id: &ProductId,
    ) -> Result<Option<CatalogEntry>, StoreError> {
        (**self).find_chapter_by_product(product_id).await
    }
}

#[async_trait::async_trait]
impl<S> GrantStore for Arc<S>
where
    S: GrantStore + ?Sized,
{
    async fn insert_grant(&self, grant: AccessGrant) -> Result<GrantInsert, StoreError> {
        (**self).insert_grant(grant).await
    }

    async fn has_grant(&self, user_id: UserId, target_id: ContentId) -> Result<bool, StoreError> {
        (**self).has_grant(user_id, target_id).await
    }

    async fn list_grants(&self, user_id: UserId) -> Result<Vec<AccessGrant>, StoreError> {
        (**self).list_grants(user_id).await
    }
}
