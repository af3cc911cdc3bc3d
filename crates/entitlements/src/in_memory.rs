use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, RwLock};

use chrono::{DateTime, Utc};

use vault_access::UserProfile;
use vault_core::{ContentId, ProductId, UserId};

use crate::catalog::{CatalogEntry, Offer};
use crate::grant::{AccessGrant, GrantInsert, GrantTarget, ProfileFlag};
use crate::ports::{
    ChapterCatalog, GrantStore, MasterclassCatalog, OfferCatalog, ProfileStore, StoreError,
};
use crate::purchases::{PurchaseInsert, PurchaseLedger, PurchaseRecord, WebhookEventLog};

#[derive(Debug, Default)]
struct State {
    profiles: HashMap<UserId, UserProfile>,
    offers: HashMap<ProductId, Offer>,
    masterclasses: HashMap<ProductId, CatalogEntry>,
    chapters: HashMap<ProductId, CatalogEntry>,
    grants: BTreeMap<(UserId, GrantTarget), AccessGrant>,
    purchases: BTreeMap<(String, ProductId), PurchaseRecord>,
    webhook_events: HashMap<String, (String, DateTime<Utc>)>,
    writes: u64,
}

/// In-memory vault data source.
///
/// Intended for tests/dev. Every port call takes the lock once, so each
/// operation is atomic the same way a single-row update is in the database.
#[derive(Debug, Default)]
pub struct InMemoryVaultStore {
    state: RwLock<State>,
    fail_next: Mutex<Option<StoreError>>,
}

impl InMemoryVaultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_profile(&self, user_id: UserId, profile: UserProfile) {
        if let Ok(mut state) = self.state.write() {
            state.profiles.insert(user_id, profile);
        }
    }

    pub fn put_offer(&self, offer: Offer) {
        if let Ok(mut state) = self.state.write() {
            state.offers.insert(offer.product_id.clone(), offer);
        }
    }

    pub fn put_masterclass(&self, entry: CatalogEntry) {
        if let Ok(mut state) = self.state.write() {
            state.masterclasses.insert(entry.product_id.clone(), entry);
        }
    }

    pub fn put_chapter(&self, entry: CatalogEntry) {
        if let Ok(mut state) = self.state.write() {
            state.chapters.insert(entry.product_id.clone(), entry);
        }
    }

    /// Number of successful mutations performed through the ports.
    pub fn write_count(&self) -> u64 {
        self.state.read().map(|s| s.writes).unwrap_or(0)
    }

    /// Make the next port call fail with `err` (fault injection for tests).
    pub fn fail_next(&self, err: StoreError) {
        if let Ok(mut slot) = self.fail_next.lock() {
            *slot = Some(err);
        }
    }

    fn injected_failure(&self) -> Result<(), StoreError> {
        let mut slot = self
            .fail_next
            .lock()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        match slot.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, State>, StoreError> {
        self.injected_failure()?;
        self.state
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, State>, StoreError> {
        self.injected_failure()?;
        self.state
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }
}

#[async_trait::async_trait]
impl ProfileStore for InMemoryVaultStore {
    async fn get_profile(&self, user_id: UserId) -> Result<Option<UserProfile>, StoreError> {
        Ok(self.read()?.profiles.get(&user_id).copied())
    }

    async fn set_profile_flag(&self, user_id: UserId, flag: ProfileFlag) -> Result<(), StoreError> {
        let mut state = self.write()?;
        let profile = state
            .profiles
            .get_mut(&user_id)
            .ok_or_else(|| StoreError::NotFound(format!("profile {user_id}")))?;
        flag.apply(profile);
        state.writes += 1;
        Ok(())
    }
}

#[async_trait::async_trait]
impl OfferCatalog for InMemoryVaultStore {
    async fn find_offer_by_product(&self, product_id: &ProductId) -> Result<Option<Offer>, StoreError> {
        Ok(self.read()?.offers.get(product_id).cloned())
    }
}

#[async_trait::async_trait]
impl MasterclassCatalog for InMemoryVaultStore {
    async fn find_masterclass_by_product(
        &self,
        product_id: &ProductId,
    ) -> Result<Option<CatalogEntry>, StoreError> {
        Ok(self.read()?.masterclasses.get(product_id).cloned())
    }
}

#[async_trait::async_trait]
impl ChapterCatalog for InMemoryVaultStore {
    async fn find_chapter_by_product(
        &self,
        product_id: &ProductId,
    ) -> Result<Option<CatalogEntry>, StoreError> {
        Ok(self.read()?.chapters.get(product_id).cloned())
    }
}

#[async_trait::async_trait]
impl GrantStore for InMemoryVaultStore {
    async fn insert_grant(&self, grant: AccessGrant) -> Result<GrantInsert, StoreError> {
        let mut state = self.write()?;
        if state.grants.contains_key(&grant.key()) {
            return Ok(GrantInsert::AlreadyPresent);
        }
        state.grants.insert(grant.key(), grant);
        state.writes += 1;
        Ok(GrantInsert::Created)
    }

    async fn has_grant(&self, user_id: UserId, target_id: ContentId) -> Result<bool, StoreError> {
        Ok(self
            .read()?
            .grants
            .keys()
            .any(|(user, target)| *user == user_id && target.id == target_id))
    }

    async fn list_grants(&self, user_id: UserId) -> Result<Vec<AccessGrant>, StoreError> {
        let state = self.read()?;
        let mut grants: Vec<AccessGrant> = state
            .grants
            .values()
            .filter(|g| g.user_id == user_id)
            .cloned()
            .collect();
        grants.sort_by_key(|g| g.granted_at);
        Ok(grants)
    }
}

#[async_trait::async_trait]
impl PurchaseLedger for InMemoryVaultStore {
    async fn record_purchase(&self, purchase: PurchaseRecord) -> Result<PurchaseInsert, StoreError> {
        let mut state = self.write()?;
        let key = (purchase.session_id.clone(), purchase.product_id.clone());
        if state.purchases.contains_key(&key) {
            return Ok(PurchaseInsert::Duplicate);
        }
        state.purchases.insert(key, purchase);
        state.writes += 1;
        Ok(PurchaseInsert::Recorded)
    }

    async fn has_purchased(&self, user_id: UserId, product_id: &ProductId) -> Result<bool, StoreError> {
        Ok(self
            .read()?
            .purchases
            .values()
            .any(|p| p.user_id == user_id && &p.product_id == product_id))
    }

    async fn list_purchased_products(&self, user_id: UserId) -> Result<Vec<ProductId>, StoreError> {
        let state = self.read()?;
        let mut mine: Vec<&PurchaseRecord> =
            state.purchases.values().filter(|p| p.user_id == user_id).collect();
        mine.sort_by_key(|p| p.purchased_at);

        let mut products: Vec<ProductId> = Vec::with_capacity(mine.len());
        for p in mine {
            if !products.contains(&p.product_id) {
                products.push(p.product_id.clone());
            }
        }
        Ok(products)
    }
}

#[async_trait::async_trait]
impl WebhookEventLog for InMemoryVaultStore {
    async fn mark_received(&self, event_id: &str, event_type: &str) -> Result<bool, StoreError> {
        let mut state = self.write()?;
        if state.webhook_events.contains_key(event_id) {
            return Ok(false);
        }
        state
            .webhook_events
            .insert(event_id.to_string(), (event_type.to_string(), Utc::now()));
        state.writes += 1;
        Ok(true)
    }
}
