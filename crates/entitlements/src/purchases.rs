//! Purchase ledger and webhook delivery log.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vault_core::{ProductId, UserId};

use crate::ports::StoreError;

/// One purchased line item of a completed checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseRecord {
    pub user_id: UserId,
    pub product_id: ProductId,
    /// Checkout session that paid for the item.
    pub session_id: String,
    /// Amount in the currency's minor unit (cents).
    pub amount_total: i64,
    pub currency: String,
    pub purchased_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseInsert {
    Recorded,
    /// Same `(session_id, product_id)` was already recorded.
    Duplicate,
}

#[async_trait::async_trait]
pub trait PurchaseLedger: Send + Sync {
    /// Record a purchase; idempotent on `(session_id, product_id)`.
    async fn record_purchase(&self, purchase: PurchaseRecord) -> Result<PurchaseInsert, StoreError>;

    async fn has_purchased(&self, user_id: UserId, product_id: &ProductId) -> Result<bool, StoreError>;

    /// Distinct products the member has paid for, oldest purchase first.
    async fn list_purchased_products(&self, user_id: UserId) -> Result<Vec<ProductId>, StoreError>;
}

/// Deduplicates payment-provider event deliveries.
#[async_trait::async_trait]
pub trait WebhookEventLog: Send + Sync {
    /// Mark an event id as received. Returns `false` if it was seen before.
    async fn mark_received(&self, event_id: &str, event_type: &str) -> Result<bool, StoreError>;
}

#[async_trait::async_trait]
impl<S> PurchaseLedger for Arc<S>
where
    S: PurchaseLedger + ?Sized,
{
    async fn record_purchase(&self, purchase: PurchaseRecord) -> Result<PurchaseInsert, StoreError> {
        (**self).record_purchase(purchase).await
    }

    async fn has_purchased(&self, user_id: UserId, product_id: &ProductId) -> Result<bool, StoreError> {
        (**self).has_purchased(user_id, product_id).await
    }

    async fn list_purchased_products(&self, user_id: UserId) -> Result<Vec<ProductId>, StoreError> {
        (**self).list_purchased_products(user_id).await
    }
}

#[async_trait::async_trait]
impl<S> WebhookEventLog for Arc<S>
where
    S: WebhookEventLog + ?Sized,
{
    async fn mark_received(&self, event_id: &str, event_type: &str) -> Result<bool, StoreError> {
        (**self).mark_received(event_id, event_type).await
    }
}
