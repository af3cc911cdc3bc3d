//! Completed-checkout processing.
//!
//! Turns one payment-confirmation event into purchase records and one grant
//! attempt per line item. Processing never fails as a whole: the caller always
//! acknowledges the event to the payment provider, and problems are logged and
//! reported per line item instead.

use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use vault_core::{ProductId, UserId};

use crate::log::{GrantLogger, LogLevel};
use crate::ports::EntitlementDataSource;
use crate::procedure::{EntitlementGranter, GrantOutcome};
use crate::purchases::{PurchaseLedger, PurchaseRecord, WebhookEventLog};

pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";

/// Payment-confirmation event for a completed checkout session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutCompleted {
    /// Provider event id (unique per delivery subject, repeated on redelivery).
    pub event_id: String,
    pub session_id: String,
    /// Member id set by the checkout page; preferred over metadata.
    pub client_reference_id: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub line_items: Vec<LineItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub price: Option<LinePrice>,
    #[serde(default)]
    pub amount_total: i64,
    #[serde(default)]
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinePrice {
    pub product: Option<ProductRef>,
}

/// Product reference as sent by the provider: a bare id, or the expanded
/// product object when the line items were fetched with expansion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProductRef {
    Id(String),
    Expanded { id: String },
}

impl ProductRef {
    pub fn id(&self) -> &str {
        match self {
            Self::Id(id) | Self::Expanded { id } => id,
        }
    }
}

impl LineItem {
    pub fn product_id(&self) -> Option<ProductId> {
        let raw = self.price.as_ref()?.product.as_ref()?;
        ProductId::parse(raw.id()).ok()
    }
}

impl CheckoutCompleted {
    /// Member the session was paid for: `client_reference_id`, falling back to
    /// `metadata.userId`.
    pub fn user_id(&self) -> Option<UserId> {
        let candidate = self
            .client_reference_id
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| self.metadata.get("userId").map(String::as_str))?;
        candidate.parse().ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStatus {
    Processed,
    /// Event id seen before; acknowledged without reprocessing.
    Duplicate,
    /// No usable member id on the session; nothing was granted.
    UserMissing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum LineItemResult {
    Granted { description: String },
    NoMatch,
    MissingProduct,
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineItemReport {
    pub product_id: Option<ProductId>,
    pub result: LineItemResult,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutReport {
    pub event_id: String,
    pub session_id: String,
    pub user_id: Option<UserId>,
    pub status: CheckoutStatus,
    pub items: Vec<LineItemReport>,
}

impl CheckoutReport {
    fn new(event: &CheckoutCompleted, user_id: Option<UserId>, status: CheckoutStatus) -> Self {
        Self {
            event_id: event.event_id.clone(),
            session_id: event.session_id.clone(),
            user_id,
            status,
            items: Vec::new(),
        }
    }

    pub fn granted_count(&self) -> usize {
        self.items
            .iter()
            .filter(|i| matches!(i.result, LineItemResult::Granted { .. }))
            .count()
    }
}

pub struct CheckoutProcessor<D, L, P> {
    granter: EntitlementGranter<D, L>,
    ledger: P,
}

impl<D, L, P> CheckoutProcessor<D, L, P>
where
    D: EntitlementDataSource,
    L: GrantLogger,
    P: PurchaseLedger + WebhookEventLog,
{
    pub fn new(granter: EntitlementGranter<D, L>, ledger: P) -> Self {
        Self { granter, ledger }
    }

    pub fn granter(&self) -> &EntitlementGranter<D, L> {
        &self.granter
    }

    #[instrument(
        skip_all,
        fields(event_id = %event.event_id, session_id = %event.session_id)
    )]
    pub async fn process(&self, event: &CheckoutCompleted) -> CheckoutReport {
        match self.ledger.mark_received(&event.event_id, CHECKOUT_COMPLETED).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::info!("duplicate checkout event acknowledged");
                return CheckoutReport::new(event, event.user_id(), CheckoutStatus::Duplicate);
            }
            // Dedup is best-effort; grants are idempotent.
            Err(e) => tracing::warn!(error = %e, "could not record webhook event; processing anyway"),
        }

        let Some(user_id) = event.user_id() else {
            self.granter.logger().log(
                LogLevel::Error,
                &format!("Checkout session {} has no valid user id", event.session_id),
            );
            return CheckoutReport::new(event, None, CheckoutStatus::UserMissing);
        };

        let mut report = CheckoutReport::new(event, Some(user_id), CheckoutStatus::Processed);
        for item in &event.line_items {
            let Some(product_id) = item.product_id() else {
                tracing::warn!("line item without product reference");
                report.items.push(LineItemReport {
                    product_id: None,
                    result: LineItemResult::MissingProduct,
                });
                continue;
            };

            let purchase = PurchaseRecord {
                user_id,
                product_id: product_id.clone(),
                session_id: event.session_id.clone(),
                amount_total: item.amount_total,
                currency: item.currency.to_lowercase(),
                purchased_at: Utc::now(),
            };
            if let Err(e) = self.ledger.record_purchase(purchase).await {
                tracing::error!(product_id = %product_id, error = %e, "failed to record purchase");
            }

            let result = match self.granter.grant_access_for_product(user_id, &product_id).await {
                Ok(GrantOutcome::Granted { action, .. }) => LineItemResult::Granted {
                    description: action.describe(),
                },
                Ok(GrantOutcome::NoMatch) => LineItemResult::NoMatch,
                Err(e) => {
                    self.granter
                        .logger()
                        .log(LogLevel::Error, &format!("Grant failed for {product_id}: {e}"));
                    LineItemResult::Failed { error: e.to_string() }
                }
            };
            report.items.push(LineItemReport {
                product_id: Some(product_id),
                result,
            });
        }

        tracing::info!(
            user_id = %user_id,
            items = report.items.len(),
            granted = report.granted_count(),
            "checkout processed"
        );
        report
    }
}
