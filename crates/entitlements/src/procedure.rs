//! Entitlement grant procedure.
//!
//! Invoked once per purchased product after a payment is confirmed:
//!
//! 1. Evaluate the configured rules in order until one yields a [`GrantAction`]
//! 2. Persist it (profile flag write or idempotent grant insert)
//! 3. Report the outcome to the injected [`GrantLogger`]
//!
//! The chain is single-attempt and fail-fast: the first data-source error
//! aborts the remaining rules and is returned to the caller, which owns the
//! retry policy.

use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

use vault_core::{ProductId, UserId};

use crate::config::EntitlementConfig;
use crate::grant::{AccessGrant, GrantInsert};
use crate::log::{GrantLogger, LogLevel};
use crate::ports::{EntitlementDataSource, StoreError};
use crate::rules::{GrantAction, GrantRule};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GrantError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("offer for product {product_id} has unrecognized category '{category}'")]
    UnrecognizedOfferCategory {
        product_id: ProductId,
        category: String,
    },
}

/// Result of a grant attempt that did not hit a data-source error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GrantOutcome {
    Granted {
        rule: GrantRule,
        action: GrantAction,
        /// `AlreadyPresent` when a redelivered purchase found its grant in place.
        /// Flag writes always report `Created`.
        insert: GrantInsert,
    },
    /// The product matched no rule; nothing was written.
    NoMatch,
}

impl GrantOutcome {
    pub fn granted(&self) -> bool {
        matches!(self, Self::Granted { .. })
    }

    pub fn action(&self) -> Option<&GrantAction> {
        match self {
            Self::Granted { action, .. } => Some(action),
            Self::NoMatch => None,
        }
    }
}

/// Applies purchased products to member entitlements.
pub struct EntitlementGranter<D, L> {
    source: D,
    logger: L,
    config: EntitlementConfig,
    rules: Vec<GrantRule>,
}

impl<D, L> EntitlementGranter<D, L>
where
    D: EntitlementDataSource,
    L: GrantLogger,
{
    pub fn new(source: D, logger: L, config: EntitlementConfig) -> Self {
        Self::with_rules(source, logger, config, GrantRule::DEFAULT_ORDER.to_vec())
    }

    pub fn with_rules(source: D, logger: L, config: EntitlementConfig, rules: Vec<GrantRule>) -> Self {
        Self {
            source,
            logger,
            config,
            rules,
        }
    }

    pub fn config(&self) -> &EntitlementConfig {
        &self.config
    }

    pub fn source(&self) -> &D {
        &self.source
    }

    pub fn logger(&self) -> &L {
        &self.logger
    }

    /// Grant whatever `product_id` entitles `user_id` to.
    ///
    /// Safe to call repeatedly for the same purchase: flag writes are
    /// idempotent and grant inserts are keyed by `(user, target)`.
    #[instrument(
        skip_all,
        fields(user_id = %user_id, product_id = %product_id),
        err
    )]
    pub async fn grant_access_for_product(
        &self,
        user_id: UserId,
        product_id: &ProductId,
    ) -> Result<GrantOutcome, GrantError> {
        for rule in &self.rules {
            let Some(action) = rule.classify(&self.source, &self.config, product_id).await? else {
                continue;
            };

            tracing::debug!(rule = rule.name(), "product matched grant rule");
            let insert = self.apply(user_id, product_id, &action).await?;

            self.logger.log(LogLevel::Success, &action.describe());
            return Ok(GrantOutcome::Granted {
                rule: *rule,
                action,
                insert,
            });
        }

        self.logger.log(
            LogLevel::Error,
            &format!("No access rule matched product {product_id}"),
        );
        Ok(GrantOutcome::NoMatch)
    }

    async fn apply(
        &self,
        user_id: UserId,
        product_id: &ProductId,
        action: &GrantAction,
    ) -> Result<GrantInsert, GrantError> {
        match action {
            GrantAction::SetFlag { flag, .. } => {
                self.source.set_profile_flag(user_id, *flag).await?;
                Ok(GrantInsert::Created)
            }
            GrantAction::Grant { target, .. } => {
                let grant = AccessGrant::new(user_id, *target, product_id.clone());
                let insert = self.source.insert_grant(grant).await?;
                if insert == GrantInsert::AlreadyPresent {
                    tracing::info!(target_kind = %target.kind, target_id = %target.id, "grant already present");
                }
                Ok(insert)
            }
        }
    }
}
