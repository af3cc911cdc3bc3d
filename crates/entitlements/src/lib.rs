//! `vault-entitlements` — applies completed purchases to member entitlements.
//!
//! The grant procedure classifies a purchased product against an ordered list
//! of rules (configured full-access product, offers, masterclasses, chapters)
//! and persists the matching profile flag or access grant. Storage and logging
//! are injected through the ports in [`ports`] and [`log`].

pub mod access_check;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod grant;
pub mod in_memory;
pub mod log;
pub mod ports;
pub mod procedure;
pub mod purchases;
pub mod rules;

pub use access_check::check_access;
pub use catalog::{CatalogEntry, Offer, OfferCategory, RawCatalogRow, RawOfferRow};
pub use checkout::{
    CheckoutCompleted, CheckoutProcessor, CheckoutReport, CheckoutStatus, LineItem, LineItemReport,
    LineItemResult, LinePrice, ProductRef,
};
pub use config::{EntitlementConfig, UnknownOfferPolicy};
pub use grant::{AccessGrant, GrantInsert, GrantTarget, GrantTargetKind, ProfileFlag};
pub use in_memory::InMemoryVaultStore;
pub use log::{GrantLogger, LogLevel, TracingGrantLogger};
pub use ports::{
    ChapterCatalog, EntitlementDataSource, GrantStore, MasterclassCatalog, OfferCatalog,
    ProfileStore, StoreError,
};
pub use procedure::{EntitlementGranter, GrantError, GrantOutcome};
pub use purchases::{PurchaseInsert, PurchaseLedger, PurchaseRecord, WebhookEventLog};
pub use rules::{FlagSource, GrantAction, GrantRule};
