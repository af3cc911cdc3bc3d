//! Environment-driven configuration for vault binaries.

use thiserror::Error;

use vault_core::ProductId;
use vault_entitlements::config::{DEFAULT_COURSE_PASS_CATEGORY, DEFAULT_FULL_ACCESS_CATEGORY};
use vault_entitlements::{EntitlementConfig, UnknownOfferPolicy};

pub const FULL_ACCESS_PRODUCT_VAR: &str = "STRIPE_FULL_ACCESS_PRODUCT_ID";
pub const FULL_ACCESS_CATEGORY_VAR: &str = "VAULT_FULL_ACCESS_CATEGORY";
pub const COURSE_PASS_CATEGORY_VAR: &str = "VAULT_COURSE_PASS_CATEGORY";
pub const UNKNOWN_OFFER_POLICY_VAR: &str = "VAULT_UNKNOWN_OFFER_POLICY";
pub const USE_PERSISTENT_STORES_VAR: &str = "USE_PERSISTENT_STORES";
pub const DATABASE_URL_VAR: &str = "DATABASE_URL";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid value for {var}: {value}")]
    Invalid { var: &'static str, value: String },
}

/// Which data source backs the vault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    InMemory,
    Postgres { database_url: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultConfig {
    pub entitlements: EntitlementConfig,
    pub storage: StorageConfig,
}

impl VaultConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |var: &str| lookup(var).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        // Blank means the configured-product rule never matches.
        let full_access_product_id = match non_blank(FULL_ACCESS_PRODUCT_VAR) {
            Some(raw) => Some(ProductId::parse(raw.as_str()).map_err(|_| ConfigError::Invalid {
                var: FULL_ACCESS_PRODUCT_VAR,
                value: raw,
            })?),
            None => None,
        };

        let unknown_offer_policy = match non_blank(UNKNOWN_OFFER_POLICY_VAR) {
            Some(raw) => parse_policy(&raw).ok_or(ConfigError::Invalid {
                var: UNKNOWN_OFFER_POLICY_VAR,
                value: raw,
            })?,
            None => UnknownOfferPolicy::default(),
        };

        let entitlements = EntitlementConfig {
            full_access_product_id,
            full_access_category: non_blank(FULL_ACCESS_CATEGORY_VAR)
                .unwrap_or_else(|| DEFAULT_FULL_ACCESS_CATEGORY.to_string()),
            course_pass_category: non_blank(COURSE_PASS_CATEGORY_VAR)
                .unwrap_or_else(|| DEFAULT_COURSE_PASS_CATEGORY.to_string()),
            unknown_offer_policy,
        };

        let use_persistent = non_blank(USE_PERSISTENT_STORES_VAR)
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(false);

        let storage = if use_persistent {
            let database_url = non_blank(DATABASE_URL_VAR).ok_or(ConfigError::Missing(DATABASE_URL_VAR))?;
            StorageConfig::Postgres { database_url }
        } else {
            StorageConfig::InMemory
        };

        Ok(Self { entitlements, storage })
    }
}

fn parse_policy(raw: &str) -> Option<UnknownOfferPolicy> {
    match raw.to_ascii_lowercase().as_str() {
        "fall_through" | "fallthrough" => Some(UnknownOfferPolicy::FallThrough),
        "reject" => Some(UnknownOfferPolicy::Reject),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<VaultConfig, ConfigError> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        VaultConfig::from_lookup(|var| vars.get(var).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.entitlements, EntitlementConfig::default());
        assert_eq!(config.storage, StorageConfig::InMemory);
    }

    #[test]
    fn reads_full_access_product_and_categories() {
        let config = config_from(&[
            (FULL_ACCESS_PRODUCT_VAR, " prod_all "),
            (FULL_ACCESS_CATEGORY_VAR, "everything"),
            (COURSE_PASS_CATEGORY_VAR, "courses"),
        ])
        .unwrap();

        assert_eq!(
            config.entitlements.full_access_product_id,
            Some(ProductId::parse("prod_all").unwrap())
        );
        assert_eq!(config.entitlements.full_access_category, "everything");
        assert_eq!(config.entitlements.course_pass_category, "courses");
    }

    #[test]
    fn blank_full_access_product_is_unset() {
        let config = config_from(&[(FULL_ACCESS_PRODUCT_VAR, "   ")]).unwrap();
        assert_eq!(config.entitlements.full_access_product_id, None);
    }

    #[test]
    fn parses_unknown_offer_policy() {
        let config = config_from(&[(UNKNOWN_OFFER_POLICY_VAR, "REJECT")]).unwrap();
        assert_eq!(config.entitlements.unknown_offer_policy, UnknownOfferPolicy::Reject);

        let err = config_from(&[(UNKNOWN_OFFER_POLICY_VAR, "ignore")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: UNKNOWN_OFFER_POLICY_VAR, .. }));
    }

    #[test]
    fn persistent_stores_require_database_url() {
        let err = config_from(&[(USE_PERSISTENT_STORES_VAR, "true")]).unwrap_err();
        assert_eq!(err, ConfigError::Missing(DATABASE_URL_VAR));

        let config = config_from(&[
            (USE_PERSISTENT_STORES_VAR, "true"),
            (DATABASE_URL_VAR, "postgres://localhost/vault"),
        ])
        .unwrap();
        assert_eq!(
            config.storage,
            StorageConfig::Postgres {
                database_url: "postgres://localhost/vault".to_string()
            }
        );
    }

    #[test]
    fn unparsable_persistence_flag_means_in_memory() {
        let config = config_from(&[(USE_PERSISTENT_STORES_VAR, "yes")]).unwrap();
        assert_eq!(config.storage, StorageConfig::InMemory);
    }
}
