//! `vault-infra` — data-source adapters, environment config and the
//! `vault-admin` operations CLI.

pub mod cli;
pub mod config;
pub mod postgres;
pub mod seed;


pub use config::{ConfigError, StorageConfig, VaultConfig};
pub use postgres::PostgresVaultStore;
pub use seed::{SeedSummary, VaultSeed};
