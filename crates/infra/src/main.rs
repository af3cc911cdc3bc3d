use anyhow::Context;
use clap::Parser;

use vault_entitlements::InMemoryVaultStore;
use vault_infra::cli::{run, Cli};
use vault_infra::config::{StorageConfig, VaultConfig};
use vault_infra::postgres::PostgresVaultStore;
use vault_infra::seed::VaultSeed;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    vault_observability::init(&cli.log_level, cli.log_format);

    let config = VaultConfig::from_env().context("failed to load vault configuration")?;

    let output = match config.storage {
        StorageConfig::Postgres { ref database_url } => {
            let store = PostgresVaultStore::connect(database_url)
                .await
                .context("failed to connect to Postgres")?;
            store.ensure_schema().await.context("failed to prepare vault schema")?;
            run(cli.command, store, config.entitlements).await?
        }
        StorageConfig::InMemory => {
            tracing::warn!("USE_PERSISTENT_STORES is not set; using an in-memory store");
            let store = InMemoryVaultStore::new();
            if let Some(path) = &cli.seed {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read seed file {}", path.display()))?;
                let summary = VaultSeed::from_json(&raw)
                    .context("failed to parse seed file")?
                    .apply(&store)
                    .context("invalid seed data")?;
                tracing::info!(?summary, "loaded seed data");
            }
            run(cli.command, store, config.entitlements).await?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
