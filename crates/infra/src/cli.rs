//! `vault-admin` command-line interface.
//!
//! Commands run against any vault data source; the binary picks Postgres or
//! the in-memory store from the environment.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;
use thiserror::Error;

use vault_access::{
    can_access_course, can_access_masterclass, has_studio_access, resolve, AccessLevel,
};
use vault_core::{ProductId, UserId};
use vault_entitlements::{
    check_access, AccessGrant, EntitlementConfig, EntitlementDataSource, EntitlementGranter,
    GrantError, GrantOutcome, PurchaseLedger, StoreError, TracingGrantLogger,
};
use vault_observability::LogFormat;

#[derive(Debug, Parser)]
#[command(name = "vault-admin", about = "Inspect and repair vault member entitlements")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Fallback log filter when RUST_LOG is unset (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    /// Log output format (json, pretty)
    #[arg(long, global = true, default_value = "json", value_parser = parse_log_format)]
    pub log_format: LogFormat,

    /// JSON fixture loaded into the in-memory store (ignored with Postgres)
    #[arg(long, global = true)]
    pub seed: Option<PathBuf>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run the grant procedure for one purchased product (manual retry)
    Grant {
        /// Member id
        #[arg(long)]
        user: UserId,
        /// Payment-provider product id
        #[arg(long)]
        product: ProductId,
    },
    /// Show a member's resolved access level and grants
    Access {
        /// Member id
        #[arg(long)]
        user: UserId,
    },
    /// Check whether a member holds a grant for a masterclass or chapter
    Check {
        /// Member id
        #[arg(long)]
        user: String,
        /// Masterclass or chapter id
        #[arg(long)]
        object: String,
    },
}

fn parse_log_format(raw: &str) -> Result<LogFormat, String> {
    LogFormat::parse(raw).ok_or_else(|| format!("unknown log format '{raw}' (expected json or pretty)"))
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Grant(#[from] GrantError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Member access overview printed by `vault-admin access`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessSummary {
    pub user_id: UserId,
    pub profile_found: bool,
    pub level: AccessLevel,
    pub can_access_course: bool,
    pub can_access_masterclass: bool,
    pub studio_access: bool,
    pub grants: Vec<AccessGrant>,
    pub purchased_products: Vec<ProductId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum CommandOutput {
    Grant {
        user_id: UserId,
        product_id: ProductId,
        outcome: GrantOutcome,
    },
    Access(AccessSummary),
    Check {
        user_id: String,
        object_id: String,
        granted: bool,
    },
}

/// Execute `command` against `source`.
pub async fn run<D>(
    command: Command,
    source: D,
    config: EntitlementConfig,
) -> Result<CommandOutput, CommandError>
where
    D: EntitlementDataSource + PurchaseLedger,
{
    match command {
        Command::Grant { user, product } => {
            let granter = EntitlementGranter::new(source, TracingGrantLogger, config);
            let outcome = granter.grant_access_for_product(user, &product).await?;
            Ok(CommandOutput::Grant {
                user_id: user,
                product_id: product,
                outcome,
            })
        }
        Command::Access { user } => {
            let profile = source.get_profile(user).await?;
            let profile = profile.as_ref();
            Ok(CommandOutput::Access(AccessSummary {
                user_id: user,
                profile_found: profile.is_some(),
                level: resolve(profile),
                can_access_course: can_access_course(profile),
                can_access_masterclass: can_access_masterclass(profile),
                studio_access: has_studio_access(profile),
                grants: source.list_grants(user).await?,
                purchased_products: source.list_purchased_products(user).await?,
            }))
        }
        Command::Check { user, object } => {
            let granted = check_access(&source, &user, &object).await;
            Ok(CommandOutput::Check {
                user_id: user,
                object_id: object,
                granted,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_grant_command() {
        let user = UserId::new();
        let cli = Cli::try_parse_from([
            "vault-admin",
            "grant",
            "--user",
            &user.to_string(),
            "--product",
            "prod_mc",
            "--log-format",
            "pretty",
        ])
        .unwrap();

        assert_eq!(cli.log_format, LogFormat::Pretty);
        match cli.command {
            Command::Grant { user: parsed, product } => {
                assert_eq!(parsed, user);
                assert_eq!(product.as_str(), "prod_mc");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_malformed_user_id() {
        assert!(Cli::try_parse_from(["vault-admin", "access", "--user", "not-a-uuid"]).is_err());
    }

    #[test]
    fn check_accepts_raw_ids() {
        let cli = Cli::try_parse_from(["vault-admin", "check", "--user", "u", "--object", "o"]).unwrap();
        assert!(matches!(cli.command, Command::Check { .. }));
        assert_eq!(cli.log_level, "info");
        assert_eq!(cli.log_format, LogFormat::Json);
    }

    #[test]
    fn verifies_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
