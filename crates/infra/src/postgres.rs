//! Postgres-backed vault data source.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (foreign key / check violation) | `23503` / `23514` | `Conflict` |
//! | Database (other) | Any other | `Unavailable` |
//! | PoolClosed, Io, timeouts | N/A | `Unavailable` |
//! | RowNotFound | N/A | `NotFound` |
//! | ColumnDecode, ColumnNotFound | N/A | `InvalidRow` |
//!
//! Catalog rows are read into the nullable `Raw*Row` shapes and validated on
//! the way out, so a malformed catalog row surfaces as `InvalidRow` instead of
//! an empty title or product id reaching the grant procedure.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{FromRow, PgPool, Row};
use tracing::instrument;

use vault_access::UserProfile;
use vault_core::{ContentId, ProductId, UserId};
use vault_entitlements::{
    AccessGrant, CatalogEntry, ChapterCatalog, GrantInsert, GrantStore, GrantTarget, GrantTargetKind,
    MasterclassCatalog, Offer, OfferCatalog, ProfileFlag, ProfileStore, PurchaseInsert,
    PurchaseLedger, PurchaseRecord, RawCatalogRow, RawOfferRow, StoreError, WebhookEventLog,
};

/// Idempotent DDL applied by [`PostgresVaultStore::ensure_schema`].
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS profiles (
        id                   UUID PRIMARY KEY,
        has_full_unlock      BOOLEAN NOT NULL DEFAULT FALSE,
        has_course_pass      BOOLEAN NOT NULL DEFAULT FALSE,
        is_guest             BOOLEAN NOT NULL DEFAULT FALSE,
        active_studio_client BOOLEAN NOT NULL DEFAULT FALSE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS offers (
        id                UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        stripe_product_id TEXT UNIQUE,
        category_slug     TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS masterclasses (
        id                UUID PRIMARY KEY,
        title             TEXT,
        stripe_product_id TEXT UNIQUE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS chapters (
        id                UUID PRIMARY KEY,
        title             TEXT,
        stripe_product_id TEXT UNIQUE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS access_grants (
        user_id     UUID NOT NULL,
        target_type TEXT NOT NULL CHECK (target_type IN ('masterclass', 'chapter')),
        target_id   UUID NOT NULL,
        product_id  TEXT NOT NULL,
        granted_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
        PRIMARY KEY (user_id, target_type, target_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS purchases (
        session_id   TEXT NOT NULL,
        product_id   TEXT NOT NULL,
        user_id      UUID NOT NULL,
        amount_total BIGINT NOT NULL,
        currency     TEXT NOT NULL,
        purchased_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        PRIMARY KEY (session_id, product_id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS purchases_user_idx ON purchases (user_id, purchased_at)",
    r#"
    CREATE TABLE IF NOT EXISTS webhook_events (
        event_id    TEXT PRIMARY KEY,
        event_type  TEXT NOT NULL,
        received_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
];

/// Vault data source over a shared SQLx connection pool.
///
/// Every port call is a single statement, so each is atomic on its own and the
/// unique keys on `access_grants`, `purchases` and `webhook_events` make the
/// inserts idempotent under concurrent deliveries.
#[derive(Debug, Clone)]
pub struct PostgresVaultStore {
    pool: Arc<PgPool>,
}

impl PostgresVaultStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    /// Connect to `database_url` with a small pool.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create the vault tables if they do not exist yet.
    #[instrument(skip_all, err)]
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        }
        Ok(())
    }

    async fn find_catalog_entry(
        &self,
        table: CatalogTable,
        product_id: &ProductId,
    ) -> Result<Option<CatalogEntry>, StoreError> {
        let sql = format!(
            "SELECT id::text AS id, title, stripe_product_id FROM {} WHERE stripe_product_id = $1 LIMIT 1",
            table.name()
        );
        let row = sqlx::query(&sql)
            .bind(product_id.as_str())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(table.operation(), e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let raw = RawCatalogRow {
            id: row.try_get("id").map_err(|e| map_sqlx_error(table.operation(), e))?,
            title: row.try_get("title").map_err(|e| map_sqlx_error(table.operation(), e))?,
            product_id: row
                .try_get("stripe_product_id")
                .map_err(|e| map_sqlx_error(table.operation(), e))?,
        };
        Ok(Some(CatalogEntry::try_from(raw)?))
    }
}

#[derive(Debug, Clone, Copy)]
enum CatalogTable {
    Masterclasses,
    Chapters,
}

impl CatalogTable {
    fn name(self) -> &'static str {
        match self {
            Self::Masterclasses => "masterclasses",
            Self::Chapters => "chapters",
        }
    }

    fn operation(self) -> &'static str {
        match self {
            Self::Masterclasses => "find_masterclass_by_product",
            Self::Chapters => "find_chapter_by_product",
        }
    }
}

#[async_trait::async_trait]
impl ProfileStore for PostgresVaultStore {
    #[instrument(skip_all, fields(user_id = %user_id), err)]
    async fn get_profile(&self, user_id: UserId) -> Result<Option<UserProfile>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT has_full_unlock, has_course_pass, is_guest, active_studio_client
            FROM profiles
            WHERE id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_profile", e))?;

        row.map(|row| ProfileRow::from_row(&row).map(UserProfile::from))
            .transpose()
            .map_err(|e| map_sqlx_error("get_profile", e))
    }

    #[instrument(skip_all, fields(user_id = %user_id, flag = flag.column()), err)]
    async fn set_profile_flag(&self, user_id: UserId, flag: ProfileFlag) -> Result<(), StoreError> {
        // Column names come from a closed enum, never from input.
        let sql = format!("UPDATE profiles SET {} = TRUE WHERE id = $1", flag.column());
        let result = sqlx::query(&sql)
            .bind(user_id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("set_profile_flag", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("profile {user_id}")));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl OfferCatalog for PostgresVaultStore {
    #[instrument(skip_all, fields(product_id = %product_id), err)]
    async fn find_offer_by_product(&self, product_id: &ProductId) -> Result<Option<Offer>, StoreError> {
        let row = sqlx::query(
            "SELECT stripe_product_id, category_slug FROM offers WHERE stripe_product_id = $1 LIMIT 1",
        )
        .bind(product_id.as_str())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_offer_by_product", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let raw = RawOfferRow {
            product_id: row
                .try_get("stripe_product_id")
                .map_err(|e| map_sqlx_error("find_offer_by_product", e))?,
            category_slug: row
                .try_get("category_slug")
                .map_err(|e| map_sqlx_error("find_offer_by_product", e))?,
        };
        Ok(Some(Offer::try_from(raw)?))
    }
}

#[async_trait::async_trait]
impl MasterclassCatalog for PostgresVaultStore {
    async fn find_masterclass_by_product(
        &self,
        product_id: &ProductId,
    ) -> Result<Option<CatalogEntry>, StoreError> {
        self.find_catalog_entry(CatalogTable::Masterclasses, product_id).await
    }
}

#[async_trait::async_trait]
impl ChapterCatalog for PostgresVaultStore {
    async fn find_chapter_by_product(
        &self,
        product_id: &ProductId,
    ) -> Result<Option<CatalogEntry>, StoreError> {
        self.find_catalog_entry(CatalogTable::Chapters, product_id).await
    }
}

#[async_trait::async_trait]
impl GrantStore for PostgresVaultStore {
    #[instrument(
        skip_all,
        fields(user_id = %grant.user_id, target = %grant.target.kind, target_id = %grant.target.id),
        err
    )]
    async fn insert_grant(&self, grant: AccessGrant) -> Result<GrantInsert, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO access_grants (user_id, target_type, target_id, product_id, granted_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id, target_type, target_id) DO NOTHING
            "#,
        )
        .bind(grant.user_id.as_uuid())
        .bind(grant.target.kind.as_str())
        .bind(grant.target.id.as_uuid())
        .bind(grant.product_id.as_str())
        .bind(grant.granted_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_grant", e))?;

        Ok(if result.rows_affected() == 0 {
            GrantInsert::AlreadyPresent
        } else {
            GrantInsert::Created
        })
    }

    async fn has_grant(&self, user_id: UserId, target_id: ContentId) -> Result<bool, StoreError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM access_grants WHERE user_id = $1 AND target_id = $2)",
        )
        .bind(user_id.as_uuid())
        .bind(target_id.as_uuid())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("has_grant", e))
    }

    async fn list_grants(&self, user_id: UserId) -> Result<Vec<AccessGrant>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT user_id, target_type, target_id, product_id, granted_at
            FROM access_grants
            WHERE user_id = $1
            ORDER BY granted_at ASC
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_grants", e))?;

        rows.iter()
            .map(|row| {
                let row = GrantRow::from_row(row).map_err(|e| map_sqlx_error("list_grants", e))?;
                AccessGrant::try_from(row)
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl PurchaseLedger for PostgresVaultStore {
    #[instrument(
        skip_all,
        fields(user_id = %purchase.user_id, product_id = %purchase.product_id, session_id = %purchase.session_id),
        err
    )]
    async fn record_purchase(&self, purchase: PurchaseRecord) -> Result<PurchaseInsert, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO purchases (session_id, product_id, user_id, amount_total, currency, purchased_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (session_id, product_id) DO NOTHING
            "#,
        )
        .bind(&purchase.session_id)
        .bind(purchase.product_id.as_str())
        .bind(purchase.user_id.as_uuid())
        .bind(purchase.amount_total)
        .bind(&purchase.currency)
        .bind(purchase.purchased_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("record_purchase", e))?;

        Ok(if result.rows_affected() == 0 {
            PurchaseInsert::Duplicate
        } else {
            PurchaseInsert::Recorded
        })
    }

    async fn has_purchased(&self, user_id: UserId, product_id: &ProductId) -> Result<bool, StoreError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM purchases WHERE user_id = $1 AND product_id = $2)",
        )
        .bind(user_id.as_uuid())
        .bind(product_id.as_str())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("has_purchased", e))
    }

    async fn list_purchased_products(&self, user_id: UserId) -> Result<Vec<ProductId>, StoreError> {
        let raw: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT product_id
            FROM purchases
            WHERE user_id = $1
            GROUP BY product_id
            ORDER BY MIN(purchased_at) ASC
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_purchased_products", e))?;

        raw.into_iter()
            .map(|p| ProductId::parse(p).map_err(StoreError::from))
            .collect()
    }
}

#[async_trait::async_trait]
impl WebhookEventLog for PostgresVaultStore {
    #[instrument(skip_all, fields(event_id = %event_id, event_type = %event_type), err)]
    async fn mark_received(&self, event_id: &str, event_type: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO webhook_events (event_id, event_type)
            VALUES ($1, $2)
            ON CONFLICT (event_id) DO NOTHING
            "#,
        )
        .bind(event_id)
        .bind(event_type)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("mark_received", e))?;

        Ok(result.rows_affected() > 0)
    }
}

/// Profile flags as stored. Older tables allow NULL; NULL reads as `false`.
struct ProfileRow {
    has_full_unlock: Option<bool>,
    has_course_pass: Option<bool>,
    is_guest: Option<bool>,
    active_studio_client: Option<bool>,
}

impl<'r> sqlx::FromRow<'r, PgRow> for ProfileRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ProfileRow {
            has_full_unlock: row.try_get("has_full_unlock")?,
            has_course_pass: row.try_get("has_course_pass")?,
            is_guest: row.try_get("is_guest")?,
            active_studio_client: row.try_get("active_studio_client")?,
        })
    }
}

impl From<ProfileRow> for UserProfile {
    fn from(row: ProfileRow) -> Self {
        UserProfile {
            has_full_unlock: row.has_full_unlock.unwrap_or(false),
            has_course_pass: row.has_course_pass.unwrap_or(false),
            is_guest: row.is_guest.unwrap_or(false),
            active_studio_client: row.active_studio_client.unwrap_or(false),
        }
    }
}

/// Map SQLx errors to `StoreError`.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") | Some("23503") | Some("23514") => StoreError::Conflict(msg),
                _ => StoreError::Unavailable(msg),
            }
        }
        sqlx::Error::RowNotFound => StoreError::NotFound(format!("row not found in {}", operation)),
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::ColumnNotFound(_) | sqlx::Error::Decode(_) => {
            StoreError::InvalidRow(format!("{} in {}", err, operation))
        }
        sqlx::Error::PoolClosed => {
            StoreError::Unavailable(format!("connection pool closed in {}", operation))
        }
        _ => StoreError::Unavailable(format!("sqlx error in {}: {}", operation, err)),
    }
}

struct GrantRow {
    user_id: uuid::Uuid,
    target_type: String,
    target_id: uuid::Uuid,
    product_id: String,
    granted_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, PgRow> for GrantRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(GrantRow {
            user_id: row.try_get("user_id")?,
            target_type: row.try_get("target_type")?,
            target_id: row.try_get("target_id")?,
            product_id: row.try_get("product_id")?,
            granted_at: row.try_get("granted_at")?,
        })
    }
}

impl TryFrom<GrantRow> for AccessGrant {
    type Error = StoreError;

    fn try_from(row: GrantRow) -> Result<Self, Self::Error> {
        let kind = GrantTargetKind::parse(&row.target_type)
            .ok_or_else(|| StoreError::InvalidRow(format!("unknown grant target type: {}", row.target_type)))?;
        Ok(AccessGrant {
            user_id: UserId::from_uuid(row.user_id),
            target: GrantTarget {
                kind,
                id: ContentId::from_uuid(row.target_id),
            },
            product_id: ProductId::parse(row.product_id)?,
            granted_at: row.granted_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grant_row(target_type: &str, product_id: &str) -> GrantRow {
        GrantRow {
            user_id: uuid::Uuid::now_v7(),
            target_type: target_type.to_string(),
            target_id: uuid::Uuid::now_v7(),
            product_id: product_id.to_string(),
            granted_at: Utc::now(),
        }
    }

    #[test]
    fn null_profile_flags_read_as_false() {
        let row = ProfileRow {
            has_full_unlock: None,
            has_course_pass: Some(true),
            is_guest: None,
            active_studio_client: Some(false),
        };

        let profile = UserProfile::from(row);
        assert_eq!(profile, UserProfile::course_pass());
        assert_eq!(vault_access::resolve(Some(&profile)), vault_access::AccessLevel::CoursePass);
    }

    #[test]
    fn all_null_profile_is_basic() {
        let row = ProfileRow {
            has_full_unlock: None,
            has_course_pass: None,
            is_guest: None,
            active_studio_client: None,
        };
        assert_eq!(UserProfile::from(row), UserProfile::default());
    }

    #[test]
    fn grant_row_converts_to_grant() {
        let row = grant_row("chapter", "prod_ch");
        let target_id = row.target_id;

        let grant = AccessGrant::try_from(row).unwrap();
        assert_eq!(grant.target, GrantTarget::chapter(ContentId::from_uuid(target_id)));
        assert_eq!(grant.product_id.as_str(), "prod_ch");
    }

    #[test]
    fn grant_row_with_unknown_target_is_invalid() {
        let err = AccessGrant::try_from(grant_row("bundle", "prod_x")).unwrap_err();
        assert!(matches!(err, StoreError::InvalidRow(_)));
    }

    #[test]
    fn grant_row_with_blank_product_is_invalid() {
        let err = AccessGrant::try_from(grant_row("masterclass", "  ")).unwrap_err();
        assert!(matches!(err, StoreError::InvalidRow(_)));
    }

    #[test]
    fn non_database_errors_map_to_store_errors() {
        assert!(matches!(
            map_sqlx_error("get_profile", sqlx::Error::RowNotFound),
            StoreError::NotFound(_)
        ));
        assert!(matches!(
            map_sqlx_error("get_profile", sqlx::Error::PoolClosed),
            StoreError::Unavailable(_)
        ));
        assert!(matches!(
            map_sqlx_error("get_profile", sqlx::Error::ColumnNotFound("title".to_string())),
            StoreError::InvalidRow(_)
        ));
    }

    #[test]
    fn schema_keys_grants_by_user_and_target() {
        let grants = SCHEMA
            .iter()
            .find(|s| s.contains("CREATE TABLE IF NOT EXISTS access_grants"))
            .unwrap();
        assert!(grants.contains("PRIMARY KEY (user_id, target_type, target_id)"));
    }
}
