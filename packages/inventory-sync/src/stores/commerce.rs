//! PostgreSQL commerce catalog.

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use tracing::instrument;

use super::{build_pool, timed, PoolSettings};
use crate::error::{Result, SyncError};
use crate::traits::target::TargetStore;
use crate::types::{TargetRecord, TargetUpdate};

/// Commerce store backed by the storefront's `products` table.
///
/// Every statement is its own unit of work; nothing here opens a
/// transaction spanning more than one SKU.
pub struct PostgresCommerceStore {
    pool: PgPool,
    query_timeout: Duration,
}

impl PostgresCommerceStore {
    /// Create a store from an existing pool.
    ///
    /// Use this when the application already shares a pool with the storefront.
    pub fn from_pool(pool: PgPool, query_timeout: Duration) -> Self {
        Self {
            pool,
            query_timeout,
        }
    }

    /// Create a store with its own pool.
    pub fn connect(
        database_url: &str,
        max_connections: u32,
        query_timeout: Duration,
    ) -> Result<Self> {
        let settings = PoolSettings {
            max_connections,
            query_timeout,
            read_only: false,
        };
        let pool = build_pool(database_url, &settings, SyncError::commerce)?;
        Ok(Self::from_pool(pool, query_timeout))
    }

    /// Look up a single product by SKU.
    pub async fn find_by_sku(&self, sku: &str) -> Result<Option<TargetRecord>> {
        timed(
            self.query_timeout,
            sqlx::query_as::<_, TargetRecord>(
                r#"
                SELECT sku, name, slug, description, price, discount_price,
                       stock, active, updated_at
                FROM products
                WHERE sku = $1
                "#,
            )
            .bind(sku)
            .fetch_optional(&self.pool),
            SyncError::commerce,
        )
        .await
    }
}

#[async_trait]
impl TargetStore for PostgresCommerceStore {
    #[instrument(skip_all)]
    async fn load_eligible_keys(&self) -> Result<BTreeSet<String>> {
        let skus: Vec<String> = timed(
            self.query_timeout,
            sqlx::query_scalar(
                "SELECT DISTINCT sku FROM products WHERE sku IS NOT NULL AND TRIM(sku) <> ''",
            )
            .fetch_all(&self.pool),
            SyncError::commerce,
        )
        .await?;

        Ok(skus.into_iter().collect())
    }

    async fn exists(&self, sku: &str) -> Result<bool> {
        let count: i64 = timed(
            self.query_timeout,
            sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE sku = $1")
                .bind(sku)
                .fetch_one(&self.pool),
            SyncError::commerce,
        )
        .await?;

        Ok(count > 0)
    }

    async fn apply_update(&self, sku: &str, update: &TargetUpdate) -> Result<u64> {
        let result = timed(
            self.query_timeout,
            sqlx::query(
                r#"
                UPDATE products
                SET name = $2,
                    slug = $3,
                    description = $4,
                    price = $5,
                    discount_price = $6,
                    stock = $7,
                    active = $8,
                    updated_at = NOW()
                WHERE sku = $1
                "#,
            )
            .bind(sku)
            .bind(&update.name)
            .bind(&update.slug)
            .bind(&update.description)
            .bind(update.price)
            .bind(update.discount_price)
            .bind(update.stock)
            .bind(update.active)
            .execute(&self.pool),
            SyncError::commerce,
        )
        .await?;

        Ok(result.rows_affected())
    }
}
