//! Read-only reader over the ERP catalog.
//!
//! The ERP database is shared with other consumers, so the reader only asks
//! for the SKUs the commerce catalog already knows. Transferred volume is
//! bounded by the catalog size, not by the ERP's full inventory.

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::PgPool;
use sqlx::FromRow;
use tracing::{debug, instrument};

use super::{build_pool, timed, PoolSettings};
use crate::error::{Result, SyncError};
use crate::traits::source::SourceReader;
use crate::types::{FlagMarkers, SourceRecord};

/// Materials joined to the per-branch stock/price table. Inactive rows are
/// excluded at the source; a blank flag counts as absent. The marker match
/// trims and ignores case, as `FlagMarkers::parse` does.
const FETCH_ACTIVE_RECORDS: &str = r#"
    SELECT
        m.code AS key,
        m.id AS internal_id,
        COALESCE(m.description, '') AS display_name,
        m.unit AS unit_label,
        m.group_id,
        bs.quantity AS stock_quantity,
        bs.price AS base_price,
        bs.alternate_price,
        m.inactive AS inactive_flag
    FROM materials m
    LEFT JOIN branch_stock bs
        ON bs.material_id = m.id AND bs.branch_id = $1
    WHERE m.code = ANY($2)
      AND (m.inactive IS NULL OR TRIM(m.inactive) = '' OR UPPER(TRIM(m.inactive)) = UPPER($3))
    ORDER BY m.code ASC
"#;

#[derive(Debug, FromRow)]
struct ErpRow {
    key: String,
    internal_id: i64,
    display_name: String,
    unit_label: Option<String>,
    group_id: Option<i64>,
    stock_quantity: Option<Decimal>,
    base_price: Option<Decimal>,
    alternate_price: Option<Decimal>,
    inactive_flag: Option<String>,
}

impl ErpRow {
    fn into_record(self, markers: &FlagMarkers) -> SourceRecord {
        SourceRecord {
            inactive_flag: markers.parse(self.inactive_flag.as_deref()),
            key: self.key,
            internal_id: self.internal_id,
            display_name: self.display_name,
            unit_label: self.unit_label,
            group_id: self.group_id,
            stock_quantity: self.stock_quantity,
            base_price: self.base_price,
            alternate_price: self.alternate_price,
        }
    }
}

/// PostgreSQL-backed ERP reader.
pub struct ErpSourceReader {
    pool: PgPool,
    branch_id: i64,
    markers: FlagMarkers,
    query_timeout: Duration,
}

impl ErpSourceReader {
    /// Create a reader from an existing pool.
    pub fn from_pool(
        pool: PgPool,
        branch_id: i64,
        markers: FlagMarkers,
        query_timeout: Duration,
    ) -> Self {
        Self {
            pool,
            branch_id,
            markers,
            query_timeout,
        }
    }

    /// Create a reader with its own read-only pool.
    pub fn connect(
        database_url: &str,
        max_connections: u32,
        branch_id: i64,
        markers: FlagMarkers,
        query_timeout: Duration,
    ) -> Result<Self> {
        let settings = PoolSettings {
            max_connections,
            query_timeout,
            read_only: true,
        };
        let pool = build_pool(database_url, &settings, SyncError::erp)?;
        Ok(Self::from_pool(pool, branch_id, markers, query_timeout))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl SourceReader for ErpSourceReader {
    #[instrument(skip_all, fields(keys = keys.len(), branch_id = self.branch_id))]
    async fn fetch_active_records_for_keys(
        &self,
        keys: &BTreeSet<String>,
    ) -> Result<Vec<SourceRecord>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let key_list: Vec<String> = keys.iter().cloned().collect();
        let rows: Vec<ErpRow> = timed(
            self.query_timeout,
            sqlx::query_as(FETCH_ACTIVE_RECORDS)
                .bind(self.branch_id)
                .bind(&key_list)
                .bind(&self.markers.active)
                .fetch_all(&self.pool),
            SyncError::erp,
        )
        .await?;

        debug!(rows = rows.len(), "Fetched ERP records");

        Ok(rows
            .into_iter()
            .map(|row| row.into_record(&self.markers))
            .collect())
    }
}
