//! Test harness with testcontainers for integration testing.
//!
//! One Postgres container is shared by every test. Each test gets its own
//! freshly created database with the schema applied, so key sets never leak
//! between tests.

use std::time::Duration;

use anyhow::{Context, Result};
use inventory_sync::{ErpSourceReader, FlagMarkers, PostgresCommerceStore};
use sqlx::PgPool;
use test_context::AsyncTestContext;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use uuid::Uuid;

const SCHEMA: &str = include_str!("../fixtures/schema.sql");

pub const TEST_BRANCH: i64 = 1;

/// Shared test infrastructure that persists across all tests.
struct SharedTestInfra {
    server_url: String,
    // Keep the container alive for the entire test run
    _postgres: ContainerAsync<Postgres>,
}

static SHARED_INFRA: OnceCell<SharedTestInfra> = OnceCell::const_new();

impl SharedTestInfra {
    async fn init() -> Result<Self> {
        // Run tests with: RUST_LOG=debug cargo test -- --ignored --nocapture
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let postgres = Postgres::default()
            .with_tag("16")
            .start()
            .await
            .context("Failed to start Postgres container")?;

        let host = postgres.get_host().await?;
        let port = postgres.get_host_port_ipv4(5432).await?;
        let server_url = format!("postgresql://postgres:postgres@{}:{}", host, port);

        Ok(Self {
            server_url,
            _postgres: postgres,
        })
    }

    async fn get() -> &'static Self {
        SHARED_INFRA
            .get_or_init(|| async {
                Self::init()
                    .await
                    .expect("Failed to initialize shared test infrastructure")
            })
            .await
    }
}

/// Per-test database holding both the ERP and commerce tables.
///
/// ```ignore
/// #[test_context(TestHarness)]
/// #[tokio::test]
/// #[ignore] // Requires database
/// async fn my_test(ctx: &TestHarness) {
///     let store = ctx.commerce_store();
/// }
/// ```
pub struct TestHarness {
    /// Writable pool for seeding fixtures and inspecting results.
    pub db_pool: PgPool,
    pub db_url: String,
}

impl AsyncTestContext for TestHarness {
    async fn setup() -> Self {
        Self::new().await.expect("Failed to create test harness")
    }

    async fn teardown(self) {
        self.db_pool.close().await;
    }
}

impl TestHarness {
    pub async fn new() -> Result<Self> {
        let infra = SharedTestInfra::get().await;

        let admin = PgPool::connect(&format!("{}/postgres", infra.server_url))
            .await
            .context("Failed to connect to test server")?;
        let db_name = format!("sync_{}", Uuid::new_v4().simple());
        sqlx::query(&format!("CREATE DATABASE {}", db_name))
            .execute(&admin)
            .await
            .context("Failed to create test database")?;
        admin.close().await;

        let db_url = format!("{}/{}", infra.server_url, db_name);
        let db_pool = PgPool::connect(&db_url)
            .await
            .context("Failed to connect to test database")?;
        sqlx::raw_sql(SCHEMA)
            .execute(&db_pool)
            .await
            .context("Failed to apply schema")?;

        Ok(Self { db_pool, db_url })
    }

    pub fn erp_reader(&self) -> ErpSourceReader {
        ErpSourceReader::connect(
            &self.db_url,
            2,
            TEST_BRANCH,
            FlagMarkers::default(),
            Duration::from_secs(5),
        )
        .expect("Failed to configure ERP reader")
    }

    pub fn commerce_store(&self) -> PostgresCommerceStore {
        PostgresCommerceStore::connect(&self.db_url, 4, Duration::from_secs(5))
            .expect("Failed to configure commerce store")
    }
}
