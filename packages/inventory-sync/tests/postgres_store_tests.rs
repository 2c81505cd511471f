//! Integration tests for the PostgreSQL stores.
//!
//! Run with: cargo test --test postgres_store_tests -- --ignored

mod common;

use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::Arc;

use common::{
    insert_material, insert_product, insert_product_without_sku, MaterialFixture, TestHarness,
    TEST_BRANCH,
};
use inventory_sync::testing::{sample_update, RecordingReporter};
use inventory_sync::{InactiveFlag, RunCoordinator, SourceReader, SyncSettings, TargetStore};
use rust_decimal::Decimal;
use test_context::test_context;

fn keys(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn dec(value: &str) -> Decimal {
    Decimal::from_str(value).unwrap()
}

// =============================================================================
// Commerce store
// =============================================================================

#[test_context(TestHarness)]
#[tokio::test]
#[ignore] // Requires database
async fn test_eligible_keys_skip_blank_skus(ctx: &TestHarness) {
    insert_product(&ctx.db_pool, "A1").await;
    insert_product(&ctx.db_pool, "B2").await;
    insert_product_without_sku(&ctx.db_pool, None).await;
    insert_product_without_sku(&ctx.db_pool, Some("   ")).await;

    let store = ctx.commerce_store();
    let loaded = store.load_eligible_keys().await.unwrap();

    assert_eq!(loaded, keys(&["A1", "B2"]));
}

#[test_context(TestHarness)]
#[tokio::test]
#[ignore] // Requires database
async fn test_update_rewrites_product(ctx: &TestHarness) {
    insert_product(&ctx.db_pool, "A1").await;
    let store = ctx.commerce_store();

    assert!(store.exists("A1").await.unwrap());
    assert!(!store.exists("ZZ").await.unwrap());

    let mut update = sample_update("A1");
    update.discount_price = Some(Decimal::from(8));
    update.active = false;
    assert_eq!(store.apply_update("A1", &update).await.unwrap(), 1);

    let product = store.find_by_sku("A1").await.unwrap().unwrap();
    assert_eq!(product.name, "Product A1");
    assert_eq!(product.price, Decimal::from(10));
    assert_eq!(product.discount_price, Some(Decimal::from(8)));
    assert_eq!(product.stock, 5);
    assert!(!product.active);
}

#[test_context(TestHarness)]
#[tokio::test]
#[ignore] // Requires database
async fn test_update_of_missing_sku_touches_nothing(ctx: &TestHarness) {
    let store = ctx.commerce_store();

    assert_eq!(store.apply_update("ZZ", &sample_update("ZZ")).await.unwrap(), 0);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
        .fetch_one(&ctx.db_pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

// =============================================================================
// ERP reader
// =============================================================================

#[test_context(TestHarness)]
#[tokio::test]
#[ignore] // Requires database
async fn test_reader_filters_keys_and_inactive(ctx: &TestHarness) {
    insert_material(
        &ctx.db_pool,
        TEST_BRANCH,
        MaterialFixture::new(1, "B2", "Clavo").stocked(dec("3.750"), dec("12.5"), None),
    )
    .await;
    insert_material(
        &ctx.db_pool,
        TEST_BRANCH,
        MaterialFixture::new(2, "A1", "Tornillo").inactive("N"),
    )
    .await;
    insert_material(
        &ctx.db_pool,
        TEST_BRANCH,
        MaterialFixture::new(3, "C3", "Arandela").inactive("S"),
    )
    .await;
    insert_material(
        &ctx.db_pool,
        TEST_BRANCH,
        MaterialFixture::new(4, "D4", "Tuerca").inactive(" "),
    )
    .await;
    insert_material(&ctx.db_pool, TEST_BRANCH, MaterialFixture::new(5, "X9", "Otro")).await;

    let reader = ctx.erp_reader();
    let records = reader
        .fetch_active_records_for_keys(&keys(&["A1", "B2", "C3", "D4"]))
        .await
        .unwrap();

    let fetched: Vec<&str> = records.iter().map(|r| r.key.as_str()).collect();
    assert_eq!(fetched, vec!["A1", "B2", "D4"]);

    assert_eq!(records[0].inactive_flag, Some(InactiveFlag::Active));
    assert_eq!(records[0].stock_quantity, None);

    assert_eq!(records[1].internal_id, 1);
    assert_eq!(records[1].stock_quantity, Some(dec("3.750")));
    assert_eq!(records[1].base_price, Some(dec("12.5")));
    assert_eq!(records[1].unit_label.as_deref(), Some("UN"));

    assert_eq!(records[2].inactive_flag, None);
}

#[test_context(TestHarness)]
#[tokio::test]
#[ignore] // Requires database
async fn test_reader_markers_ignore_case_and_padding(ctx: &TestHarness) {
    insert_material(
        &ctx.db_pool,
        TEST_BRANCH,
        MaterialFixture::new(1, "A1", "Tornillo").inactive("n"),
    )
    .await;
    insert_material(
        &ctx.db_pool,
        TEST_BRANCH,
        MaterialFixture::new(2, "B2", "Clavo").inactive("N "),
    )
    .await;
    insert_material(
        &ctx.db_pool,
        TEST_BRANCH,
        MaterialFixture::new(3, "C3", "Arandela").inactive(" s"),
    )
    .await;

    let records = ctx
        .erp_reader()
        .fetch_active_records_for_keys(&keys(&["A1", "B2", "C3"]))
        .await
        .unwrap();

    let fetched: Vec<&str> = records.iter().map(|r| r.key.as_str()).collect();
    assert_eq!(fetched, vec!["A1", "B2"]);
    assert!(records
        .iter()
        .all(|r| r.inactive_flag == Some(InactiveFlag::Active)));
}

#[test_context(TestHarness)]
#[tokio::test]
#[ignore] // Requires database
async fn test_reader_only_sees_its_branch(ctx: &TestHarness) {
    insert_material(
        &ctx.db_pool,
        TEST_BRANCH + 1,
        MaterialFixture::new(1, "A1", "Tornillo").stocked(dec("99"), dec("1"), None),
    )
    .await;

    let records = ctx
        .erp_reader()
        .fetch_active_records_for_keys(&keys(&["A1"]))
        .await
        .unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].stock_quantity, None);
    assert_eq!(records[0].base_price, None);
}

#[test_context(TestHarness)]
#[tokio::test]
#[ignore] // Requires database
async fn test_reader_sessions_are_read_only(ctx: &TestHarness) {
    let reader = ctx.erp_reader();

    let write = sqlx::query("INSERT INTO materials (id, code) VALUES (1, 'A1')")
        .execute(reader.pool())
        .await;
    assert!(write.is_err());

    // Reads still work through the same pool.
    assert!(reader
        .fetch_active_records_for_keys(&keys(&["A1"]))
        .await
        .unwrap()
        .is_empty());
}

// =============================================================================
// Full run
// =============================================================================

#[test_context(TestHarness)]
#[tokio::test]
#[ignore] // Requires database
async fn test_full_run_against_postgres(ctx: &TestHarness) {
    insert_product(&ctx.db_pool, "A1").await;
    insert_product(&ctx.db_pool, "B2").await;
    insert_product(&ctx.db_pool, "C3").await;
    insert_material(
        &ctx.db_pool,
        TEST_BRANCH,
        MaterialFixture::new(1, "A1", "Tornillo Áspero").stocked(
            dec("10"),
            dec("100"),
            Some(dec("80")),
        ),
    )
    .await;
    insert_material(
        &ctx.db_pool,
        TEST_BRANCH,
        MaterialFixture::new(2, "B2", "Clavo")
            .stocked(dec("2.9"), dec("50"), Some(dec("60"))),
    )
    .await;
    insert_material(
        &ctx.db_pool,
        TEST_BRANCH,
        MaterialFixture::new(3, "C3", "Arandela").inactive("S"),
    )
    .await;

    let store = Arc::new(ctx.commerce_store());
    let coordinator = RunCoordinator::new(
        Arc::new(ctx.erp_reader()),
        store.clone(),
        Arc::new(RecordingReporter::new()),
        SyncSettings::default(),
    )
    .unwrap();

    let run = coordinator.execute().await.unwrap();

    assert_eq!(run.total_candidates, 2);
    assert_eq!(run.updated_count, 2);
    assert_eq!(run.not_found_count, 0);
    assert_eq!(run.error_count, 0);

    let a1 = store.find_by_sku("A1").await.unwrap().unwrap();
    assert_eq!(a1.slug, "tornillo-aspero");
    assert_eq!(a1.price, Decimal::from(100));
    assert_eq!(a1.discount_price, Some(Decimal::from(80)));
    assert_eq!(a1.stock, 10);

    let b2 = store.find_by_sku("B2").await.unwrap().unwrap();
    assert_eq!(b2.discount_price, None);
    assert_eq!(b2.stock, 2);

    // Inactive upstream, so left exactly as it was.
    let c3 = store.find_by_sku("C3").await.unwrap().unwrap();
    assert_eq!(c3.name, "C3");
    assert!(c3.active);
}
