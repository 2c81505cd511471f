//! Row seeding helpers for the integration tests.

use rust_decimal::Decimal;
use sqlx::PgPool;

/// Insert a product with placeholder content.
pub async fn insert_product(pool: &PgPool, sku: &str) {
    sqlx::query(
        r#"
        INSERT INTO products (sku, name, slug, price, stock, active)
        VALUES ($1, $1, lower($1), 0, 0, TRUE)
        "#,
    )
    .bind(sku)
    .execute(pool)
    .await
    .expect("Failed to insert product");
}

/// Insert a product row without a usable SKU.
pub async fn insert_product_without_sku(pool: &PgPool, sku: Option<&str>) {
    sqlx::query("INSERT INTO products (sku, name, slug) VALUES ($1, 'unlisted', 'unlisted')")
        .bind(sku)
        .execute(pool)
        .await
        .expect("Failed to insert product");
}

pub struct MaterialFixture<'a> {
    pub id: i64,
    pub code: &'a str,
    pub description: &'a str,
    pub inactive: Option<&'a str>,
    pub quantity: Option<Decimal>,
    pub price: Option<Decimal>,
    pub alternate_price: Option<Decimal>,
}

impl<'a> MaterialFixture<'a> {
    pub fn new(id: i64, code: &'a str, description: &'a str) -> Self {
        Self {
            id,
            code,
            description,
            inactive: None,
            quantity: None,
            price: None,
            alternate_price: None,
        }
    }

    pub fn inactive(mut self, marker: &'a str) -> Self {
        self.inactive = Some(marker);
        self
    }

    pub fn stocked(mut self, quantity: Decimal, price: Decimal, alternate: Option<Decimal>) -> Self {
        self.quantity = Some(quantity);
        self.price = Some(price);
        self.alternate_price = alternate;
        self
    }
}

/// Insert a material and, if it has stock, its row for `branch_id`.
pub async fn insert_material(pool: &PgPool, branch_id: i64, material: MaterialFixture<'_>) {
    sqlx::query(
        "INSERT INTO materials (id, code, description, unit, inactive) VALUES ($1, $2, $3, 'UN', $4)",
    )
    .bind(material.id)
    .bind(material.code)
    .bind(material.description)
    .bind(material.inactive)
    .execute(pool)
    .await
    .expect("Failed to insert material");

    if material.quantity.is_some() || material.price.is_some() {
        sqlx::query(
            r#"
            INSERT INTO branch_stock (material_id, branch_id, quantity, price, alternate_price)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(material.id)
        .bind(branch_id)
        .bind(material.quantity)
        .bind(material.price)
        .bind(material.alternate_price)
        .execute(pool)
        .await
        .expect("Failed to insert branch stock");
    }
}
