//! Commerce-side records and the update payload written to them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A product row in the commerce store. The engine never creates or deletes
/// these; it only rewrites the mapped columns of rows that already exist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TargetRecord {
    pub sku: String,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub price: Decimal,
    pub discount_price: Option<Decimal>,
    pub stock: i32,
    pub active: bool,
    pub updated_at: DateTime<Utc>,
}

impl TargetRecord {
    /// A bare catalog entry, as the storefront admin would create it.
    pub fn new(sku: impl Into<String>) -> Self {
        let sku = sku.into();
        Self {
            name: sku.clone(),
            slug: sku.to_lowercase(),
            description: String::new(),
            sku,
            price: Decimal::ZERO,
            discount_price: None,
            stock: 0,
            active: true,
            updated_at: Utc::now(),
        }
    }

    /// Overwrite the mapped columns, as the UPDATE statement does.
    pub fn apply(&mut self, update: &TargetUpdate) {
        self.name = update.name.clone();
        self.slug = update.slug.clone();
        self.description = update.description.clone();
        self.price = update.price;
        self.discount_price = update.discount_price;
        self.stock = update.stock;
        self.active = update.active;
        self.updated_at = Utc::now();
    }
}

/// Normalized payload derived from one source record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetUpdate {
    pub name: String,
    pub slug: String,
    pub description: String,
    /// Never negative
    pub price: Decimal,
    /// Set only when strictly between zero and `price`
    pub discount_price: Option<Decimal>,
    /// Never negative
    pub stock: i32,
    pub active: bool,
}
