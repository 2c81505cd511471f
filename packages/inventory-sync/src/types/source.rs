//! Records read from the ERP source.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Explicit value of the ERP inactive column. An absent column value is
/// modelled as `None` on [`SourceRecord::inactive_flag`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InactiveFlag {
    Active,
    Inactive,
}

/// The raw markers the ERP uses in its inactive column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagMarkers {
    pub active: String,
    pub inactive: String,
}

impl Default for FlagMarkers {
    fn default() -> Self {
        Self {
            active: "N".to_string(),
            inactive: "S".to_string(),
        }
    }
}

impl FlagMarkers {
    /// Interpret a raw column value. Blank counts as absent; anything that is
    /// not the inactive marker counts as active.
    pub fn parse(&self, raw: Option<&str>) -> Option<InactiveFlag> {
        let raw = raw.map(str::trim).filter(|v| !v.is_empty())?;
        if raw.eq_ignore_ascii_case(&self.inactive) {
            Some(InactiveFlag::Inactive)
        } else {
            Some(InactiveFlag::Active)
        }
    }
}

/// One product row from the ERP, joined with its branch stock and price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    /// External product code, matched against the commerce SKU
    pub key: String,
    pub internal_id: i64,
    pub display_name: String,
    pub unit_label: Option<String>,
    /// Classification id, informational only
    pub group_id: Option<i64>,
    pub stock_quantity: Option<Decimal>,
    pub base_price: Option<Decimal>,
    pub alternate_price: Option<Decimal>,
    pub inactive_flag: Option<InactiveFlag>,
}

impl SourceRecord {
    pub fn new(key: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            internal_id: 0,
            display_name: display_name.into(),
            unit_label: None,
            group_id: None,
            stock_quantity: None,
            base_price: None,
            alternate_price: None,
            inactive_flag: None,
        }
    }

    pub fn with_stock(mut self, quantity: Decimal) -> Self {
        self.stock_quantity = Some(quantity);
        self
    }

    pub fn with_prices(mut self, base: Option<Decimal>, alternate: Option<Decimal>) -> Self {
        self.base_price = base;
        self.alternate_price = alternate;
        self
    }

    pub fn with_flag(mut self, flag: InactiveFlag) -> Self {
        self.inactive_flag = Some(flag);
        self
    }

    /// Whether the ERP explicitly marks this record inactive.
    pub fn is_marked_inactive(&self) -> bool {
        self.inactive_flag == Some(InactiveFlag::Inactive)
    }
}
