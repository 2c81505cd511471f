//! Source record → commerce update mapping.
//!
//! Pure functions with no I/O. All clamping and the discount rule live here so
//! the stores only ever see values that are safe to write.

use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::types::{SourceRecord, TargetUpdate};

/// Prices are compared and written at cent precision, halves away from zero
/// as Postgres `NUMERIC` does.
const PRICE_SCALE: u32 = 2;

lazy_static! {
    static ref DISALLOWED_CHARS: Regex = Regex::new(r"[^a-z0-9\s-]").unwrap();
    static ref WHITESPACE_RUNS: Regex = Regex::new(r"\s+").unwrap();
    static ref HYPHEN_RUNS: Regex = Regex::new(r"-{2,}").unwrap();
}

/// Convert one ERP record into the payload written to the commerce store.
pub fn map_to_update(record: &SourceRecord) -> TargetUpdate {
    let price = clamp_price(record.base_price);

    TargetUpdate {
        name: record.display_name.clone(),
        slug: slugify(&record.display_name),
        description: record.display_name.clone(),
        price,
        discount_price: discount_for(record.alternate_price, price),
        stock: clamp_stock(record.stock_quantity),
        active: !record.is_marked_inactive(),
    }
}

/// URL-safe, lowercase, hyphenated, diacritic-free form of a display name.
///
/// "Tornillo Áspero" becomes "tornillo-aspero".
pub fn slugify(input: &str) -> String {
    let stripped: String = input
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase();

    let cleaned = DISALLOWED_CHARS.replace_all(&stripped, "");
    let hyphenated = WHITESPACE_RUNS.replace_all(cleaned.trim(), "-");
    let collapsed = HYPHEN_RUNS.replace_all(&hyphenated, "-");

    collapsed.trim_matches('-').to_string()
}

/// `max(0, price)` at cent precision; a missing price is zero.
fn clamp_price(raw: Option<Decimal>) -> Decimal {
    raw.unwrap_or(Decimal::ZERO)
        .max(Decimal::ZERO)
        .round_dp_with_strategy(PRICE_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// The alternate price is a discount only when `0 < alternate < price`.
fn discount_for(alternate: Option<Decimal>, price: Decimal) -> Option<Decimal> {
    let alternate =
        alternate?.round_dp_with_strategy(PRICE_SCALE, RoundingStrategy::MidpointAwayFromZero);
    (alternate > Decimal::ZERO && alternate < price).then_some(alternate)
}

/// `max(0, quantity)` truncated to whole units, saturating at `i32::MAX`.
fn clamp_stock(raw: Option<Decimal>) -> i32 {
    let quantity = raw.unwrap_or(Decimal::ZERO).max(Decimal::ZERO).trunc();
    quantity.to_i32().unwrap_or(i32::MAX)
}
