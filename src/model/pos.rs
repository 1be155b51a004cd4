use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A producer: `Events/{eventId}/Points-of-Sale/{posId}`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PointOfSale {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

/// A POS-local snapshot of a canonical item: `…/Points-of-Sale/{posId}/Items/{itemId}`.
///
/// `is_available` is absent-means-true throughout this engine's handling of
/// POS items, so it's modeled as `Option<bool>` and read through
/// [`PosItem::is_available_or_default`] rather than a plain `bool`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PosItem {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub price: Decimal,
    /// POS-local stock count, independent of any distributed order's count.
    #[serde(default)]
    pub count: Option<i64>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub category_name: Option<String>,
    #[serde(default)]
    pub is_available: Option<bool>,
    #[serde(default)]
    pub sold_out: bool,
    #[serde(default)]
    pub selected_extras: Vec<String>,
    #[serde(default)]
    pub excluded_ingredients: Vec<String>,
}

impl PosItem {
    /// Absent `isAvailable` reads as available.
    pub fn is_available_or_default(&self) -> bool {
        self.is_available.unwrap_or(true)
    }
}
