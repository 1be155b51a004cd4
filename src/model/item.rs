use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Event-wide canonical item definition: `Events/{eventId}/Items/{itemId}`.
///
/// `is_available` is derived and owned exclusively by the availability
/// reconciler — nothing else writes it.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CanonicalItem {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub category_name: Option<String>,
    #[serde(default = "default_true")]
    pub is_available: bool,
    #[serde(default)]
    pub sold_out: bool,
}

fn default_true() -> bool {
    true
}
