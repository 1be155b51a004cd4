use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The customer-facing order at event scope: `Events/{eventId}/Orders/{purchaseId}`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Purchase {
    pub id: String,
    pub serving_point_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    pub order_placed: DateTime<Utc>,
    #[serde(default)]
    pub is_paid: bool,
    #[serde(default)]
    pub distributed: bool,
    #[serde(default)]
    pub distributed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub distribution_error: Option<String>,
    #[serde(default)]
    pub distribution_failed: bool,
    #[serde(default)]
    pub total_price: Option<Decimal>,
}

/// One entry of the legacy `entries[]` representation on a purchase-item
/// document — takes priority over the scalar `quantity`/`count` fields.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
pub struct PurchaseItemEntry {
    #[serde(default)]
    pub quantity: f64,
    #[serde(default)]
    pub selected_extras: Option<Vec<String>>,
    #[serde(default)]
    pub excluded_ingredients: Option<Vec<String>>,
}

/// Raw purchase-item document as it exists in
/// `Events/{eventId}/Orders/{purchaseId}/Items/{itemId}`, before
/// normalization. Carries every historical quantity representation the
/// collection has accumulated.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
pub struct PurchaseItemDoc {
    pub item_id: String,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub count: Option<f64>,
    #[serde(default)]
    pub selected_extras: Option<Vec<String>>,
    #[serde(default)]
    pub excluded_ingredients: Option<Vec<String>>,
    #[serde(default)]
    pub entries: Option<Vec<PurchaseItemEntry>>,
    #[serde(default)]
    pub status: Option<String>,
    /// Marks this document as already the output of a prior normalization
    /// pass; the normalizer must treat it as idempotent.
    #[serde(default, rename = "__calculated")]
    pub calculated: bool,
    /// Legacy denormalized catalog fields some writers still set directly on
    /// the purchase-item document. Used only as a fallback when the
    /// canonical `Items/{itemId}` doc can't be found.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub category_name: Option<String>,
}

/// One canonicalized unit produced by the Item Quantity Normalizer: always
/// `count = 1` conceptually — the scheduler sums these back up per
/// `(itemId, extras, excluded)` grouping.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CanonicalLineItem {
    pub item_id: String,
    #[serde(default)]
    pub selected_extras: Vec<String>,
    #[serde(default)]
    pub excluded_ingredients: Vec<String>,
    /// Catalog fields enriched from `Items/{itemId}` by the orchestrator,
    /// falling back to whatever the purchase-item doc carried.
    #[serde(default)]
    pub name: Option<String>,
    pub price: rust_decimal::Decimal,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub category_name: Option<String>,
}
