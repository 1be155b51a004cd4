use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// `orderStatus` on a distributed order. Modeled as an open string set
/// rather than a closed enum — other terminal statuses are assigned
/// outside this engine — with the two statuses the engine itself
/// writes available as constants.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct OrderStatus(pub String);

impl OrderStatus {
    pub const TRANSFERRED: &'static str = "transferred";

    pub fn open(open_status_literal: &str) -> Self {
        OrderStatus(open_status_literal.to_string())
    }

    pub fn transferred() -> Self {
        OrderStatus(Self::TRANSFERRED.to_string())
    }

    pub fn is_open(&self, open_status_literal: &str) -> bool {
        self.0 == open_status_literal
    }

    pub fn is_transferred(&self) -> bool {
        self.0 == Self::TRANSFERRED
    }
}

/// Status of an individual distributed-order line item.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LineItemStatus {
    Active,
    MarkedForCanceling,
    Canceled,
}

impl Default for LineItemStatus {
    fn default() -> Self {
        LineItemStatus::Active
    }
}

/// POS-local sub-order: `…/Points-of-Sale/{posId}/Orders/{orderId}`. Shares
/// its id with the originating purchase — that shared id is what makes
/// materialization idempotent.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DistributedOrder {
    pub id: String,
    pub order_status: OrderStatus,
    pub order_date: DateTime<Utc>,
    #[serde(default)]
    pub serving_point_name: Option<String>,
    #[serde(default)]
    pub serving_point_location: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub tablet_number: Option<String>,
    #[serde(default)]
    pub transferred_at: Option<DateTime<Utc>>,
}

/// Line item of a distributed order, keyed by
/// `"{itemId}_{extras-csv}_{excluded-csv}"`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DistributedOrderItem {
    pub item_id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub price: Decimal,
    pub count: i64,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub category_name: Option<String>,
    #[serde(default)]
    pub selected_extras: Vec<String>,
    #[serde(default)]
    pub excluded_ingredients: Vec<String>,
    #[serde(default)]
    pub status: LineItemStatus,
}

/// Builds the grouping/document key `"{itemId}_{extras-csv}_{excluded-csv}"`
/// with extras/excluded serialized comma-joined in the order they were
/// first seen.
pub fn line_item_key(item_id: &str, extras: &[String], excluded: &[String]) -> String {
    format!("{}_{}_{}", item_id, extras.join(","), excluded.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_stable_for_identical_groupings() {
        let a = line_item_key("x", &["cheese".into()], &[]);
        let b = line_item_key("x", &["cheese".into()], &[]);
        assert_eq!(a, b);
    }

    #[test]
    fn key_differs_on_extras() {
        let a = line_item_key("x", &["cheese".into()], &[]);
        let b = line_item_key("x", &[], &[]);
        assert_ne!(a, b);
    }

    #[test]
    fn open_order_status_respects_configured_literal() {
        let status = OrderStatus::open("open");
        assert!(status.is_open("open"));
        assert!(!status.is_open("pending"));
    }
}
