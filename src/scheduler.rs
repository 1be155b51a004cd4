//! Distribution Scheduler: least-loaded assignment of a
//! purchase's canonical line items to points of sale, and atomic
//! materialization of the resulting per-POS sub-orders.

use chrono::Utc;
use serde::Serialize;
use tracing::{instrument, warn};

use crate::config::DistributionMode;
use crate::errors::EngineError;
use crate::model::{
    line_item_key, CanonicalLineItem, DistributedOrder, DistributedOrderItem, LineItemStatus,
    OrderStatus, PointOfSale, PosItem, ServingPoint,
};
use crate::store::DocumentStore;

/// One POS's share of a distributed purchase, returned to the RPC caller.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributedPurchaseSummary {
    pub pos_id: String,
    pub pos_name: String,
    pub order_id: String,
    pub items_count: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DistributionOutcome {
    pub distributed_purchases: Vec<DistributedPurchaseSummary>,
}

pub struct DistributionRequest {
    pub event_id: String,
    pub purchase_id: String,
    pub items: Vec<CanonicalLineItem>,
    pub serving_point: ServingPoint,
    pub mode: DistributionMode,
    pub note: Option<String>,
    pub open_order_status: String,
}

/// Runs the balanced-mode distribution algorithm over `req` and persists the
/// resulting sub-orders through `store`.
#[instrument(skip(store, req), fields(event_id = %req.event_id, purchase_id = %req.purchase_id))]
pub async fn distribute(
    store: &dyn DocumentStore,
    req: DistributionRequest,
) -> Result<DistributionOutcome, EngineError> {
    if matches!(req.mode, DistributionMode::Grouped) {
        return Err(EngineError::Unsupported(
            "grouped distribution mode not yet implemented".to_string(),
        ));
    }
    if req.event_id.is_empty() || req.purchase_id.is_empty() {
        return Err(EngineError::InvalidRequest("Missing required fields".to_string()));
    }

    let pos_list = store.list_pos(&req.event_id).await?;
    if pos_list.is_empty() {
        return Err(EngineError::InvalidRequest("No Points of Sale found".to_string()));
    }

    // availableItems snapshot per POS, in the same ascending-id order as
    // `pos_list` — this order is what makes tie-breaks deterministic.
    let mut catalogs: Vec<(PointOfSale, Vec<PosItem>)> = Vec::with_capacity(pos_list.len());
    for pos in pos_list {
        let items = store.list_pos_items(&req.event_id, &pos.id).await?;
        catalogs.push((pos, items));
    }

    let mut open_counts: Vec<Option<u64>> = vec![None; catalogs.len()];
    let mut buckets: Vec<Vec<CanonicalLineItem>> = catalogs.iter().map(|_| Vec::new()).collect();

    for item in req.items {
        let candidates: Vec<usize> = catalogs
            .iter()
            .enumerate()
            .filter(|(_, (_, items))| {
                items
                    .iter()
                    .any(|a| a.id == item.item_id && a.is_available_or_default())
            })
            .map(|(idx, _)| idx)
            .collect();

        if candidates.is_empty() {
            warn!(item_id = %item.item_id, "no POS carries this item; dropping unrouted line item");
            crate::metrics::ITEMS_DROPPED_UNROUTABLE_TOTAL.inc();
            continue;
        }

        let mut best_idx = candidates[0];
        let mut best_count = u64::MAX;
        for idx in candidates {
            let count = match open_counts[idx] {
                Some(c) => c,
                None => {
                    let c = store
                        .count_open_orders(&req.event_id, &catalogs[idx].0.id, &req.open_order_status)
                        .await?;
                    open_counts[idx] = Some(c);
                    c
                }
            };
            if count < best_count {
                best_count = count;
                best_idx = idx;
            }
        }

        buckets[best_idx].push(item);
    }

    let mut summaries = Vec::new();
    for (idx, (pos, _catalog)) in catalogs.iter().enumerate() {
        let bucket = &buckets[idx];
        if bucket.is_empty() {
            continue;
        }

        let mut grouped: Vec<(String, DistributedOrderItem)> = Vec::new();
        for item in bucket {
            let key = line_item_key(&item.item_id, &item.selected_extras, &item.excluded_ingredients);
            if let Some((_, existing)) = grouped.iter_mut().find(|(k, _)| k == &key) {
                existing.count += 1;
            } else {
                grouped.push((
                    key,
                    DistributedOrderItem {
                        item_id: item.item_id.clone(),
                        name: item.name.clone(),
                        price: item.price,
                        count: 1,
                        category: item.category.clone(),
                        category_name: item.category_name.clone(),
                        selected_extras: item.selected_extras.clone(),
                        excluded_ingredients: item.excluded_ingredients.clone(),
                        status: LineItemStatus::Active,
                    },
                ));
            }
        }

        let order = DistributedOrder {
            id: req.purchase_id.clone(),
            order_status: OrderStatus::open(&req.open_order_status),
            order_date: Utc::now(),
            serving_point_name: Some(req.serving_point.name.clone()),
            serving_point_location: Some(req.serving_point.location.clone()),
            note: req.note.clone(),
            tablet_number: None,
            transferred_at: None,
        };

        let items_count = grouped.len();
        store
            .write_distributed_order_batch(&req.event_id, &pos.id, order, grouped)
            .await?;

        summaries.push(DistributedPurchaseSummary {
            pos_id: pos.id.clone(),
            pos_name: pos.name.clone(),
            order_id: req.purchase_id.clone(),
            items_count,
        });
    }

    Ok(DistributionOutcome { distributed_purchases: summaries })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn line(item_id: &str) -> CanonicalLineItem {
        CanonicalLineItem {
            item_id: item_id.to_string(),
            selected_extras: vec![],
            excluded_ingredients: vec![],
            name: Some(item_id.to_string()),
            price: dec!(1.00),
            category: None,
            category_name: None,
        }
    }

    async fn seeded_store() -> MemoryStore {
        let store = MemoryStore::new();
        store.seed_event("e1", DistributionMode::Balanced).await;
        store
            .seed_pos("e1", PointOfSale { id: "A".into(), name: "A".into(), description: None, location: None })
            .await;
        store
            .seed_pos("e1", PointOfSale { id: "B".into(), name: "B".into(), description: None, location: None })
            .await;
        for pos_id in ["A", "B"] {
            for item_id in ["x", "y"] {
                store
                    .seed_pos_item(
                        "e1",
                        pos_id,
                        PosItem {
                            id: item_id.into(),
                            name: Some(item_id.into()),
                            price: dec!(1.00),
                            count: None,
                            category: None,
                            category_name: None,
                            is_available: Some(true),
                            sold_out: false,
                            selected_extras: vec![],
                            excluded_ingredients: vec![],
                        },
                    )
                    .await;
            }
        }
        store
    }

    fn serving_point() -> ServingPoint {
        ServingPoint {
            id: "sp1".into(),
            name: "Table 1".into(),
            location: "Main Tent".into(),
            area_name: None,
            capacity: None,
        }
    }

    #[tokio::test]
    async fn least_loaded_pos_receives_the_item() {
        let store = seeded_store().await;
        // A has 2 open orders, B has 1 — seed via two dummy orders at A.
        for i in 0..2 {
            store
                .seed_distributed_order(
                    "e1",
                    "A",
                    DistributedOrder {
                        id: format!("dummy{i}"),
                        order_status: OrderStatus::open("open"),
                        order_date: Utc::now(),
                        serving_point_name: None,
                        serving_point_location: None,
                        note: None,
                        tablet_number: None,
                        transferred_at: None,
                    },
                    vec![],
                )
                .await;
        }
        store
            .seed_distributed_order(
                "e1",
                "B",
                DistributedOrder {
                    id: "dummy_b".into(),
                    order_status: OrderStatus::open("open"),
                    order_date: Utc::now(),
                    serving_point_name: None,
                    serving_point_location: None,
                    note: None,
                    tablet_number: None,
                    transferred_at: None,
                },
                vec![],
            )
            .await;

        let req = DistributionRequest {
            event_id: "e1".into(),
            purchase_id: "p1".into(),
            items: vec![line("x"), line("y"), line("x")],
            serving_point: serving_point(),
            mode: DistributionMode::Balanced,
            note: None,
            open_order_status: "open".into(),
        };

        let outcome = distribute(&store, req).await.unwrap();
        assert_eq!(outcome.distributed_purchases.len(), 1);
        assert_eq!(outcome.distributed_purchases[0].pos_id, "B");

        let items = store.list_distributed_order_items("e1", "B", "p1").await.unwrap();
        let x_count: i64 = items.iter().filter(|(_, i)| i.item_id == "x").map(|(_, i)| i.count).sum();
        let y_count: i64 = items.iter().filter(|(_, i)| i.item_id == "y").map(|(_, i)| i.count).sum();
        assert_eq!(x_count, 2);
        assert_eq!(y_count, 1);

        let a_items = store.list_distributed_order_items("e1", "A", "p1").await;
        assert!(matches!(a_items, Err(_)));
    }

    async fn seed_open_orders(store: &MemoryStore, pos_id: &str, n: u32) {
        for i in 0..n {
            store
                .seed_distributed_order(
                    "e1",
                    pos_id,
                    DistributedOrder {
                        id: format!("dummy_{pos_id}_{i}"),
                        order_status: OrderStatus::open("open"),
                        order_date: Utc::now(),
                        serving_point_name: None,
                        serving_point_location: None,
                        note: None,
                        tablet_number: None,
                        transferred_at: None,
                    },
                    vec![],
                )
                .await;
        }
    }

    #[rstest]
    #[case(0, 0, "A")] // tied load -> first-listed POS (ascending id order)
    #[case(2, 1, "B")]
    #[case(1, 2, "A")]
    #[case(0, 5, "A")]
    #[tokio::test]
    async fn least_loaded_tie_break_grid(#[case] a_open: u32, #[case] b_open: u32, #[case] expected_pos: &str) {
        let store = seeded_store().await;
        seed_open_orders(&store, "A", a_open).await;
        seed_open_orders(&store, "B", b_open).await;

        let req = DistributionRequest {
            event_id: "e1".into(),
            purchase_id: "tie".into(),
            items: vec![line("x")],
            serving_point: serving_point(),
            mode: DistributionMode::Balanced,
            note: None,
            open_order_status: "open".into(),
        };

        let outcome = distribute(&store, req).await.unwrap();
        assert_eq!(outcome.distributed_purchases.len(), 1);
        assert_eq!(outcome.distributed_purchases[0].pos_id, expected_pos);
    }

    #[tokio::test]
    async fn unroutable_item_is_dropped() {
        let store = seeded_store().await;
        let req = DistributionRequest {
            event_id: "e1".into(),
            purchase_id: "p2".into(),
            items: vec![line("z")],
            serving_point: serving_point(),
            mode: DistributionMode::Balanced,
            note: None,
            open_order_status: "open".into(),
        };
        let outcome = distribute(&store, req).await.unwrap();
        assert!(outcome.distributed_purchases.is_empty());
    }

    #[tokio::test]
    async fn grouped_mode_is_unsupported() {
        let store = seeded_store().await;
        let req = DistributionRequest {
            event_id: "e1".into(),
            purchase_id: "p3".into(),
            items: vec![line("x")],
            serving_point: serving_point(),
            mode: DistributionMode::Grouped,
            note: None,
            open_order_status: "open".into(),
        };
        let err = distribute(&store, req).await.unwrap_err();
        assert!(matches!(err, EngineError::Unsupported(_)));
    }

    #[tokio::test]
    async fn empty_pos_set_is_an_invalid_request() {
        let store = MemoryStore::new();
        store.seed_event("e2", DistributionMode::Balanced).await;
        let req = DistributionRequest {
            event_id: "e2".into(),
            purchase_id: "p4".into(),
            items: vec![line("x")],
            serving_point: serving_point(),
            mode: DistributionMode::Balanced,
            note: None,
            open_order_status: "open".into(),
        };
        let err = distribute(&store, req).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidRequest(_)));
    }
}
