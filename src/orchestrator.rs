//! Purchase Orchestrator: reacts to purchase writes, normalizes
//! and enriches the purchase's line items, and invokes the scheduler
//! exactly once per purchase.

use tracing::{error, instrument, warn};

use crate::errors::EngineError;
use crate::metrics;
use crate::model::{CanonicalLineItem, Purchase};
use crate::quantity;
use crate::scheduler::{self, DistributionOutcome, DistributionRequest};
use crate::store::DocumentStore;

/// Before/after view of a purchase document write (the `onPurchaseWrite` trigger).
pub struct PurchaseWriteEvent {
    pub event_id: String,
    pub purchase_id: String,
    pub before_is_paid: Option<bool>,
    /// `None` when the write was a delete.
    pub after: Option<Purchase>,
}

/// Runs every guard predicate in order, returning `Ok(None)` when the write
/// doesn't warrant distribution.
#[instrument(skip(store, event), fields(event_id = %event.event_id, purchase_id = %event.purchase_id))]
pub async fn on_purchase_write(
    store: &dyn DocumentStore,
    event: PurchaseWriteEvent,
    open_order_status: &str,
) -> Result<Option<DistributionOutcome>, EngineError> {
    let after = match event.after {
        Some(p) => p,
        None => return Ok(None), // deleted
    };

    if !after.is_paid {
        return Ok(None);
    }
    if event.before_is_paid == Some(true) {
        return Ok(None); // already processed on the paid transition
    }
    if after.distributed {
        return Ok(None); // idempotent guard
    }
    if after.serving_point_id.is_empty() {
        error!(purchase_id = %after.id, "purchase is missing servingPointId");
        return Ok(None);
    }

    let serving_point = match store.get_serving_point(&event.event_id, &after.serving_point_id).await {
        Ok(sp) => sp,
        Err(_) => {
            error!(purchase_id = %after.id, serving_point_id = %after.serving_point_id, "serving point not found");
            return Ok(None);
        }
    };

    let tenant = store.get_event(&event.event_id).await?;
    let docs = store.list_purchase_items(&event.event_id, &after.id).await?;

    let mut items = Vec::new();
    for doc in &docs {
        for line in quantity::normalize(doc) {
            let item = match store.get_canonical_item(&event.event_id, &line.item_id).await {
                Ok(catalog) => CanonicalLineItem {
                    item_id: line.item_id,
                    selected_extras: line.selected_extras,
                    excluded_ingredients: line.excluded_ingredients,
                    name: catalog.name,
                    price: catalog.price,
                    category: catalog.category,
                    category_name: catalog.category_name,
                },
                Err(_) => {
                    warn!(item_id = %line.item_id, "canonical item not found; enriching from the purchase-item doc instead");
                    CanonicalLineItem {
                        item_id: line.item_id,
                        selected_extras: line.selected_extras,
                        excluded_ingredients: line.excluded_ingredients,
                        name: doc.name.clone(),
                        price: doc.price.unwrap_or_default(),
                        category: doc.category.clone(),
                        category_name: doc.category_name.clone(),
                    }
                }
            };
            items.push(item);
        }
    }

    let req = DistributionRequest {
        event_id: event.event_id.clone(),
        purchase_id: after.id.clone(),
        items,
        serving_point,
        mode: tenant.distribution_mode,
        note: after.note.clone(),
        open_order_status: open_order_status.to_string(),
    };

    match scheduler::distribute(store, req).await {
        Ok(outcome) => {
            store
                .mark_purchase_distributed_if_not_already(&event.event_id, &after.id)
                .await?;
            metrics::ORDERS_DISTRIBUTED_TOTAL.inc();
            Ok(Some(outcome))
        }
        Err(err) => {
            store
                .mark_purchase_distribution_failed(&event.event_id, &after.id, &err.to_string())
                .await?;
            metrics::DISTRIBUTION_FAILURES_TOTAL.inc();
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DistributionMode;
    use crate::model::{CanonicalItem, PointOfSale, PosItem, PurchaseItemDoc, ServingPoint};
    use crate::store::memory::MemoryStore;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    async fn seeded_store() -> MemoryStore {
        let store = MemoryStore::new();
        store.seed_event("e1", DistributionMode::Balanced).await;
        store
            .seed_serving_point(
                "e1",
                ServingPoint { id: "sp1".into(), name: "Table 1".into(), location: "Tent".into(), area_name: None, capacity: None },
            )
            .await;
        store
            .seed_canonical_item(
                "e1",
                CanonicalItem { id: "x".into(), name: Some("Burger".into()), price: dec!(5.00), category: None, category_name: None, is_available: true, sold_out: false },
            )
            .await;
        store
            .seed_pos("e1", PointOfSale { id: "A".into(), name: "A".into(), description: None, location: None })
            .await;
        store
            .seed_pos_item(
                "e1",
                "A",
                PosItem { id: "x".into(), name: Some("Burger".into()), price: dec!(5.00), count: None, category: None, category_name: None, is_available: Some(true), sold_out: false, selected_extras: vec![], excluded_ingredients: vec![] },
            )
            .await;
        store
    }

    fn purchase(id: &str, serving_point_id: &str, is_paid: bool, distributed: bool) -> Purchase {
        Purchase {
            id: id.into(),
            serving_point_id: serving_point_id.into(),
            user_id: None,
            note: None,
            order_placed: Utc::now(),
            is_paid,
            distributed,
            distributed_at: None,
            distribution_error: None,
            distribution_failed: false,
            total_price: None,
        }
    }

    #[tokio::test]
    async fn distributes_on_the_paid_transition() {
        let store = seeded_store().await;
        store.seed_purchase("e1", purchase("p1", "sp1", true, false)).await;
        store
            .seed_purchase_item("e1", "p1", PurchaseItemDoc { item_id: "x".into(), quantity: Some(1.0), ..Default::default() })
            .await;

        let outcome = on_purchase_write(
            &store,
            PurchaseWriteEvent { event_id: "e1".into(), purchase_id: "p1".into(), before_is_paid: Some(false), after: Some(store.get_purchase("e1", "p1").await.unwrap()) },
            "open",
        )
        .await
        .unwrap();

        assert!(outcome.is_some());
        let purchase = store.get_purchase("e1", "p1").await.unwrap();
        assert!(purchase.distributed);
    }

    #[tokio::test]
    async fn skips_when_already_paid_before() {
        let store = seeded_store().await;
        let p = purchase("p2", "sp1", true, false);
        store.seed_purchase("e1", p.clone()).await;

        let outcome = on_purchase_write(
            &store,
            PurchaseWriteEvent { event_id: "e1".into(), purchase_id: "p2".into(), before_is_paid: Some(true), after: Some(p) },
            "open",
        )
        .await
        .unwrap();
        assert!(outcome.is_none());
    }

    #[tokio::test]
    async fn skips_when_already_distributed() {
        let store = seeded_store().await;
        let p = purchase("p3", "sp1", true, true);
        store.seed_purchase("e1", p.clone()).await;

        let outcome = on_purchase_write(
            &store,
            PurchaseWriteEvent { event_id: "e1".into(), purchase_id: "p3".into(), before_is_paid: Some(false), after: Some(p) },
            "open",
        )
        .await
        .unwrap();
        assert!(outcome.is_none());
    }

    #[tokio::test]
    async fn skips_on_delete() {
        let store = seeded_store().await;
        let outcome = on_purchase_write(
            &store,
            PurchaseWriteEvent { event_id: "e1".into(), purchase_id: "p4".into(), before_is_paid: Some(false), after: None },
            "open",
        )
        .await
        .unwrap();
        assert!(outcome.is_none());
    }
}
