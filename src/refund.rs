//! Refund Propagator: on a refund notification transition,
//! cancels matching line items across the main order and every POS-scoped
//! distributed copy, then recomputes totals.

use tracing::instrument;

use crate::errors::EngineError;
use crate::store::DocumentStore;

/// Update on `Events/{e}/Notifications/{n}` (the `onNotificationUpdate` trigger).
pub struct NotificationUpdateEvent {
    pub event_id: String,
    pub notification_id: String,
    pub before_status: String,
    pub after_status: String,
    pub order_id: Option<String>,
    pub item_ids: Vec<String>,
}

/// Runs the refund propagation pipeline when `before.status != "refund"` and
/// `after.status == "refund"`; a no-op transition otherwise. `order_id` and
/// `item_ids` are required on the transition.
#[instrument(skip(store, event), fields(event_id = %event.event_id, notification_id = %event.notification_id))]
pub async fn on_notification_update(store: &dyn DocumentStore, event: NotificationUpdateEvent) -> Result<(), EngineError> {
    if event.before_status == "refund" || event.after_status != "refund" {
        return Ok(());
    }

    let order_id = event
        .order_id
        .ok_or_else(|| EngineError::InvalidRequest("orderId is required on a refund transition".to_string()))?;
    if event.item_ids.is_empty() {
        return Err(EngineError::InvalidRequest("itemIds is required on a refund transition".to_string()));
    }

    cancel_and_recompute(store, &event.event_id, &order_id, &event.item_ids).await?;

    for pos_id in store.list_pos_ids_with_distributed_order(&event.event_id, &order_id).await? {
        store
            .cancel_distributed_order_items_by_ids(&event.event_id, &pos_id, &order_id, &event.item_ids)
            .await?;
    }

    Ok(())
}

async fn cancel_and_recompute(
    store: &dyn DocumentStore,
    event_id: &str,
    order_id: &str,
    item_ids: &[String],
) -> Result<(), EngineError> {
    store.cancel_purchase_items_by_ids(event_id, order_id, item_ids).await?;
    store.recompute_purchase_total(event_id, order_id).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DistributionMode;
    use crate::model::{
        CanonicalItem, DistributedOrder, DistributedOrderItem, LineItemStatus, OrderStatus,
        PointOfSale, Purchase, PurchaseItemDoc,
    };
    use crate::store::memory::MemoryStore;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    async fn seeded_store() -> MemoryStore {
        let store = MemoryStore::new();
        store.seed_event("e1", DistributionMode::Balanced).await;
        store
            .seed_canonical_item("e1", CanonicalItem { id: "x".into(), name: Some("X".into()), price: dec!(2.00), category: None, category_name: None, is_available: true, sold_out: false })
            .await;
        store
            .seed_canonical_item("e1", CanonicalItem { id: "y".into(), name: Some("Y".into()), price: dec!(3.00), category: None, category_name: None, is_available: true, sold_out: false })
            .await;
        store
            .seed_purchase(
                "e1",
                Purchase { id: "o1".into(), serving_point_id: "sp1".into(), user_id: None, note: None, order_placed: Utc::now(), is_paid: true, distributed: true, distributed_at: Some(Utc::now()), distribution_error: None, distribution_failed: false, total_price: Some(dec!(5.00)) },
            )
            .await;
        store.seed_purchase_item("e1", "o1", PurchaseItemDoc { item_id: "x".into(), quantity: Some(1.0), ..Default::default() }).await;
        store.seed_purchase_item("e1", "o1", PurchaseItemDoc { item_id: "y".into(), quantity: Some(1.0), ..Default::default() }).await;

        store.seed_pos("e1", PointOfSale { id: "A".into(), name: "A".into(), description: None, location: None }).await;
        store
            .seed_distributed_order(
                "e1",
                "A",
                DistributedOrder { id: "o1".into(), order_status: OrderStatus::open("open"), order_date: Utc::now(), serving_point_name: None, serving_point_location: None, note: None, tablet_number: None, transferred_at: None },
                vec![
                    ("x__".into(), DistributedOrderItem { item_id: "x".into(), name: None, price: dec!(2.00), count: 1, category: None, category_name: None, selected_extras: vec![], excluded_ingredients: vec![], status: LineItemStatus::Active }),
                    ("y__".into(), DistributedOrderItem { item_id: "y".into(), name: None, price: dec!(3.00), count: 1, category: None, category_name: None, selected_extras: vec![], excluded_ingredients: vec![], status: LineItemStatus::Active }),
                ],
            )
            .await;
        store
    }

    #[tokio::test]
    async fn refund_cancels_items_and_recomputes_total() {
        let store = seeded_store().await;

        on_notification_update(
            &store,
            NotificationUpdateEvent {
                event_id: "e1".into(),
                notification_id: "n1".into(),
                before_status: "created".into(),
                after_status: "refund".into(),
                order_id: Some("o1".into()),
                item_ids: vec!["x".into()],
            },
        )
        .await
        .unwrap();

        let items = store.list_purchase_items("e1", "o1").await.unwrap();
        let x = items.iter().find(|i| i.item_id == "x").unwrap();
        assert_eq!(x.status.as_deref(), Some("canceled"));
        assert_eq!(x.quantity, Some(0.0));

        let purchase = store.get_purchase("e1", "o1").await.unwrap();
        assert_eq!(purchase.total_price, Some(dec!(3.00))); // only y remains

        let pos_items = store.list_distributed_order_items("e1", "A", "o1").await.unwrap();
        let pos_x = pos_items.iter().find(|(_, i)| i.item_id == "x").unwrap();
        assert_eq!(pos_x.1.status, LineItemStatus::Canceled);
        assert_eq!(pos_x.1.count, 0);
    }

    #[tokio::test]
    async fn idempotent_on_repeated_transition() {
        let store = seeded_store().await;
        let event = || NotificationUpdateEvent {
            event_id: "e1".into(),
            notification_id: "n1".into(),
            before_status: "created".into(),
            after_status: "refund".into(),
            order_id: Some("o1".into()),
            item_ids: vec!["x".into()],
        };

        on_notification_update(&store, event()).await.unwrap();
        on_notification_update(&store, event()).await.unwrap();

        let items = store.list_purchase_items("e1", "o1").await.unwrap();
        let x = items.iter().find(|i| i.item_id == "x").unwrap();
        assert_eq!(x.quantity, Some(0.0));
    }

    #[tokio::test]
    async fn non_refund_transition_is_a_no_op() {
        let store = seeded_store().await;
        on_notification_update(
            &store,
            NotificationUpdateEvent {
                event_id: "e1".into(),
                notification_id: "n1".into(),
                before_status: "created".into(),
                after_status: "in_progress".into(),
                order_id: Some("o1".into()),
                item_ids: vec!["x".into()],
            },
        )
        .await
        .unwrap();

        let purchase = store.get_purchase("e1", "o1").await.unwrap();
        assert_eq!(purchase.total_price, Some(dec!(5.00))); // unchanged
    }
}
