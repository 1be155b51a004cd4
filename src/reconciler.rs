//! Availability Reconciler: reacts to POS-local item-flag
//! changes, recomputes the canonical availability flag, migrates open
//! orders away from a POS that just went sold out, and — when no
//! substitute exists — emits refund notifications and marks line items
//! for cancellation.

use std::collections::HashMap;

use tracing::{info, instrument, warn};

use crate::errors::EngineError;
use crate::metrics;
use crate::model::{
    DistributedOrder, DistributedOrderItem, NotificationAction, NotificationPayload,
    NotificationStatus, OrderStatus, Severity,
};
use crate::notifications;
use crate::store::DocumentStore;

/// Update on `…/Points-of-Sale/{posId}/Items/{itemId}` (the `onPosItemUpdate` trigger).
pub struct PosItemUpdateEvent {
    pub event_id: String,
    pub pos_id: String,
    pub item_id: String,
    /// Absent `isAvailable` reads as available.
    pub before_is_available: bool,
    pub after_is_available: bool,
    pub open_order_status: String,
}

#[instrument(skip(store, event), fields(event_id = %event.event_id, pos_id = %event.pos_id, item_id = %event.item_id))]
pub async fn on_pos_item_update(store: &dyn DocumentStore, event: PosItemUpdateEvent) -> Result<(), EngineError> {
    if event.before_is_available == event.after_is_available {
        return Ok(());
    }

    if event.after_is_available {
        store
            .set_canonical_item_availability(&event.event_id, &event.item_id, true)
            .await?;
        sync_global_availability(store, &event.event_id, &event.item_id).await?;
        return Ok(());
    }

    handle_deactivation(store, &event).await
}

/// `SyncGlobalAvailability`: the canonical flag is true iff
/// any POS carries the item with POS-local availability `≠ false`.
#[instrument(skip(store))]
pub async fn sync_global_availability(store: &dyn DocumentStore, event_id: &str, item_id: &str) -> Result<(), EngineError> {
    let pos_list = store.list_pos(event_id).await?;
    let mut any_available = false;
    for pos in &pos_list {
        if let Some(item) = store.get_pos_item(event_id, &pos.id, item_id).await? {
            if item.is_available_or_default() {
                any_available = true;
                break;
            }
        }
    }
    store.set_canonical_item_availability(event_id, item_id, any_available).await?;
    Ok(())
}

async fn handle_deactivation(store: &dyn DocumentStore, event: &PosItemUpdateEvent) -> Result<(), EngineError> {
    let pos_list = store.list_pos(&event.event_id).await?;

    let mut candidates: Vec<(String, u64)> = Vec::new();
    for pos in &pos_list {
        if pos.id == event.pos_id {
            continue;
        }
        if let Some(item) = store.get_pos_item(&event.event_id, &pos.id, &event.item_id).await? {
            if item.is_available_or_default() {
                let count = store
                    .count_open_orders(&event.event_id, &pos.id, &event.open_order_status)
                    .await?;
                candidates.push((pos.id.clone(), count));
            }
        }
    }
    candidates.sort_by_key(|(_, count)| *count);

    match candidates.first() {
        None => {
            store.set_canonical_item_availability(&event.event_id, &event.item_id, false).await?;
            emit_refund_notifications(store, event).await?;
            mark_items_for_canceling(store, event).await?;
            sync_global_availability(store, &event.event_id, &event.item_id).await?;
        }
        Some((dest_pos_id, _)) => {
            migrate_open_orders(store, event, dest_pos_id).await?;
            sync_global_availability(store, &event.event_id, &event.item_id).await?;
        }
    }
    Ok(())
}

/// Process-local, best-effort memo of which item ids are currently globally
/// unavailable — used only as a read-through within one reconciler call,
/// never as a source of truth for writes.
struct AvailabilityMemo<'a> {
    store: &'a dyn DocumentStore,
    event_id: &'a str,
    triggering_item: &'a str,
    cache: HashMap<String, bool>,
}

impl<'a> AvailabilityMemo<'a> {
    fn new(store: &'a dyn DocumentStore, event_id: &'a str, triggering_item: &'a str) -> Self {
        Self { store, event_id, triggering_item, cache: HashMap::new() }
    }

    /// `false` for the item that triggered this call even before its write
    /// is visible to other reads.
    async fn is_globally_available(&mut self, item_id: &str) -> Result<bool, EngineError> {
        if item_id == self.triggering_item {
            return Ok(false);
        }
        if let Some(v) = self.cache.get(item_id) {
            return Ok(*v);
        }
        let available = self.store.get_canonical_item(self.event_id, item_id).await?.is_available;
        self.cache.insert(item_id.to_string(), available);
        Ok(available)
    }
}

async fn emit_refund_notifications(store: &dyn DocumentStore, event: &PosItemUpdateEvent) -> Result<(), EngineError> {
    let orders = store
        .list_open_distributed_orders(&event.event_id, &event.pos_id, &event.open_order_status)
        .await?;
    let mut memo = AvailabilityMemo::new(store, &event.event_id, &event.item_id);

    for order in orders {
        let items = store
            .list_distributed_order_items(&event.event_id, &event.pos_id, &order.id)
            .await?;

        let mut refund_total = rust_decimal::Decimal::ZERO;
        let mut item_ids = Vec::new();

        for (_, item) in &items {
            if !memo.is_globally_available(&item.item_id).await? {
                refund_total += item.price * rust_decimal::Decimal::from(item.count);
                if !item_ids.contains(&item.item_id) {
                    item_ids.push(item.item_id.clone());
                }
            }
        }

        if item_ids.is_empty() || refund_total <= rust_decimal::Decimal::ZERO {
            continue;
        }

        notifications::create_notification(
            store,
            &event.event_id,
            NotificationPayload {
                title: "Artikel ist/sind ausverkauft".to_string(),
                message: "Unten stehenden Betrag erstatten und bestätigen".to_string(),
                point_of_service: Some(event.pos_id.clone()),
                price: Some(refund_total),
                item_ids,
                order_id: Some(order.id.clone()),
                payment_method: None,
                severity: Severity::Error,
                action: Some(NotificationAction::Refund),
                status: NotificationStatus::Created,
            },
        )
        .await?;
        metrics::REFUND_NOTIFICATIONS_EMITTED_TOTAL.inc();
    }
    Ok(())
}

async fn mark_items_for_canceling(store: &dyn DocumentStore, event: &PosItemUpdateEvent) -> Result<(), EngineError> {
    let orders = store
        .list_open_distributed_orders(&event.event_id, &event.pos_id, &event.open_order_status)
        .await?;
    for order in orders {
        store
            .mark_distributed_order_items_for_canceling(
                &event.event_id,
                &event.pos_id,
                &order.id,
                std::slice::from_ref(&event.item_id),
            )
            .await?;
    }
    Ok(())
}

/// Migration of open-order items from `p` (the deactivated POS) to `q`.
/// A failure migrating one order must not abort the others.
async fn migrate_open_orders(store: &dyn DocumentStore, event: &PosItemUpdateEvent, dest_pos_id: &str) -> Result<(), EngineError> {
    let orders = store
        .list_open_distributed_orders(&event.event_id, &event.pos_id, &event.open_order_status)
        .await?;

    for order in orders {
        if let Err(err) = migrate_one_order(store, event, dest_pos_id, &order).await {
            warn!(order_id = %order.id, error = %err, "failed to migrate order; continuing with siblings");
        }
    }
    Ok(())
}

/// An item transfers iff it's the one that just went unavailable, or it's
/// independently no longer available at the source POS (a live read, not
/// the canonical/global flag — an item still carried at `p` stays at `p`
/// even though its id is globally available elsewhere).
async fn migrate_one_order(
    store: &dyn DocumentStore,
    event: &PosItemUpdateEvent,
    dest_pos_id: &str,
    order: &DistributedOrder,
) -> Result<(), EngineError> {
    let items = store
        .list_distributed_order_items(&event.event_id, &event.pos_id, &order.id)
        .await?;

    let mut transferable = Vec::new();
    for (key, item) in &items {
        let still_available_here = if item.item_id == event.item_id {
            false
        } else {
            store
                .get_pos_item(&event.event_id, &event.pos_id, &item.item_id)
                .await?
                .map(|pi| pi.is_available_or_default())
                .unwrap_or(false)
        };
        if !still_available_here {
            transferable.push((key.clone(), item.clone()));
        }
    }
    if transferable.is_empty() {
        return Ok(());
    }

    ensure_destination_order(store, event, dest_pos_id, order).await?;

    for (key, item) in transferable {
        store
            .migrate_distributed_order_item(
                &event.event_id,
                dest_pos_id,
                &order.id,
                &key,
                item,
                &event.pos_id,
                &order.id,
            )
            .await?;
        metrics::POS_ITEMS_MIGRATED_TOTAL.inc();
    }

    let remaining = store
        .list_distributed_order_items(&event.event_id, &event.pos_id, &order.id)
        .await?;
    if remaining.is_empty() {
        let mut closed = order.clone();
        closed.order_status = OrderStatus::transferred();
        closed.transferred_at = Some(chrono::Utc::now());
        store.upsert_distributed_order(&event.event_id, &event.pos_id, closed).await?;
    }

    info!(order_id = %order.id, dest_pos_id = %dest_pos_id, "migrated order items");
    Ok(())
}

async fn ensure_destination_order(
    store: &dyn DocumentStore,
    event: &PosItemUpdateEvent,
    dest_pos_id: &str,
    source: &DistributedOrder,
) -> Result<(), EngineError> {
    match store.get_distributed_order(&event.event_id, dest_pos_id, &source.id).await? {
        Some(existing) if !existing.order_status.is_open(&event.open_order_status) => {
            let mut reopened = existing;
            reopened.order_status = OrderStatus::open(&event.open_order_status);
            reopened.transferred_at = None;
            store.upsert_distributed_order(&event.event_id, dest_pos_id, reopened).await?;
        }
        Some(_) => {}
        None => {
            let mut created = source.clone();
            created.order_status = OrderStatus::open(&event.open_order_status);
            created.transferred_at = None;
            store.upsert_distributed_order(&event.event_id, dest_pos_id, created).await?;
        }
    }
    Ok(())
}
