//! A process-local, in-memory [`DocumentStore`]. There is no real
//! Firestore-class backend wired into this crate; this is the stand-in that
//! lets every component above the Store Gateway be exercised without
//! network I/O, the same role `cache::InMemoryCache` and the notification
//! module's `MockRedis` test double play elsewhere in this codebase's
//! lineage.
//!
//! Concurrency model: a single `tokio::sync::RwLock` guards the whole
//! store. That's coarser than a real document store's per-document
//! optimistic concurrency, but it gives every multi-step operation here
//! (`write_distributed_order_batch`, `migrate_distributed_order_item`)
//! true atomicity for free. This is not a claim about how a production
//! store would be implemented.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::warn;

use crate::config::DistributionMode;
use crate::errors::StoreError;
use crate::model::{
    CanonicalItem, DistributedOrder, DistributedOrderItem, EventTenant, LineItemStatus,
    Notification, NotificationAction, NotificationPayload, NotificationStatus, PointOfSale,
    PosItem, Purchase, PurchaseItemDoc, ServingPoint,
};
use crate::quantity;

use super::DocumentStore;

#[derive(Debug, Default)]
struct OrderRecord {
    order: DistributedOrder,
    items: BTreeMap<String, DistributedOrderItem>,
}

#[derive(Debug, Default)]
struct PosRecord {
    info: PointOfSale,
    items: HashMap<String, PosItem>,
    orders: BTreeMap<String, OrderRecord>,
}

#[derive(Debug, Default)]
struct PurchaseRecord {
    purchase: Purchase,
    items: HashMap<String, PurchaseItemDoc>,
}

#[derive(Debug)]
struct EventData {
    tenant: EventTenant,
    serving_points: HashMap<String, ServingPoint>,
    items: HashMap<String, CanonicalItem>,
    // BTreeMap keyed by POS id: gives ascending-id enumeration order for
    // free, keeping POS enumeration order deterministic for tie-breaks.
    pos: BTreeMap<String, PosRecord>,
    purchases: HashMap<String, PurchaseRecord>,
    notifications: HashMap<String, Notification>,
}

impl EventData {
    fn new(event_id: &str) -> Self {
        Self {
            tenant: EventTenant {
                id: event_id.to_string(),
                distribution_mode: DistributionMode::Balanced,
            },
            serving_points: HashMap::new(),
            items: HashMap::new(),
            pos: BTreeMap::new(),
            purchases: HashMap::new(),
            notifications: HashMap::new(),
        }
    }
}

/// In-memory `DocumentStore`. See module docs for the concurrency model.
pub struct MemoryStore {
    events: RwLock<HashMap<String, EventData>>,
    notification_seq: AtomicU64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            events: RwLock::new(HashMap::new()),
            notification_seq: AtomicU64::new(0),
        }
    }

    // ---- test/seed helpers -------------------------------------------------

    pub async fn seed_event(&self, event_id: &str, distribution_mode: DistributionMode) {
        let mut events = self.events.write().await;
        let entry = events
            .entry(event_id.to_string())
            .or_insert_with(|| EventData::new(event_id));
        entry.tenant.distribution_mode = distribution_mode;
    }

    async fn event_mut<'a>(
        events: &'a mut HashMap<String, EventData>,
        event_id: &str,
    ) -> &'a mut EventData {
        events
            .entry(event_id.to_string())
            .or_insert_with(|| EventData::new(event_id))
    }

    pub async fn seed_serving_point(&self, event_id: &str, sp: ServingPoint) {
        let mut events = self.events.write().await;
        let event = Self::event_mut(&mut events, event_id).await;
        event.serving_points.insert(sp.id.clone(), sp);
    }

    pub async fn seed_canonical_item(&self, event_id: &str, item: CanonicalItem) {
        let mut events = self.events.write().await;
        let event = Self::event_mut(&mut events, event_id).await;
        event.items.insert(item.id.clone(), item);
    }

    pub async fn seed_pos(&self, event_id: &str, pos: PointOfSale) {
        let mut events = self.events.write().await;
        let event = Self::event_mut(&mut events, event_id).await;
        event.pos.entry(pos.id.clone()).or_insert_with(PosRecord::default).info = pos;
    }

    pub async fn seed_pos_item(&self, event_id: &str, pos_id: &str, item: PosItem) {
        let mut events = self.events.write().await;
        let event = Self::event_mut(&mut events, event_id).await;
        let pos = event.pos.entry(pos_id.to_string()).or_insert_with(PosRecord::default);
        pos.items.insert(item.id.clone(), item);
    }

    pub async fn seed_purchase(&self, event_id: &str, purchase: Purchase) {
        let mut events = self.events.write().await;
        let event = Self::event_mut(&mut events, event_id).await;
        event
            .purchases
            .entry(purchase.id.clone())
            .or_insert_with(PurchaseRecord::default)
            .purchase = purchase;
    }

    pub async fn seed_purchase_item(&self, event_id: &str, purchase_id: &str, item: PurchaseItemDoc) {
        let mut events = self.events.write().await;
        let event = Self::event_mut(&mut events, event_id).await;
        let purchase = event
            .purchases
            .entry(purchase_id.to_string())
            .or_insert_with(PurchaseRecord::default);
        purchase.items.insert(item.item_id.clone(), item);
    }

    pub async fn seed_distributed_order(
        &self,
        event_id: &str,
        pos_id: &str,
        order: DistributedOrder,
        items: Vec<(String, DistributedOrderItem)>,
    ) {
        let mut events = self.events.write().await;
        let event = Self::event_mut(&mut events, event_id).await;
        let pos = event.pos.entry(pos_id.to_string()).or_insert_with(PosRecord::default);
        let record = pos.orders.entry(order.id.clone()).or_insert_with(OrderRecord::default);
        record.order = order;
        for (key, item) in items {
            record.items.insert(key, item);
        }
    }
}

fn nf(what: &str, id: &str) -> StoreError {
    StoreError::NotFound(format!("{what} '{id}' not found"))
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get_event(&self, event_id: &str) -> Result<EventTenant, StoreError> {
        let events = self.events.read().await;
        events
            .get(event_id)
            .map(|e| e.tenant.clone())
            .ok_or_else(|| nf("event", event_id))
    }

    async fn list_pos(&self, event_id: &str) -> Result<Vec<PointOfSale>, StoreError> {
        let events = self.events.read().await;
        let event = events.get(event_id).ok_or_else(|| nf("event", event_id))?;
        Ok(event.pos.values().map(|p| p.info.clone()).collect())
    }

    async fn list_pos_items(&self, event_id: &str, pos_id: &str) -> Result<Vec<PosItem>, StoreError> {
        let events = self.events.read().await;
        let event = events.get(event_id).ok_or_else(|| nf("event", event_id))?;
        let pos = event.pos.get(pos_id).ok_or_else(|| nf("pos", pos_id))?;
        Ok(pos.items.values().cloned().collect())
    }

    async fn get_pos_item(
        &self,
        event_id: &str,
        pos_id: &str,
        item_id: &str,
    ) -> Result<Option<PosItem>, StoreError> {
        let events = self.events.read().await;
        let event = events.get(event_id).ok_or_else(|| nf("event", event_id))?;
        let pos = event.pos.get(pos_id).ok_or_else(|| nf("pos", pos_id))?;
        Ok(pos.items.get(item_id).cloned())
    }

    async fn get_serving_point(&self, event_id: &str, id: &str) -> Result<ServingPoint, StoreError> {
        let events = self.events.read().await;
        let event = events.get(event_id).ok_or_else(|| nf("event", event_id))?;
        event
            .serving_points
            .get(id)
            .cloned()
            .ok_or_else(|| nf("serving point", id))
    }

    async fn get_canonical_item(&self, event_id: &str, item_id: &str) -> Result<CanonicalItem, StoreError> {
        let events = self.events.read().await;
        let event = events.get(event_id).ok_or_else(|| nf("event", event_id))?;
        event
            .items
            .get(item_id)
            .cloned()
            .ok_or_else(|| nf("item", item_id))
    }

    async fn set_canonical_item_availability(
        &self,
        event_id: &str,
        item_id: &str,
        available: bool,
    ) -> Result<(), StoreError> {
        let mut events = self.events.write().await;
        let event = Self::event_mut(&mut events, event_id).await;
        match event.items.get_mut(item_id) {
            Some(item) => {
                item.is_available = available;
                Ok(())
            }
            None => Err(nf("item", item_id)),
        }
    }

    async fn list_purchase_items(
        &self,
        event_id: &str,
        purchase_id: &str,
    ) -> Result<Vec<PurchaseItemDoc>, StoreError> {
        let events = self.events.read().await;
        let event = events.get(event_id).ok_or_else(|| nf("event", event_id))?;
        let purchase = event
            .purchases
            .get(purchase_id)
            .ok_or_else(|| nf("purchase", purchase_id))?;
        Ok(purchase.items.values().cloned().collect())
    }

    async fn get_purchase(&self, event_id: &str, purchase_id: &str) -> Result<Purchase, StoreError> {
        let events = self.events.read().await;
        let event = events.get(event_id).ok_or_else(|| nf("event", event_id))?;
        event
            .purchases
            .get(purchase_id)
            .map(|p| p.purchase.clone())
            .ok_or_else(|| nf("purchase", purchase_id))
    }

    async fn create_purchase(&self, event_id: &str, purchase: Purchase) -> Result<(), StoreError> {
        let mut events = self.events.write().await;
        let event = Self::event_mut(&mut events, event_id).await;
        if event.purchases.contains_key(&purchase.id) {
            return Err(StoreError::Conflict(format!(
                "purchase '{}' already exists",
                purchase.id
            )));
        }
        event.purchases.insert(
            purchase.id.clone(),
            PurchaseRecord { purchase, items: HashMap::new() },
        );
        Ok(())
    }

    async fn create_purchase_item(
        &self,
        event_id: &str,
        purchase_id: &str,
        item: PurchaseItemDoc,
    ) -> Result<(), StoreError> {
        let mut events = self.events.write().await;
        let event = Self::event_mut(&mut events, event_id).await;
        let record = event
            .purchases
            .get_mut(purchase_id)
            .ok_or_else(|| nf("purchase", purchase_id))?;
        record.items.insert(item.item_id.clone(), item);
        Ok(())
    }

    async fn mark_purchase_distributed_if_not_already(
        &self,
        event_id: &str,
        purchase_id: &str,
    ) -> Result<bool, StoreError> {
        let mut events = self.events.write().await;
        let event = Self::event_mut(&mut events, event_id).await;
        let record = event
            .purchases
            .get_mut(purchase_id)
            .ok_or_else(|| nf("purchase", purchase_id))?;
        if record.purchase.distributed {
            return Ok(false);
        }
        record.purchase.distributed = true;
        record.purchase.distributed_at = Some(Utc::now());
        record.purchase.distribution_error = None;
        record.purchase.distribution_failed = false;
        Ok(true)
    }

    async fn mark_purchase_distribution_failed(
        &self,
        event_id: &str,
        purchase_id: &str,
        error: &str,
    ) -> Result<(), StoreError> {
        let mut events = self.events.write().await;
        let event = Self::event_mut(&mut events, event_id).await;
        let record = event
            .purchases
            .get_mut(purchase_id)
            .ok_or_else(|| nf("purchase", purchase_id))?;
        record.purchase.distribution_failed = true;
        record.purchase.distribution_error = Some(error.to_string());
        Ok(())
    }

    async fn count_open_orders(
        &self,
        event_id: &str,
        pos_id: &str,
        open_status: &str,
    ) -> Result<u64, StoreError> {
        let events = self.events.read().await;
        let event = events.get(event_id).ok_or_else(|| nf("event", event_id))?;
        let pos = event.pos.get(pos_id).ok_or_else(|| nf("pos", pos_id))?;
        Ok(pos
            .orders
            .values()
            .filter(|o| o.order.order_status.is_open(open_status))
            .count() as u64)
    }

    async fn write_distributed_order_batch(
        &self,
        event_id: &str,
        pos_id: &str,
        order: DistributedOrder,
        items: Vec<(String, DistributedOrderItem)>,
    ) -> Result<(), StoreError> {
        let mut events = self.events.write().await;
        let event = Self::event_mut(&mut events, event_id).await;
        let pos = event.pos.get_mut(pos_id).ok_or_else(|| nf("pos", pos_id))?;
        let record = pos.orders.entry(order.id.clone()).or_insert_with(OrderRecord::default);
        record.order = order;
        for (key, item) in items {
            record.items.insert(key, item);
        }
        Ok(())
    }

    async fn get_distributed_order(
        &self,
        event_id: &str,
        pos_id: &str,
        order_id: &str,
    ) -> Result<Option<DistributedOrder>, StoreError> {
        let events = self.events.read().await;
        let event = events.get(event_id).ok_or_else(|| nf("event", event_id))?;
        let pos = event.pos.get(pos_id).ok_or_else(|| nf("pos", pos_id))?;
        Ok(pos.orders.get(order_id).map(|r| r.order.clone()))
    }

    async fn list_distributed_order_items(
        &self,
        event_id: &str,
        pos_id: &str,
        order_id: &str,
    ) -> Result<Vec<(String, DistributedOrderItem)>, StoreError> {
        let events = self.events.read().await;
        let event = events.get(event_id).ok_or_else(|| nf("event", event_id))?;
        let pos = event.pos.get(pos_id).ok_or_else(|| nf("pos", pos_id))?;
        let record = pos.orders.get(order_id).ok_or_else(|| nf("order", order_id))?;
        Ok(record.items.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }

    async fn list_open_distributed_orders(
        &self,
        event_id: &str,
        pos_id: &str,
        open_status: &str,
    ) -> Result<Vec<DistributedOrder>, StoreError> {
        let events = self.events.read().await;
        let event = events.get(event_id).ok_or_else(|| nf("event", event_id))?;
        let pos = event.pos.get(pos_id).ok_or_else(|| nf("pos", pos_id))?;
        Ok(pos
            .orders
            .values()
            .filter(|o| o.order.order_status.is_open(open_status))
            .map(|o| o.order.clone())
            .collect())
    }

    async fn upsert_distributed_order(
        &self,
        event_id: &str,
        pos_id: &str,
        order: DistributedOrder,
    ) -> Result<(), StoreError> {
        let mut events = self.events.write().await;
        let event = Self::event_mut(&mut events, event_id).await;
        let pos = event.pos.get_mut(pos_id).ok_or_else(|| nf("pos", pos_id))?;
        let record = pos.orders.entry(order.id.clone()).or_insert_with(OrderRecord::default);
        record.order = order;
        Ok(())
    }

    async fn migrate_distributed_order_item(
        &self,
        event_id: &str,
        dest_pos_id: &str,
        dest_order_id: &str,
        key: &str,
        incoming: DistributedOrderItem,
        source_pos_id: &str,
        source_order_id: &str,
    ) -> Result<(), StoreError> {
        let mut events = self.events.write().await;
        let event = Self::event_mut(&mut events, event_id).await;

        let existing_count = event
            .pos
            .get(dest_pos_id)
            .and_then(|p| p.orders.get(dest_order_id))
            .and_then(|o| o.items.get(key))
            .map(|i| i.count)
            .unwrap_or(0);

        let dest_pos = event.pos.get_mut(dest_pos_id).ok_or_else(|| nf("pos", dest_pos_id))?;
        let dest_order = dest_pos
            .orders
            .get_mut(dest_order_id)
            .ok_or_else(|| nf("order", dest_order_id))?;

        let mut merged = incoming;
        merged.count += existing_count;
        dest_order.items.insert(key.to_string(), merged);

        if let Some(source_pos) = event.pos.get_mut(source_pos_id) {
            if let Some(source_order) = source_pos.orders.get_mut(source_order_id) {
                source_order.items.remove(key);
            }
        }

        Ok(())
    }

    async fn list_pos_ids_with_distributed_order(
        &self,
        event_id: &str,
        order_id: &str,
    ) -> Result<Vec<String>, StoreError> {
        let events = self.events.read().await;
        let event = events.get(event_id).ok_or_else(|| nf("event", event_id))?;
        Ok(event
            .pos
            .iter()
            .filter(|(_, rec)| rec.orders.contains_key(order_id))
            .map(|(id, _)| id.clone())
            .collect())
    }

    async fn cancel_purchase_items_by_ids(
        &self,
        event_id: &str,
        purchase_id: &str,
        item_ids: &[String],
    ) -> Result<(), StoreError> {
        let mut events = self.events.write().await;
        let event = Self::event_mut(&mut events, event_id).await;
        let record = event
            .purchases
            .get_mut(purchase_id)
            .ok_or_else(|| nf("purchase", purchase_id))?;
        for (item_id, doc) in record.items.iter_mut() {
            if item_ids.iter().any(|id| id == item_id) {
                doc.status = Some("canceled".to_string());
                doc.quantity = Some(0.0);
                doc.count = Some(0.0);
            }
        }
        Ok(())
    }

    async fn cancel_distributed_order_items_by_ids(
        &self,
        event_id: &str,
        pos_id: &str,
        order_id: &str,
        item_ids: &[String],
    ) -> Result<(), StoreError> {
        let mut events = self.events.write().await;
        let event = Self::event_mut(&mut events, event_id).await;
        let pos = event.pos.get_mut(pos_id).ok_or_else(|| nf("pos", pos_id))?;
        let record = pos.orders.get_mut(order_id).ok_or_else(|| nf("order", order_id))?;
        for item in record.items.values_mut() {
            if item_ids.iter().any(|id| id == &item.item_id) {
                item.status = LineItemStatus::Canceled;
                item.count = 0;
            }
        }
        Ok(())
    }

    async fn mark_distributed_order_items_for_canceling(
        &self,
        event_id: &str,
        pos_id: &str,
        order_id: &str,
        item_ids: &[String],
    ) -> Result<(), StoreError> {
        let mut events = self.events.write().await;
        let event = Self::event_mut(&mut events, event_id).await;
        let pos = event.pos.get_mut(pos_id).ok_or_else(|| nf("pos", pos_id))?;
        let record = pos.orders.get_mut(order_id).ok_or_else(|| nf("order", order_id))?;
        for item in record.items.values_mut() {
            if item_ids.iter().any(|id| id == &item.item_id) {
                item.status = LineItemStatus::MarkedForCanceling;
            }
        }
        Ok(())
    }

    async fn recompute_purchase_total(&self, event_id: &str, purchase_id: &str) -> Result<(), StoreError> {
        let mut events = self.events.write().await;
        let event = Self::event_mut(&mut events, event_id).await;

        let (item_ids_and_qty, prices): (Vec<(String, i64)>, HashMap<String, rust_decimal::Decimal>) = {
            let record = event
                .purchases
                .get(purchase_id)
                .ok_or_else(|| nf("purchase", purchase_id))?;
            let pairs: Vec<(String, i64)> = record
                .items
                .values()
                .filter(|doc| doc.status.as_deref() != Some("canceled"))
                .map(|doc| (doc.item_id.clone(), quantity::raw_quantity(doc)))
                .collect();
            let mut prices = HashMap::new();
            for (item_id, _) in &pairs {
                if let Some(item) = event.items.get(item_id) {
                    prices.insert(item_id.clone(), item.price);
                } else {
                    warn!(item_id = %item_id, "canonical item missing while recomputing purchase total");
                }
            }
            (pairs, prices)
        };

        let total: rust_decimal::Decimal = item_ids_and_qty
            .iter()
            .map(|(item_id, qty)| {
                prices
                    .get(item_id)
                    .copied()
                    .unwrap_or_default()
                    * rust_decimal::Decimal::from(*qty)
            })
            .sum();

        let record = event
            .purchases
            .get_mut(purchase_id)
            .ok_or_else(|| nf("purchase", purchase_id))?;
        record.purchase.total_price = Some(total);
        Ok(())
    }

    async fn find_active_notification(
        &self,
        event_id: &str,
        order_id: &str,
        action: &NotificationAction,
    ) -> Result<Option<Notification>, StoreError> {
        let events = self.events.read().await;
        let event = events.get(event_id).ok_or_else(|| nf("event", event_id))?;
        Ok(event
            .notifications
            .values()
            .find(|n| {
                n.order_id.as_deref() == Some(order_id)
                    && n.action.as_ref() == Some(action)
                    && n.status.is_non_terminal()
            })
            .cloned())
    }

    async fn insert_notification(
        &self,
        event_id: &str,
        payload: NotificationPayload,
    ) -> Result<String, StoreError> {
        let mut events = self.events.write().await;
        let event = Self::event_mut(&mut events, event_id).await;
        let seq = self.notification_seq.fetch_add(1, Ordering::SeqCst);
        let id = format!("notif_{seq}");
        let now = Utc::now();
        let notification = Notification {
            id: id.clone(),
            title: payload.title,
            message: payload.message,
            point_of_service: payload.point_of_service,
            price: payload.price,
            item_ids: payload.item_ids,
            order_id: payload.order_id,
            payment_method: payload.payment_method,
            severity: payload.severity,
            action: payload.action,
            status: payload.status,
            created_at: now,
            updated_at: now,
        };
        event.notifications.insert(id.clone(), notification);
        Ok(id)
    }

    async fn update_notification(
        &self,
        event_id: &str,
        id: &str,
        payload: NotificationPayload,
    ) -> Result<(), StoreError> {
        let mut events = self.events.write().await;
        let event = Self::event_mut(&mut events, event_id).await;
        let notification = event.notifications.get_mut(id).ok_or_else(|| nf("notification", id))?;
        notification.title = payload.title;
        notification.message = payload.message;
        notification.point_of_service = payload.point_of_service;
        notification.price = payload.price;
        notification.item_ids = payload.item_ids;
        notification.order_id = payload.order_id;
        notification.payment_method = payload.payment_method;
        notification.severity = payload.severity;
        notification.action = payload.action;
        notification.status = payload.status;
        notification.updated_at = Utc::now();
        Ok(())
    }

    async fn get_notification(&self, event_id: &str, id: &str) -> Result<Notification, StoreError> {
        let events = self.events.read().await;
        let event = events.get(event_id).ok_or_else(|| nf("event", event_id))?;
        event.notifications.get(id).cloned().ok_or_else(|| nf("notification", id))
    }
}
