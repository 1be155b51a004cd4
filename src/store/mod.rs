//! The Store Gateway: the only component that talks to the
//! document store directly. Every other component depends on the
//! [`DocumentStore`] trait, never on a concrete backend, the same way
//! `stateset-api`'s repositories depend on `DatabaseConnection` rather than
//! a specific driver.
//!
//! This crate ships one implementation, [`memory::MemoryStore`] — a
//! process-local stand-in for a Firestore-class store. It gives every other
//! component in this crate deterministic, network-free tests, and its
//! locking model is documented inline as a simplification, not a claim
//! about how a real multi-document-transaction store behaves.

pub mod memory;

use async_trait::async_trait;

use crate::errors::StoreError;
use crate::model::{
    CanonicalItem, DistributedOrder, DistributedOrderItem, EventTenant, Notification,
    NotificationAction, NotificationPayload, PointOfSale, PosItem, Purchase, PurchaseItemDoc,
    ServingPoint,
};

/// Typed operations over the collection paths this engine reads and writes.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get_event(&self, event_id: &str) -> Result<EventTenant, StoreError>;

    /// Returns POS sorted by id ascending — the deterministic enumeration
    /// order reproducible tie-breaks depend on.
    async fn list_pos(&self, event_id: &str) -> Result<Vec<PointOfSale>, StoreError>;

    async fn list_pos_items(&self, event_id: &str, pos_id: &str) -> Result<Vec<PosItem>, StoreError>;

    async fn get_pos_item(
        &self,
        event_id: &str,
        pos_id: &str,
        item_id: &str,
    ) -> Result<Option<PosItem>, StoreError>;

    async fn get_serving_point(&self, event_id: &str, id: &str) -> Result<ServingPoint, StoreError>;

    async fn get_canonical_item(&self, event_id: &str, item_id: &str) -> Result<CanonicalItem, StoreError>;

    async fn set_canonical_item_availability(
        &self,
        event_id: &str,
        item_id: &str,
        available: bool,
    ) -> Result<(), StoreError>;

    async fn list_purchase_items(
        &self,
        event_id: &str,
        purchase_id: &str,
    ) -> Result<Vec<PurchaseItemDoc>, StoreError>;

    async fn get_purchase(&self, event_id: &str, purchase_id: &str) -> Result<Purchase, StoreError>;

    /// Creates a brand-new purchase document (the `distributeOrder` RPC
    /// path generates the id itself).
    async fn create_purchase(&self, event_id: &str, purchase: Purchase) -> Result<(), StoreError>;

    /// Writes one purchase-item document under a purchase the caller just
    /// created — the RPC path denormalizes its request items onto the
    /// purchase's *items* sub-collection instead of reading them back from
    /// an external writer.
    async fn create_purchase_item(
        &self,
        event_id: &str,
        purchase_id: &str,
        item: PurchaseItemDoc,
    ) -> Result<(), StoreError>;

    /// Atomically sets `{distributed: true, distributedAt: now}` iff the
    /// purchase isn't already distributed, returning whether the write
    /// happened. Backs the orchestrator's at-most-once guard.
    async fn mark_purchase_distributed_if_not_already(
        &self,
        event_id: &str,
        purchase_id: &str,
    ) -> Result<bool, StoreError>;

    async fn mark_purchase_distribution_failed(
        &self,
        event_id: &str,
        purchase_id: &str,
        error: &str,
    ) -> Result<(), StoreError>;

    /// `CountOpenOrders`: filtered count of distributed orders at `pos_id`
    /// whose `orderStatus` equals `open_status`.
    async fn count_open_orders(
        &self,
        event_id: &str,
        pos_id: &str,
        open_status: &str,
    ) -> Result<u64, StoreError>;

    /// Materializes one distributed order and its grouped line items in a
    /// single atomic write.
    async fn write_distributed_order_batch(
        &self,
        event_id: &str,
        pos_id: &str,
        order: DistributedOrder,
        items: Vec<(String, DistributedOrderItem)>,
    ) -> Result<(), StoreError>;

    async fn get_distributed_order(
        &self,
        event_id: &str,
        pos_id: &str,
        order_id: &str,
    ) -> Result<Option<DistributedOrder>, StoreError>;

    async fn list_distributed_order_items(
        &self,
        event_id: &str,
        pos_id: &str,
        order_id: &str,
    ) -> Result<Vec<(String, DistributedOrderItem)>, StoreError>;

    async fn list_open_distributed_orders(
        &self,
        event_id: &str,
        pos_id: &str,
        open_status: &str,
    ) -> Result<Vec<DistributedOrder>, StoreError>;

    async fn upsert_distributed_order(
        &self,
        event_id: &str,
        pos_id: &str,
        order: DistributedOrder,
    ) -> Result<(), StoreError>;

    /// Merges destination item counts transactionally against concurrent
    /// writers and deletes the source in the same transaction. `source` is
    /// `None` when there's nothing to delete (the item didn't already exist
    /// at the destination under a different key).
    async fn migrate_distributed_order_item(
        &self,
        event_id: &str,
        dest_pos_id: &str,
        dest_order_id: &str,
        key: &str,
        incoming: DistributedOrderItem,
        source_pos_id: &str,
        source_order_id: &str,
    ) -> Result<(), StoreError>;

    async fn list_pos_ids_with_distributed_order(
        &self,
        event_id: &str,
        order_id: &str,
    ) -> Result<Vec<String>, StoreError>;

    /// Merges `{status: "canceled", quantity: 0}` onto every purchase-item
    /// whose `itemId` is in `item_ids`.
    async fn cancel_purchase_items_by_ids(
        &self,
        event_id: &str,
        purchase_id: &str,
        item_ids: &[String],
    ) -> Result<(), StoreError>;

    /// Same, scoped to one POS's distributed-order copy.
    async fn cancel_distributed_order_items_by_ids(
        &self,
        event_id: &str,
        pos_id: &str,
        order_id: &str,
        item_ids: &[String],
    ) -> Result<(), StoreError>;

    /// Merge-writes `{status: "marked_for_canceling"}` onto every matching
    /// line item with no quantity change — a holding state, distinct from
    /// [`Self::cancel_distributed_order_items_by_ids`], which also zeroes
    /// `count` for the refund propagator's terminal cancellation.
    async fn mark_distributed_order_items_for_canceling(
        &self,
        event_id: &str,
        pos_id: &str,
        order_id: &str,
        item_ids: &[String],
    ) -> Result<(), StoreError>;

    /// Recomputes and persists `totalPrice` from non-canceled purchase
    /// items joined against catalog price.
    async fn recompute_purchase_total(&self, event_id: &str, purchase_id: &str) -> Result<(), StoreError>;

    async fn find_active_notification(
        &self,
        event_id: &str,
        order_id: &str,
        action: &NotificationAction,
    ) -> Result<Option<Notification>, StoreError>;

    async fn insert_notification(
        &self,
        event_id: &str,
        payload: NotificationPayload,
    ) -> Result<String, StoreError>;

    async fn update_notification(
        &self,
        event_id: &str,
        id: &str,
        payload: NotificationPayload,
    ) -> Result<(), StoreError>;

    async fn get_notification(&self, event_id: &str, id: &str) -> Result<Notification, StoreError>;
}
