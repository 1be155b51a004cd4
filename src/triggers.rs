//! Trigger registrations: the webhook payload shapes for the
//! four store-change feeds this engine reacts to, and their conversion into
//! the typed events each component's entrypoint expects. The HTTP wiring
//! itself lives in `crate::api`.

use serde::Deserialize;

use crate::model::Purchase;
use crate::orchestrator::PurchaseWriteEvent;
use crate::reconciler::PosItemUpdateEvent;
use crate::refund::NotificationUpdateEvent;

fn default_true() -> bool {
    true
}

/// Body of `POST /v1/triggers/purchase-write` (`onPurchaseWrite`). `after`
/// is absent on a delete — the orchestrator treats that as a no-op.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseWritePayload {
    pub event_id: String,
    pub purchase_id: String,
    #[serde(default)]
    pub before_is_paid: Option<bool>,
    #[serde(default)]
    pub after: Option<Purchase>,
}

impl From<PurchaseWritePayload> for PurchaseWriteEvent {
    fn from(p: PurchaseWritePayload) -> Self {
        PurchaseWriteEvent {
            event_id: p.event_id,
            purchase_id: p.purchase_id,
            before_is_paid: p.before_is_paid,
            after: p.after,
        }
    }
}

/// Body of `POST /v1/triggers/pos-item-update` (`onPosItemUpdate`). Absent
/// availability flags read as available, matching `PosItem` itself.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PosItemUpdatePayload {
    pub event_id: String,
    pub pos_id: String,
    pub item_id: String,
    #[serde(default = "default_true")]
    pub before_is_available: bool,
    #[serde(default = "default_true")]
    pub after_is_available: bool,
}

impl PosItemUpdatePayload {
    pub fn into_event(self, open_order_status: String) -> PosItemUpdateEvent {
        PosItemUpdateEvent {
            event_id: self.event_id,
            pos_id: self.pos_id,
            item_id: self.item_id,
            before_is_available: self.before_is_available,
            after_is_available: self.after_is_available,
            open_order_status,
        }
    }
}

/// Body of `POST /v1/triggers/notification-update` (`onNotificationUpdate`).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationUpdatePayload {
    pub event_id: String,
    pub notification_id: String,
    pub before_status: String,
    pub after_status: String,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub item_ids: Vec<String>,
}

impl From<NotificationUpdatePayload> for NotificationUpdateEvent {
    fn from(p: NotificationUpdatePayload) -> Self {
        NotificationUpdateEvent {
            event_id: p.event_id,
            notification_id: p.notification_id,
            before_status: p.before_status,
            after_status: p.after_status,
            order_id: p.order_id,
            item_ids: p.item_ids,
        }
    }
}

/// Body of `POST /v1/triggers/order-create` (`onOrderCreate`) — peripheral;
/// the cash-payment notification side channel it would otherwise drive is
/// out of scope here, so this engine only logs receipt.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreatePayload {
    pub event_id: String,
    pub order_id: String,
}
