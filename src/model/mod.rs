//! Data model for the order distribution and availability engine.
//!
//! Every entity here is a plain, `serde`-round-trippable struct mirroring a
//! document under this engine's collection paths. None of these types
//! know how to read or write themselves — that's the Store Gateway's job
//! (`crate::store`).

pub mod distributed_order;
pub mod event;
pub mod item;
pub mod notification;
pub mod pos;
pub mod purchase;

pub use distributed_order::{DistributedOrder, DistributedOrderItem, LineItemStatus, OrderStatus};
pub use event::{EventTenant, ServingPoint};
pub use item::CanonicalItem;
pub use notification::{
    Notification, NotificationAction, NotificationPayload, NotificationStatus, Severity,
};
pub use pos::{PointOfSale, PosItem};
pub use purchase::{CanonicalLineItem, Purchase, PurchaseItemDoc, PurchaseItemEntry};
