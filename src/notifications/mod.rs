//! Notification Service: deduplicated write of notification
//! documents keyed by `(orderId, action, status ∈ {created, in_progress})`.

use tracing::instrument;

use crate::errors::EngineError;
use crate::metrics;
use crate::model::NotificationPayload;
use crate::store::DocumentStore;

/// `CreateNotification(eventId, payload)`. Returns the id of the
/// notification document that now holds `payload` — either a freshly
/// inserted one or the existing non-terminal match that was updated.
#[instrument(skip(store, payload), fields(event_id = %event_id))]
pub async fn create_notification(
    store: &dyn DocumentStore,
    event_id: &str,
    payload: NotificationPayload,
) -> Result<String, EngineError> {
    if event_id.is_empty() {
        return Err(EngineError::InvalidRequest("eventId is required".to_string()));
    }
    if payload.title.is_empty() || payload.message.is_empty() {
        return Err(EngineError::InvalidRequest("title and message are required".to_string()));
    }

    if let Some(order_id) = payload.order_id.clone() {
        if let Some(action) = &payload.action {
            if let Some(existing) = store.find_active_notification(event_id, &order_id, action).await? {
                store.update_notification(event_id, &existing.id, payload).await?;
                metrics::NOTIFICATIONS_DEDUPLICATED_TOTAL.inc();
                return Ok(existing.id);
            }
        }
    }

    let id = store.insert_notification(event_id, payload).await?;
    Ok(id)
}
