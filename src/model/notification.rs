use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Severity of a notification.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// What a notification is asking the reader to do. Only `Refund` is acted
/// on by this engine (the refund propagator); other actions pass
/// through untouched for whatever downstream consumer cares about them.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationAction {
    Refund,
    Other(String),
}

/// `status` on a notification document.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    Created,
    InProgress,
    Resolved,
}

impl NotificationStatus {
    pub fn is_non_terminal(&self) -> bool {
        matches!(self, NotificationStatus::Created | NotificationStatus::InProgress)
    }
}

/// `Events/{eventId}/Notifications/{id}`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub id: String,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub point_of_service: Option<String>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub item_ids: Vec<String>,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
    pub severity: Severity,
    #[serde(default)]
    pub action: Option<NotificationAction>,
    pub status: NotificationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload supplied to `NotificationService::create_notification` —
/// everything but the id, which the store assigns.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct NotificationPayload {
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub point_of_service: Option<String>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub item_ids: Vec<String>,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
    pub severity: Severity,
    #[serde(default)]
    pub action: Option<NotificationAction>,
    pub status: NotificationStatus,
}
