//! In-process metrics: atomic-backed `Counter`/`Gauge`
//! primitives exposed as named statics, with no external metrics
//! dependency — the same shape the wider codebase uses, trimmed to the
//! handful of counters this engine's components actually move.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde_json::{json, Value};

#[derive(Debug, Clone)]
pub struct Counter {
    value: Arc<AtomicU64>,
}

impl Counter {
    pub fn new() -> Self {
        Self { value: Arc::new(AtomicU64::new(0)) }
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, delta: u64) {
        self.value.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

impl Default for Counter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct Gauge {
    value: Arc<AtomicU64>,
}

impl Gauge {
    pub fn new() -> Self {
        Self { value: Arc::new(AtomicU64::new(0)) }
    }

    pub fn set(&self, value: u64) {
        self.value.store(value, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

impl Default for Gauge {
    fn default() -> Self {
        Self::new()
    }
}

pub static ORDERS_DISTRIBUTED_TOTAL: Lazy<Counter> = Lazy::new(Counter::new);
pub static DISTRIBUTION_FAILURES_TOTAL: Lazy<Counter> = Lazy::new(Counter::new);
pub static ITEMS_DROPPED_UNROUTABLE_TOTAL: Lazy<Counter> = Lazy::new(Counter::new);
pub static POS_ITEMS_MIGRATED_TOTAL: Lazy<Counter> = Lazy::new(Counter::new);
pub static REFUND_NOTIFICATIONS_EMITTED_TOTAL: Lazy<Counter> = Lazy::new(Counter::new);
pub static NOTIFICATIONS_DEDUPLICATED_TOTAL: Lazy<Counter> = Lazy::new(Counter::new);

/// Renders every named counter as a flat JSON object for `/metrics/json`.
pub fn metrics_snapshot() -> Value {
    json!({
        "orders_distributed_total": ORDERS_DISTRIBUTED_TOTAL.get(),
        "distribution_failures_total": DISTRIBUTION_FAILURES_TOTAL.get(),
        "items_dropped_unroutable_total": ITEMS_DROPPED_UNROUTABLE_TOTAL.get(),
        "pos_items_migrated_total": POS_ITEMS_MIGRATED_TOTAL.get(),
        "refund_notifications_emitted_total": REFUND_NOTIFICATIONS_EMITTED_TOTAL.get(),
        "notifications_deduplicated_total": NOTIFICATIONS_DEDUPLICATED_TOTAL.get(),
    })
}
