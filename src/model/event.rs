use serde::{Deserialize, Serialize};

use crate::config::DistributionMode;

/// The tenant namespace: `Events/{eventId}`. The engine only
/// reads this document; lifecycle is owned externally.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EventTenant {
    pub id: String,
    #[serde(default)]
    pub distribution_mode: DistributionMode,
}

/// `Events/{eventId}/Serving-Points/{id}` — the physical destination items
/// get brought to.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ServingPoint {
    pub id: String,
    pub name: String,
    pub location: String,
    #[serde(default)]
    pub area_name: Option<String>,
    #[serde(default)]
    pub capacity: Option<u32>,
}
