//! Customer lifecycle events consumed from the external registry.
//!
//! Field names follow the registry's JSON wire shape. Delivery is
//! at-least-once; consumers must stay idempotent under replay.

use serde::{Deserialize, Serialize};

use crate::domain::{CustomerId, EntityStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerCreated {
    pub customer_id: CustomerId,
    pub name: String,
    pub identification: String,
    pub status: EntityStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerUpdated {
    pub customer_id: CustomerId,
    pub name: String,
    pub identification: String,
    pub status: EntityStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDeleted {
    pub customer_id: CustomerId,
}

/// Envelope over the three lifecycle payloads, tagged with the topic each one
/// arrives on.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum CustomerEvent {
    #[serde(rename = "customer-created")]
    Created(CustomerCreated),
    #[serde(rename = "customer-updated")]
    Updated(CustomerUpdated),
    #[serde(rename = "customer-deleted")]
    Deleted(CustomerDeleted),
}

impl CustomerEvent {
    pub fn customer_id(&self) -> CustomerId {
        match self {
            CustomerEvent::Created(e) => e.customer_id,
            CustomerEvent::Updated(e) => e.customer_id,
            CustomerEvent::Deleted(e) => e.customer_id,
        }
    }
}
