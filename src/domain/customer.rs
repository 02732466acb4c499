use serde::{Deserialize, Serialize};

use super::EntityStatus;

/// Customers are minted by the external registry, which uses integer
/// identifiers; the ledger never allocates one.
pub type CustomerId = i64;

/// Local read-only projection of a registry customer. Rows are created,
/// overwritten, and soft-deleted exclusively by lifecycle events; the
/// projection may be transiently stale or absent and is never treated as the
/// source of truth's absence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerReference {
    pub id: CustomerId,
    pub name: String,
    /// National identification code from the registry
    pub identification: String,
    pub status: EntityStatus,
}

impl CustomerReference {
    pub fn is_deleted(&self) -> bool {
        self.status == EntityStatus::Deleted
    }
}
