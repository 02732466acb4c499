use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Cents, CustomerId};

pub type AccountId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccountKind {
    Savings,
    Checking,
}

impl AccountKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountKind::Savings => "SAVINGS",
            AccountKind::Checking => "CHECKING",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "SAVINGS" => Some(AccountKind::Savings),
            "CHECKING" => Some(AccountKind::Checking),
            _ => None,
        }
    }
}

impl std::fmt::Display for AccountKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle state shared by accounts and customer references. Deletion is a
/// status transition, never a physical removal; a tagged state (rather than a
/// boolean) leaves room for further states without a schema change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntityStatus {
    Active,
    Deleted,
}

impl EntityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityStatus::Active => "ACTIVE",
            EntityStatus::Deleted => "DELETED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "ACTIVE" => Some(EntityStatus::Active),
            "DELETED" => Some(EntityStatus::Deleted),
            _ => None,
        }
    }
}

impl std::fmt::Display for EntityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    /// Account number, unique per institution
    pub number: String,
    pub kind: AccountKind,
    /// Baseline balance when no movement exists yet. Set once at creation,
    /// never mutated afterwards.
    pub initial_balance_cents: Cents,
    pub status: EntityStatus,
    /// Identifier of the owning customer in the external registry
    pub customer_id: CustomerId,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(
        number: String,
        kind: AccountKind,
        initial_balance_cents: Cents,
        customer_id: CustomerId,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            number,
            kind,
            initial_balance_cents,
            status: EntityStatus::Active,
            customer_id,
            created_at: Utc::now(),
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.status == EntityStatus::Deleted
    }
}
