use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::domain::{AccountKind, Cents, CustomerId, EntityStatus, MovementKind};

/// Customer identity block of a statement, taken from the local projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementCustomer {
    pub id: CustomerId,
    pub name: String,
    pub identification: String,
    pub status: EntityStatus,
}

/// One movement row of a statement, read back exactly as stored — balances
/// are never re-derived here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementLine {
    pub kind: MovementKind,
    pub value_cents: Cents,
    pub timestamp: DateTime<Utc>,
    pub balance_cents: Cents,
}

/// Per-customer, per-period grouping of account movements. Accounts are keyed
/// by `"{number}-{kind}"` and kept in discovery order; an account with no
/// movements in the period maps to an empty list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Statement {
    pub customer: StatementCustomer,
    pub from_date: DateTime<Utc>,
    pub to_date: DateTime<Utc>,
    pub accounts: IndexMap<String, Vec<StatementLine>>,
}

/// Statement grouping key for an account.
pub fn account_key(number: &str, kind: AccountKind) -> String {
    format!("{}-{}", number, kind)
}
