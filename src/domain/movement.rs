use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AccountId, Cents};

pub type MovementId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MovementKind {
    Credit,
    Debit,
}

impl MovementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Credit => "CREDIT",
            MovementKind::Debit => "DEBIT",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "CREDIT" => Some(MovementKind::Credit),
            "DEBIT" => Some(MovementKind::Debit),
            _ => None,
        }
    }
}

impl std::fmt::Display for MovementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single credit or debit against an account. Movements are immutable once
/// recorded; an update replaces the record wholesale under the same id, and
/// the stored resulting balance is never recomputed afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movement {
    pub id: MovementId,
    /// Monotonically increasing insertion counter; breaks timestamp ties when
    /// ordering history
    pub sequence: i64,
    pub kind: MovementKind,
    /// Magnitude in cents, always positive; direction is carried by `kind`
    pub value_cents: Cents,
    pub timestamp: DateTime<Utc>,
    /// Account balance after this movement, fixed at insertion time
    pub balance_cents: Cents,
    pub account_id: AccountId,
}

impl Movement {
    /// Create a new movement. Sequence number must be assigned by the repository.
    pub fn new(
        account_id: AccountId,
        kind: MovementKind,
        value_cents: Cents,
        timestamp: DateTime<Utc>,
        balance_cents: Cents,
    ) -> Self {
        assert!(value_cents > 0, "Movement value must be positive");
        Self {
            id: Uuid::new_v4(),
            sequence: 0, // Will be set by repository
            kind,
            value_cents,
            timestamp,
            balance_cents,
            account_id,
        }
    }
}

/// Apply a movement's signed value to a base balance.
pub fn next_balance(base: Cents, kind: MovementKind, value_cents: Cents) -> Cents {
    match kind {
        MovementKind::Credit => base + value_cents,
        MovementKind::Debit => base - value_cents,
    }
}

/// A stored resulting balance that disagrees with the balance replayed from
/// the movements before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceMismatch {
    pub movement_id: MovementId,
    pub sequence: i64,
    pub expected_cents: Cents,
    pub stored_cents: Cents,
}

/// Replay a movement history from the initial balance and report every stored
/// balance that no longer matches. Deleting a historical movement leaves later
/// stored balances untouched, so a non-empty result is expected after such a
/// delete.
pub fn verify_history(initial_balance_cents: Cents, movements: &[Movement]) -> Vec<BalanceMismatch> {
    let mut mismatches = Vec::new();
    let mut balance = initial_balance_cents;

    for movement in movements {
        balance = next_balance(balance, movement.kind, movement.value_cents);
        if movement.balance_cents != balance {
            mismatches.push(BalanceMismatch {
                movement_id: movement.id,
                sequence: movement.sequence,
                expected_cents: balance,
                stored_cents: movement.balance_cents,
            });
            // Later movements are judged against their own stored chain
            balance = movement.balance_cents;
        }
    }

    mismatches
}
