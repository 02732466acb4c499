use thiserror::Error;

use crate::domain::{Cents, CustomerId};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Account already exists with number: {0}")]
    AccountAlreadyExists(String),

    #[error("Account is deleted: {0}")]
    AccountDeleted(String),

    #[error("Movement not found: {0}")]
    MovementNotFound(String),

    #[error("Customer not found: {0}")]
    CustomerNotFound(CustomerId),

    #[error("Movement value must be positive, got {0}")]
    InvalidValue(Cents),

    #[error(
        "Insufficient balance in account {account_number}: balance {balance_cents}, requested debit {requested_cents}"
    )]
    InsufficientBalance {
        account_number: String,
        balance_cents: Cents,
        requested_cents: Cents,
    },

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}
