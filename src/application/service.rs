use chrono::{DateTime, Utc};
use tracing::error;

use crate::domain::{
    verify_history, Account, AccountId, AccountKind, BalanceMismatch, Cents, CustomerId,
    CustomerReference, EntityStatus, Movement, MovementId, MovementKind,
};
use crate::storage::{RegisterOutcome, Repository};

use super::{account_key, AppError, CustomerSync, Statement, StatementCustomer, StatementLine};

/// Application service providing high-level operations for the ledger.
/// This is the primary interface for any client (CLI, API, event feed).
pub struct LedgerService {
    repo: Repository,
}

/// A movement together with the owning account's number for display.
#[derive(Debug)]
pub struct MovementRecord {
    pub movement: Movement,
    pub account_number: String,
}

/// Caller-shaped movement for the generic create/update paths. Unlike
/// `register_movement`, the resulting balance is supplied, not derived.
#[derive(Debug)]
pub struct MovementDraft {
    pub account_id: AccountId,
    pub kind: MovementKind,
    pub value_cents: Cents,
    pub timestamp: DateTime<Utc>,
    pub balance_cents: Cents,
}

/// An account's effective balance: the latest movement's stored balance, or
/// the initial balance when no movement exists.
#[derive(Debug)]
pub struct BalanceEntry {
    pub account: Account,
    pub balance_cents: Cents,
}

/// Replay result for one account's stored balance chain.
#[derive(Debug)]
pub struct AccountIntegrity {
    pub account: Account,
    pub mismatches: Vec<BalanceMismatch>,
}

impl LedgerService {
    /// Create a new ledger service with the given repository.
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Ok(Self::new(repo))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::new(repo))
    }

    /// Sync handler set sharing this service's store.
    pub fn customer_sync(&self) -> CustomerSync {
        CustomerSync::new(self.repo.clone())
    }

    // ========================
    // Account operations
    // ========================

    /// Open a new account. The initial balance is its baseline until the
    /// first movement is registered.
    pub async fn create_account(
        &self,
        number: String,
        kind: AccountKind,
        initial_balance_cents: Cents,
        customer_id: CustomerId,
    ) -> Result<Account, AppError> {
        if self.repo.get_account_by_number(&number).await?.is_some() {
            return Err(AppError::AccountAlreadyExists(number));
        }

        let account = Account::new(number, kind, initial_balance_cents, customer_id);
        self.repo.save_account(&account).await?;
        Ok(account)
    }

    /// Get an account by ID.
    pub async fn get_account(&self, id: AccountId) -> Result<Account, AppError> {
        self.repo
            .get_account(id)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(id.to_string()))
    }

    /// Change an account's number and kind. Deleted accounts stay readable
    /// but reject any further update.
    pub async fn update_account(
        &self,
        id: AccountId,
        number: String,
        kind: AccountKind,
    ) -> Result<Account, AppError> {
        let mut account = self.get_account(id).await?;

        if account.is_deleted() {
            error!(account_id = %id, "update rejected, account is deleted");
            return Err(AppError::AccountDeleted(id.to_string()));
        }

        if number != account.number
            && self.repo.get_account_by_number(&number).await?.is_some()
        {
            return Err(AppError::AccountAlreadyExists(number));
        }

        account.number = number;
        account.kind = kind;
        self.repo.update_account(&account).await?;
        Ok(account)
    }

    /// Soft-delete an account: flips the status flag and keeps the movement
    /// history intact.
    pub async fn delete_account(&self, id: AccountId) -> Result<Account, AppError> {
        let mut account = self.get_account(id).await?;
        account.status = EntityStatus::Deleted;
        self.repo.update_account(&account).await?;
        Ok(account)
    }

    /// List a customer's ACTIVE accounts.
    pub async fn list_accounts(&self, customer_id: CustomerId) -> Result<Vec<Account>, AppError> {
        Ok(self.repo.list_active_accounts_by_customer(customer_id).await?)
    }

    // ========================
    // Balance resolution
    // ========================

    /// The most recent movement's stored balance, or None when the account
    /// has no movements yet. Callers fall back to the initial balance.
    pub async fn current_balance(&self, account_id: AccountId) -> Result<Option<Cents>, AppError> {
        Ok(self.repo.latest_balance(account_id).await?)
    }

    /// The account together with its effective balance.
    pub async fn resolve_balance(&self, account_id: AccountId) -> Result<BalanceEntry, AppError> {
        let account = self.get_account(account_id).await?;
        let balance_cents = self
            .repo
            .latest_balance(account_id)
            .await?
            .unwrap_or(account.initial_balance_cents);
        Ok(BalanceEntry {
            account,
            balance_cents,
        })
    }

    // ========================
    // Movement operations
    // ========================

    /// Register a credit or debit against an account. The new balance is
    /// derived from the latest stored balance (or the initial balance) inside
    /// a single storage transaction, and the ledger never persists a negative
    /// balance.
    pub async fn register_movement(
        &self,
        account_id: AccountId,
        kind: MovementKind,
        value_cents: Cents,
    ) -> Result<MovementRecord, AppError> {
        if value_cents <= 0 {
            error!(value = value_cents, "movement value is not positive");
            return Err(AppError::InvalidValue(value_cents));
        }

        let account = self.get_account(account_id).await?;
        if account.is_deleted() {
            error!(account_id = %account_id, "registration rejected, account is deleted");
            return Err(AppError::AccountDeleted(account_id.to_string()));
        }

        let outcome = self
            .repo
            .register_movement(&account, kind, value_cents, Utc::now())
            .await?;

        match outcome {
            RegisterOutcome::Registered(movement) => Ok(MovementRecord {
                movement,
                account_number: account.number,
            }),
            RegisterOutcome::InsufficientBalance { balance_cents } => {
                error!(
                    account_number = %account.number,
                    balance = balance_cents,
                    requested = value_cents,
                    "debit would drive balance negative"
                );
                Err(AppError::InsufficientBalance {
                    account_number: account.number,
                    balance_cents,
                    requested_cents: value_cents,
                })
            }
        }
    }

    /// Generic create: persists the draft as-is, caller-supplied resulting
    /// balance included. This is the lower-level primitive beneath
    /// `register_movement`; it validates the value but does not re-derive the
    /// balance.
    pub async fn create_movement(&self, draft: MovementDraft) -> Result<MovementRecord, AppError> {
        if draft.value_cents <= 0 {
            error!(value = draft.value_cents, "movement value is not positive");
            return Err(AppError::InvalidValue(draft.value_cents));
        }

        let account = self.get_account(draft.account_id).await?;

        let mut movement = Movement::new(
            draft.account_id,
            draft.kind,
            draft.value_cents,
            draft.timestamp,
            draft.balance_cents,
        );
        self.repo.save_movement(&mut movement).await?;

        Ok(MovementRecord {
            movement,
            account_number: account.number,
        })
    }

    /// Replace an existing movement wholesale under the same identifier.
    pub async fn update_movement(
        &self,
        id: MovementId,
        draft: MovementDraft,
    ) -> Result<MovementRecord, AppError> {
        let (existing, _) = self
            .repo
            .get_movement_with_account(id)
            .await?
            .ok_or_else(|| AppError::MovementNotFound(id.to_string()))?;

        let account = self.get_account(draft.account_id).await?;

        let movement = Movement {
            id: existing.id,
            sequence: existing.sequence,
            kind: draft.kind,
            value_cents: draft.value_cents,
            timestamp: draft.timestamp,
            balance_cents: draft.balance_cents,
            account_id: draft.account_id,
        };
        self.repo.update_movement(&movement).await?;

        Ok(MovementRecord {
            movement,
            account_number: account.number,
        })
    }

    /// Get a movement by ID.
    pub async fn get_movement(&self, id: MovementId) -> Result<MovementRecord, AppError> {
        let (movement, account_number) = self
            .repo
            .get_movement_with_account(id)
            .await?
            .ok_or_else(|| AppError::MovementNotFound(id.to_string()))?;
        Ok(MovementRecord {
            movement,
            account_number,
        })
    }

    /// List all movements in insertion order.
    pub async fn list_movements(&self) -> Result<Vec<MovementRecord>, AppError> {
        let rows = self.repo.list_movements_with_account().await?;
        Ok(rows
            .into_iter()
            .map(|(movement, account_number)| MovementRecord {
                movement,
                account_number,
            })
            .collect())
    }

    /// Remove a movement. Later movements keep their stored balances as they
    /// are; `check_integrity` will surface the resulting gap in the chain.
    pub async fn delete_movement(&self, id: MovementId) -> Result<(), AppError> {
        if self.repo.get_movement_with_account(id).await?.is_none() {
            error!(movement_id = %id, "delete rejected, movement not found");
            return Err(AppError::MovementNotFound(id.to_string()));
        }
        self.repo.delete_movement(id).await?;
        Ok(())
    }

    // ========================
    // Statements
    // ========================

    /// Look up a customer in the local projection.
    pub async fn customer_reference(
        &self,
        customer_id: CustomerId,
    ) -> Result<CustomerReference, AppError> {
        self.repo
            .get_customer_reference(customer_id)
            .await?
            .ok_or(AppError::CustomerNotFound(customer_id))
    }

    /// Build a per-account statement for the customer over the inclusive date
    /// range. Movements are read back with their stored balances; a range
    /// with no movements yields empty lists, not an error.
    pub async fn account_statement(
        &self,
        customer_id: CustomerId,
        from_date: DateTime<Utc>,
        to_date: DateTime<Utc>,
    ) -> Result<Statement, AppError> {
        let customer = self.customer_reference(customer_id).await?;

        let accounts = self.repo.list_active_accounts_by_customer(customer_id).await?;

        let mut grouped = indexmap::IndexMap::new();
        for account in &accounts {
            let lines = self
                .repo
                .list_movements_in_range(account.id, from_date, to_date)
                .await?
                .into_iter()
                .map(|m| StatementLine {
                    kind: m.kind,
                    value_cents: m.value_cents,
                    timestamp: m.timestamp,
                    balance_cents: m.balance_cents,
                })
                .collect();
            grouped.insert(account_key(&account.number, account.kind), lines);
        }

        Ok(Statement {
            customer: StatementCustomer {
                id: customer.id,
                name: customer.name,
                identification: customer.identification,
                status: customer.status,
            },
            from_date,
            to_date,
            accounts: grouped,
        })
    }

    // ========================
    // Integrity
    // ========================

    /// Replay every account's movement history against its initial balance
    /// and report accounts whose stored balance chain no longer adds up
    /// (typically after a historical movement was deleted).
    pub async fn check_integrity(&self) -> Result<Vec<AccountIntegrity>, AppError> {
        let accounts = self.repo.list_accounts().await?;
        let mut reports = Vec::new();

        for account in accounts {
            let movements = self.repo.list_movements_for_account(account.id).await?;
            let mismatches = verify_history(account.initial_balance_cents, &movements);
            if !mismatches.is_empty() {
                reports.push(AccountIntegrity {
                    account,
                    mismatches,
                });
            }
        }

        Ok(reports)
    }
}
