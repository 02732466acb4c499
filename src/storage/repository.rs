use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::domain::{
    next_balance, Account, AccountId, AccountKind, Cents, CustomerId, CustomerReference,
    EntityStatus, Movement, MovementId, MovementKind,
};

use super::MIGRATION_001_INITIAL;

/// Outcome of an atomic movement registration.
pub enum RegisterOutcome {
    Registered(Movement),
    /// The debit would have driven the balance negative; nothing was written.
    InsufficientBalance { balance_cents: Cents },
}

/// Repository for persisting and querying accounts, movements, and the
/// customer reference projection.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given path.
    /// Creates the database file if it doesn't exist.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;

        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    // ========================
    // Account operations
    // ========================

    /// Save a new account to the database.
    pub async fn save_account(&self, account: &Account) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO accounts (id, number, kind, initial_balance_cents, status, customer_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(account.id.to_string())
        .bind(&account.number)
        .bind(account.kind.as_str())
        .bind(account.initial_balance_cents)
        .bind(account.status.as_str())
        .bind(account.customer_id)
        .bind(account.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save account")?;
        Ok(())
    }

    /// Overwrite an account's mutable fields. The initial balance and the
    /// creation instant are fixed at creation and deliberately not part of
    /// this statement.
    pub async fn update_account(&self, account: &Account) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE accounts
            SET number = ?, kind = ?, status = ?, customer_id = ?
            WHERE id = ?
            "#,
        )
        .bind(&account.number)
        .bind(account.kind.as_str())
        .bind(account.status.as_str())
        .bind(account.customer_id)
        .bind(account.id.to_string())
        .execute(&self.pool)
        .await
        .context("Failed to update account")?;
        Ok(())
    }

    /// Get an account by ID.
    pub async fn get_account(&self, id: AccountId) -> Result<Option<Account>> {
        let row = sqlx::query(
            r#"
            SELECT id, number, kind, initial_balance_cents, status, customer_id, created_at
            FROM accounts
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch account")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_account(&row)?)),
            None => Ok(None),
        }
    }

    /// Get an account by its account number.
    pub async fn get_account_by_number(&self, number: &str) -> Result<Option<Account>> {
        let row = sqlx::query(
            r#"
            SELECT id, number, kind, initial_balance_cents, status, customer_id, created_at
            FROM accounts
            WHERE number = ?
            "#,
        )
        .bind(number)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch account by number")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_account(&row)?)),
            None => Ok(None),
        }
    }

    /// List every account regardless of status, ordered by number.
    pub async fn list_accounts(&self) -> Result<Vec<Account>> {
        let rows = sqlx::query(
            r#"
            SELECT id, number, kind, initial_balance_cents, status, customer_id, created_at
            FROM accounts
            ORDER BY number
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list accounts")?;

        rows.iter().map(Self::row_to_account).collect()
    }

    /// List a customer's ACTIVE accounts in creation order.
    pub async fn list_active_accounts_by_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<Account>> {
        let rows = sqlx::query(
            r#"
            SELECT id, number, kind, initial_balance_cents, status, customer_id, created_at
            FROM accounts
            WHERE customer_id = ? AND status = 'ACTIVE'
            ORDER BY created_at, number
            "#,
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list accounts for customer")?;

        rows.iter().map(Self::row_to_account).collect()
    }

    fn row_to_account(row: &sqlx::sqlite::SqliteRow) -> Result<Account> {
        let id_str: String = row.get("id");
        let kind_str: String = row.get("kind");
        let status_str: String = row.get("status");
        let created_at_str: String = row.get("created_at");

        Ok(Account {
            id: Uuid::parse_str(&id_str).context("Invalid account ID")?,
            number: row.get("number"),
            kind: AccountKind::from_str(&kind_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid account kind: {}", kind_str))?,
            initial_balance_cents: row.get("initial_balance_cents"),
            status: EntityStatus::from_str(&status_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid account status: {}", status_str))?,
            customer_id: row.get("customer_id"),
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .context("Invalid created_at timestamp")?
                .with_timezone(&Utc),
        })
    }

    // ========================
    // Movement operations
    // ========================

    /// Atomically resolve the account's latest balance, apply the movement,
    /// and persist it. The balance read and the insert share one transaction:
    /// two concurrent registrations against the same account must not both
    /// observe the same base balance.
    pub async fn register_movement(
        &self,
        account: &Account,
        kind: MovementKind,
        value_cents: Cents,
        timestamp: DateTime<Utc>,
    ) -> Result<RegisterOutcome> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin registration transaction")?;

        let row = sqlx::query(
            r#"
            SELECT balance_cents
            FROM movements
            WHERE account_id = ?
            ORDER BY timestamp DESC, sequence DESC
            LIMIT 1
            "#,
        )
        .bind(account.id.to_string())
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to fetch latest balance")?;

        let base: Cents = row
            .map(|r| r.get("balance_cents"))
            .unwrap_or(account.initial_balance_cents);

        let next = next_balance(base, kind, value_cents);
        if next < 0 {
            tx.rollback()
                .await
                .context("Failed to roll back registration transaction")?;
            return Ok(RegisterOutcome::InsufficientBalance {
                balance_cents: base,
            });
        }

        let sequence: i64 = sqlx::query(
            r#"
            UPDATE sequence_counter
            SET value = value + 1
            WHERE name = 'movement_sequence'
            RETURNING value
            "#,
        )
        .fetch_one(&mut *tx)
        .await
        .context("Failed to get next sequence number")?
        .get("value");

        let mut movement = Movement::new(account.id, kind, value_cents, timestamp, next);
        movement.sequence = sequence;

        sqlx::query(
            r#"
            INSERT INTO movements (id, sequence, kind, value_cents, timestamp, balance_cents, account_id)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(movement.id.to_string())
        .bind(movement.sequence)
        .bind(movement.kind.as_str())
        .bind(movement.value_cents)
        .bind(movement.timestamp.to_rfc3339())
        .bind(movement.balance_cents)
        .bind(movement.account_id.to_string())
        .execute(&mut *tx)
        .await
        .context("Failed to save movement")?;

        tx.commit()
            .await
            .context("Failed to commit registration transaction")?;

        Ok(RegisterOutcome::Registered(movement))
    }

    /// Save a new movement as given, resulting balance included.
    /// Automatically assigns the next sequence number.
    pub async fn save_movement(&self, movement: &mut Movement) -> Result<()> {
        let sequence = self.next_sequence().await?;
        movement.sequence = sequence;

        sqlx::query(
            r#"
            INSERT INTO movements (id, sequence, kind, value_cents, timestamp, balance_cents, account_id)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(movement.id.to_string())
        .bind(movement.sequence)
        .bind(movement.kind.as_str())
        .bind(movement.value_cents)
        .bind(movement.timestamp.to_rfc3339())
        .bind(movement.balance_cents)
        .bind(movement.account_id.to_string())
        .execute(&self.pool)
        .await
        .context("Failed to save movement")?;

        Ok(())
    }

    /// Replace an existing movement wholesale. The insertion sequence is kept:
    /// a replacement is not a new insertion and must not move past later
    /// movements in tie-breaking.
    pub async fn update_movement(&self, movement: &Movement) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE movements
            SET kind = ?, value_cents = ?, timestamp = ?, balance_cents = ?, account_id = ?
            WHERE id = ?
            "#,
        )
        .bind(movement.kind.as_str())
        .bind(movement.value_cents)
        .bind(movement.timestamp.to_rfc3339())
        .bind(movement.balance_cents)
        .bind(movement.account_id.to_string())
        .bind(movement.id.to_string())
        .execute(&self.pool)
        .await
        .context("Failed to update movement")?;
        Ok(())
    }

    /// Get the next sequence number and increment the counter.
    async fn next_sequence(&self) -> Result<i64> {
        let row = sqlx::query(
            r#"
            UPDATE sequence_counter
            SET value = value + 1
            WHERE name = 'movement_sequence'
            RETURNING value
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .context("Failed to get next sequence number")?;

        Ok(row.get("value"))
    }

    /// Get a movement by ID, with the owning account's number attached.
    pub async fn get_movement_with_account(
        &self,
        id: MovementId,
    ) -> Result<Option<(Movement, String)>> {
        let row = sqlx::query(
            r#"
            SELECT m.id, m.sequence, m.kind, m.value_cents, m.timestamp, m.balance_cents,
                   m.account_id, a.number
            FROM movements m
            JOIN accounts a ON a.id = m.account_id
            WHERE m.id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch movement")?;

        match row {
            Some(row) => {
                let movement = Self::row_to_movement(&row)?;
                let number: String = row.get("number");
                Ok(Some((movement, number)))
            }
            None => Ok(None),
        }
    }

    /// List all movements with account numbers attached, ordered by sequence.
    pub async fn list_movements_with_account(&self) -> Result<Vec<(Movement, String)>> {
        let rows = sqlx::query(
            r#"
            SELECT m.id, m.sequence, m.kind, m.value_cents, m.timestamp, m.balance_cents,
                   m.account_id, a.number
            FROM movements m
            JOIN accounts a ON a.id = m.account_id
            ORDER BY m.sequence
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list movements")?;

        rows.iter()
            .map(|row| {
                let movement = Self::row_to_movement(row)?;
                let number: String = row.get("number");
                Ok((movement, number))
            })
            .collect()
    }

    /// List an account's full movement history in balance-chain order.
    pub async fn list_movements_for_account(&self, account_id: AccountId) -> Result<Vec<Movement>> {
        let rows = sqlx::query(
            r#"
            SELECT id, sequence, kind, value_cents, timestamp, balance_cents, account_id
            FROM movements
            WHERE account_id = ?
            ORDER BY timestamp, sequence
            "#,
        )
        .bind(account_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list movements for account")?;

        rows.iter().map(Self::row_to_movement).collect()
    }

    /// List an account's movements inside the inclusive time range, ascending.
    pub async fn list_movements_in_range(
        &self,
        account_id: AccountId,
        from_date: DateTime<Utc>,
        to_date: DateTime<Utc>,
    ) -> Result<Vec<Movement>> {
        let rows = sqlx::query(
            r#"
            SELECT id, sequence, kind, value_cents, timestamp, balance_cents, account_id
            FROM movements
            WHERE account_id = ? AND timestamp >= ? AND timestamp <= ?
            ORDER BY timestamp, sequence
            "#,
        )
        .bind(account_id.to_string())
        .bind(from_date.to_rfc3339())
        .bind(to_date.to_rfc3339())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list movements in range")?;

        rows.iter().map(Self::row_to_movement).collect()
    }

    /// The latest movement's stored balance for an account, or None when the
    /// account has no movements yet. Ordered by timestamp with the insertion
    /// sequence breaking ties.
    pub async fn latest_balance(&self, account_id: AccountId) -> Result<Option<Cents>> {
        let row = sqlx::query(
            r#"
            SELECT balance_cents
            FROM movements
            WHERE account_id = ?
            ORDER BY timestamp DESC, sequence DESC
            LIMIT 1
            "#,
        )
        .bind(account_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch latest balance")?;

        Ok(row.map(|r| r.get("balance_cents")))
    }

    /// Delete a movement row. Later movements' stored balances are left as
    /// they are.
    pub async fn delete_movement(&self, id: MovementId) -> Result<()> {
        sqlx::query("DELETE FROM movements WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to delete movement")?;
        Ok(())
    }

    fn row_to_movement(row: &sqlx::sqlite::SqliteRow) -> Result<Movement> {
        let id_str: String = row.get("id");
        let kind_str: String = row.get("kind");
        let timestamp_str: String = row.get("timestamp");
        let account_id_str: String = row.get("account_id");

        Ok(Movement {
            id: Uuid::parse_str(&id_str).context("Invalid movement ID")?,
            sequence: row.get("sequence"),
            kind: MovementKind::from_str(&kind_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid movement kind: {}", kind_str))?,
            value_cents: row.get("value_cents"),
            timestamp: DateTime::parse_from_rfc3339(&timestamp_str)
                .context("Invalid timestamp")?
                .with_timezone(&Utc),
            balance_cents: row.get("balance_cents"),
            account_id: Uuid::parse_str(&account_id_str).context("Invalid account ID")?,
        })
    }

    // ========================
    // Customer reference operations
    // ========================

    /// Insert or overwrite a projection row. Replaying the same creation
    /// event converges to the same row.
    pub async fn upsert_customer_reference(&self, reference: &CustomerReference) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO customer_references (id, name, identification, status)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                identification = excluded.identification,
                status = excluded.status
            "#,
        )
        .bind(reference.id)
        .bind(&reference.name)
        .bind(&reference.identification)
        .bind(reference.status.as_str())
        .execute(&self.pool)
        .await
        .context("Failed to upsert customer reference")?;
        Ok(())
    }

    /// Overwrite an existing projection row.
    pub async fn update_customer_reference(&self, reference: &CustomerReference) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE customer_references
            SET name = ?, identification = ?, status = ?
            WHERE id = ?
            "#,
        )
        .bind(&reference.name)
        .bind(&reference.identification)
        .bind(reference.status.as_str())
        .bind(reference.id)
        .execute(&self.pool)
        .await
        .context("Failed to update customer reference")?;
        Ok(())
    }

    /// Get a projection row by customer ID.
    pub async fn get_customer_reference(
        &self,
        id: CustomerId,
    ) -> Result<Option<CustomerReference>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, identification, status
            FROM customer_references
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch customer reference")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_customer_reference(&row)?)),
            None => Ok(None),
        }
    }

    fn row_to_customer_reference(row: &sqlx::sqlite::SqliteRow) -> Result<CustomerReference> {
        let status_str: String = row.get("status");

        Ok(CustomerReference {
            id: row.get("id"),
            name: row.get("name"),
            identification: row.get("identification"),
            status: EntityStatus::from_str(&status_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid customer status: {}", status_str))?,
        })
    }
}
