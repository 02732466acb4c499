use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::application::{LedgerService, MovementDraft, MovementRecord};
use crate::domain::{format_cents, parse_cents, AccountKind, MovementKind};
use crate::io::{EventFeed, Exporter};

/// Saldo - Account & Movement Ledger
#[derive(Parser)]
#[command(name = "saldo")]
#[command(about = "An account and movement ledger with event-driven customer reference sync")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, default_value = "saldo.db")]
    pub database: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Account management commands
    #[command(subcommand)]
    Account(AccountCommands),

    /// Register a credit against an account
    Credit {
        /// Account ID
        account_id: String,

        /// Amount to credit (e.g., "500.00" or "500")
        value: String,
    },

    /// Register a debit against an account
    Debit {
        /// Account ID
        account_id: String,

        /// Amount to debit (e.g., "200.00" or "200")
        value: String,
    },

    /// Show the current balance of an account
    Balance {
        /// Account ID
        account_id: String,
    },

    /// Direct movement record commands
    #[command(subcommand)]
    Movement(MovementCommands),

    /// Build a customer's account statement for a date range
    Statement {
        /// Customer ID
        customer_id: i64,

        /// Start date (YYYY-MM-DD, inclusive)
        #[arg(long)]
        from_date: String,

        /// End date (YYYY-MM-DD, inclusive)
        #[arg(long)]
        to_date: String,

        /// Output format: json, csv
        #[arg(short, long, default_value = "json")]
        format: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Apply a JSON-lines feed of customer registry events to the projection
    Feed {
        /// Input file (stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
    },

    /// Verify that every account's stored balance chain replays cleanly
    Check,
}

#[derive(Subcommand)]
pub enum AccountCommands {
    /// Open a new account
    Create {
        /// Account number (must be unique)
        number: String,

        /// Account kind: savings, checking
        #[arg(short, long)]
        kind: String,

        /// Initial balance (e.g., "1000.00")
        #[arg(long, default_value = "0")]
        initial_balance: String,

        /// Owning customer ID
        #[arg(long)]
        customer_id: i64,
    },

    /// Show an account
    Show {
        /// Account ID
        id: String,
    },

    /// Change an account's number or kind
    Update {
        /// Account ID
        id: String,

        /// New account number
        number: String,

        /// New account kind: savings, checking
        #[arg(short, long)]
        kind: String,
    },

    /// Soft-delete an account (movement history is preserved)
    Delete {
        /// Account ID
        id: String,
    },

    /// List a customer's active accounts
    List {
        /// Customer ID
        customer_id: i64,
    },
}

#[derive(Subcommand)]
pub enum MovementCommands {
    /// Record a movement as given, resulting balance included
    Create {
        /// Account ID
        account_id: String,

        /// Movement kind: credit, debit
        #[arg(short, long)]
        kind: String,

        /// Movement value (e.g., "150.00")
        value: String,

        /// Resulting balance to store (not re-derived on this path)
        #[arg(long)]
        balance: String,

        /// Movement date (YYYY-MM-DD, defaults to now)
        #[arg(long)]
        date: Option<String>,
    },

    /// Replace a movement wholesale under the same identifier
    Update {
        /// Movement ID
        id: String,

        /// Account ID
        account_id: String,

        /// Movement kind: credit, debit
        #[arg(short, long)]
        kind: String,

        /// Movement value
        value: String,

        /// Resulting balance to store
        #[arg(long)]
        balance: String,

        /// Movement date (YYYY-MM-DD, defaults to now)
        #[arg(long)]
        date: Option<String>,
    },

    /// Show a movement
    Show {
        /// Movement ID
        id: String,
    },

    /// Delete a movement (later stored balances are not recomputed)
    Delete {
        /// Movement ID
        id: String,
    },

    /// List all movements
    List,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        if let Commands::Init = self.command {
            LedgerService::init(&self.database).await?;
            println!("Initialized ledger database at {}", self.database);
            return Ok(());
        }

        let service = LedgerService::connect(&self.database).await?;
        match self.command {
            Commands::Init => unreachable!(),
            Commands::Account(command) => run_account(&service, command).await,
            Commands::Credit { account_id, value } => {
                register(&service, &account_id, MovementKind::Credit, &value).await
            }
            Commands::Debit { account_id, value } => {
                register(&service, &account_id, MovementKind::Debit, &value).await
            }
            Commands::Balance { account_id } => {
                let entry = service.resolve_balance(parse_uuid(&account_id)?).await?;
                println!(
                    "{} ({}): {}",
                    entry.account.number,
                    entry.account.kind,
                    format_cents(entry.balance_cents)
                );
                Ok(())
            }
            Commands::Movement(command) => run_movement(&service, command).await,
            Commands::Statement {
                customer_id,
                from_date,
                to_date,
                format,
                output,
            } => run_statement(&service, customer_id, &from_date, &to_date, &format, output).await,
            Commands::Feed { input } => run_feed(&service, input).await,
            Commands::Check => run_check(&service).await,
        }
    }
}

async fn run_account(service: &LedgerService, command: AccountCommands) -> Result<()> {
    match command {
        AccountCommands::Create {
            number,
            kind,
            initial_balance,
            customer_id,
        } => {
            let account = service
                .create_account(
                    number,
                    parse_account_kind(&kind)?,
                    parse_cents(&initial_balance)?,
                    customer_id,
                )
                .await?;
            println!(
                "Created account {} ({}) with initial balance {}",
                account.number,
                account.kind,
                format_cents(account.initial_balance_cents)
            );
            println!("ID: {}", account.id);
        }
        AccountCommands::Show { id } => {
            let account = service.get_account(parse_uuid(&id)?).await?;
            println!("Account:         {}", account.number);
            println!("Kind:            {}", account.kind);
            println!("Status:          {}", account.status);
            println!("Customer:        {}", account.customer_id);
            println!(
                "Initial balance: {}",
                format_cents(account.initial_balance_cents)
            );
        }
        AccountCommands::Update { id, number, kind } => {
            let account = service
                .update_account(parse_uuid(&id)?, number, parse_account_kind(&kind)?)
                .await?;
            println!("Updated account {} ({})", account.number, account.kind);
        }
        AccountCommands::Delete { id } => {
            let account = service.delete_account(parse_uuid(&id)?).await?;
            println!("Deleted account {} (history preserved)", account.number);
        }
        AccountCommands::List { customer_id } => {
            let accounts = service.list_accounts(customer_id).await?;
            if accounts.is_empty() {
                println!("No active accounts for customer {}", customer_id);
            }
            for account in accounts {
                println!(
                    "{}  {}  {}  initial {}",
                    account.id,
                    account.number,
                    account.kind,
                    format_cents(account.initial_balance_cents)
                );
            }
        }
    }
    Ok(())
}

async fn register(
    service: &LedgerService,
    account_id: &str,
    kind: MovementKind,
    value: &str,
) -> Result<()> {
    let record = service
        .register_movement(parse_uuid(account_id)?, kind, parse_cents(value)?)
        .await?;
    print_movement(&record);
    Ok(())
}

async fn run_movement(service: &LedgerService, command: MovementCommands) -> Result<()> {
    match command {
        MovementCommands::Create {
            account_id,
            kind,
            value,
            balance,
            date,
        } => {
            let record = service
                .create_movement(parse_draft(&account_id, &kind, &value, &balance, date)?)
                .await?;
            print_movement(&record);
        }
        MovementCommands::Update {
            id,
            account_id,
            kind,
            value,
            balance,
            date,
        } => {
            let record = service
                .update_movement(
                    parse_uuid(&id)?,
                    parse_draft(&account_id, &kind, &value, &balance, date)?,
                )
                .await?;
            print_movement(&record);
        }
        MovementCommands::Show { id } => {
            let record = service.get_movement(parse_uuid(&id)?).await?;
            print_movement(&record);
        }
        MovementCommands::Delete { id } => {
            service.delete_movement(parse_uuid(&id)?).await?;
            println!("Deleted movement {}", id);
        }
        MovementCommands::List => {
            for record in service.list_movements().await? {
                print_movement(&record);
            }
        }
    }
    Ok(())
}

async fn run_statement(
    service: &LedgerService,
    customer_id: i64,
    from_date: &str,
    to_date: &str,
    format: &str,
    output: Option<String>,
) -> Result<()> {
    let from = parse_day_start(from_date)?;
    let to = parse_day_end(to_date)?;

    match format {
        "json" => {
            let statement = service.account_statement(customer_id, from, to).await?;
            let json = serde_json::to_string_pretty(&statement)?;
            write_output(output, json.as_bytes())?;
        }
        "csv" => {
            let exporter = Exporter::new(service);
            let mut buffer = Vec::new();
            let rows = exporter
                .export_statement_csv(customer_id, from, to, &mut buffer)
                .await?;
            write_output(output, &buffer)?;
            eprintln!("Exported {} movement rows", rows);
        }
        other => anyhow::bail!("Unknown statement format: {} (expected json or csv)", other),
    }
    Ok(())
}

async fn run_feed(service: &LedgerService, input: Option<String>) -> Result<()> {
    let sync = service.customer_sync();
    let feed = EventFeed::new(&sync);

    let result = match input {
        Some(path) => {
            let file = std::fs::File::open(&path)
                .with_context(|| format!("Failed to open event feed {}", path))?;
            feed.apply_json_lines(file).await?
        }
        None => feed.apply_json_lines(std::io::stdin()).await?,
    };

    println!("Applied {} events", result.applied);
    for error in &result.errors {
        eprintln!("line {}: {}", error.line, error.error);
    }
    Ok(())
}

async fn run_check(service: &LedgerService) -> Result<()> {
    let reports = service.check_integrity().await?;
    if reports.is_empty() {
        println!("All balance chains replay cleanly");
        return Ok(());
    }

    for report in reports {
        println!(
            "Account {} ({}): {} stored balances disagree with replay",
            report.account.number,
            report.account.kind,
            report.mismatches.len()
        );
        for mismatch in report.mismatches {
            println!(
                "  movement {} (seq {}): stored {}, replay expects {}",
                mismatch.movement_id,
                mismatch.sequence,
                format_cents(mismatch.stored_cents),
                format_cents(mismatch.expected_cents)
            );
        }
    }
    anyhow::bail!("Ledger integrity check failed")
}

fn print_movement(record: &MovementRecord) {
    let movement = &record.movement;
    println!(
        "{}  {}  {}  {}  {} -> balance {}",
        movement.id,
        movement.timestamp.format("%Y-%m-%d %H:%M"),
        record.account_number,
        movement.kind,
        format_cents(movement.value_cents),
        format_cents(movement.balance_cents)
    );
}

fn parse_draft(
    account_id: &str,
    kind: &str,
    value: &str,
    balance: &str,
    date: Option<String>,
) -> Result<MovementDraft> {
    let timestamp = match date {
        Some(date) => parse_day_start(&date)?,
        None => Utc::now(),
    };
    Ok(MovementDraft {
        account_id: parse_uuid(account_id)?,
        kind: parse_movement_kind(kind)?,
        value_cents: parse_cents(value)?,
        timestamp,
        balance_cents: parse_cents(balance)?,
    })
}

fn parse_uuid(input: &str) -> Result<Uuid> {
    Uuid::parse_str(input).with_context(|| format!("Invalid ID: {}", input))
}

fn parse_account_kind(input: &str) -> Result<AccountKind> {
    AccountKind::from_str(input)
        .ok_or_else(|| anyhow::anyhow!("Unknown account kind: {} (expected savings or checking)", input))
}

fn parse_movement_kind(input: &str) -> Result<MovementKind> {
    MovementKind::from_str(input)
        .ok_or_else(|| anyhow::anyhow!("Unknown movement kind: {} (expected credit or debit)", input))
}

fn parse_day_start(date: &str) -> Result<DateTime<Utc>> {
    let day = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .with_context(|| format!("Invalid date: {} (expected YYYY-MM-DD)", date))?;
    Ok(day.and_hms_opt(0, 0, 0).unwrap().and_utc())
}

fn parse_day_end(date: &str) -> Result<DateTime<Utc>> {
    let day = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .with_context(|| format!("Invalid date: {} (expected YYYY-MM-DD)", date))?;
    Ok(day.and_hms_opt(23, 59, 59).unwrap().and_utc())
}

fn write_output(output: Option<String>, bytes: &[u8]) -> Result<()> {
    match output {
        Some(path) => std::fs::write(&path, bytes)
            .with_context(|| format!("Failed to write output {}", path)),
        None => {
            use std::io::Write;
            std::io::stdout().write_all(bytes)?;
            Ok(())
        }
    }
}
