use anyhow::Result;
use chrono::{DateTime, Utc};
use std::io::Write;

use crate::application::{account_key, LedgerService};
use crate::domain::{format_cents, CustomerId};

/// Exporter for rendering statements as tabular documents.
pub struct Exporter<'a> {
    service: &'a LedgerService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a LedgerService) -> Self {
        Self { service }
    }

    /// Render an account statement as CSV: customer identity block, the
    /// requested period, then one section per active account — a header row
    /// with number, kind, and current balance, followed by one row per
    /// movement. Returns the number of movement rows written.
    pub async fn export_statement_csv<W: Write>(
        &self,
        customer_id: CustomerId,
        from_date: DateTime<Utc>,
        to_date: DateTime<Utc>,
        writer: W,
    ) -> Result<usize> {
        let statement = self
            .service
            .account_statement(customer_id, from_date, to_date)
            .await?;
        let accounts = self.service.list_accounts(customer_id).await?;

        // Rows vary in width between the identity block, the section headers,
        // and the movement rows
        let mut csv_writer = csv::WriterBuilder::new().flexible(true).from_writer(writer);

        csv_writer.write_record(["Customer:", &statement.customer.name])?;
        csv_writer.write_record(["Identification:", &statement.customer.identification])?;
        csv_writer.write_record([
            "Period:",
            &format!(
                "{} to {}",
                from_date.format("%Y-%m-%d"),
                to_date.format("%Y-%m-%d")
            ),
        ])?;

        let mut count = 0;
        for account in &accounts {
            let balance = self.service.resolve_balance(account.id).await?;
            csv_writer.write_record([&format!(
                "Account: {} - {} | Balance: {}",
                account.number,
                account.kind,
                format_cents(balance.balance_cents)
            )])?;
            csv_writer.write_record(["Date", "Kind", "Value", "Balance"])?;

            let key = account_key(&account.number, account.kind);
            let lines = statement.accounts.get(&key).map(Vec::as_slice).unwrap_or(&[]);

            for line in lines {
                csv_writer.write_record([
                    line.timestamp.format("%Y-%m-%d %H:%M").to_string(),
                    line.kind.to_string(),
                    format_cents(line.value_cents),
                    format_cents(line.balance_cents),
                ])?;
                count += 1;
            }
        }

        csv_writer.flush()?;
        Ok(count)
    }
}
