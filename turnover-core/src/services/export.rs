//! Export service - drives one run of the exporter
//!
//! Fetches transactions per account, filters them against the deduplication
//! store, writes per-account CSV files, optionally emails them, and records
//! what was exported.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Duration, Local, NaiveDate};
use log::{debug, info, warn};
use serde::Serialize;

use crate::adapters::raiffeisen::RaiffeisenClient;
use crate::config::Config;
use crate::domain::result::{Error, Result};
use crate::domain::{Account, ExportRecord, Transaction};
use crate::ports::{MailSink, TransactionFilter, TransactionRepository};

/// Date format used in file names and run summaries
const FILE_DATE_FORMAT: &str = "%Y-%m-%d";

/// Inclusive date window for one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ExportWindow {
    /// Compute the window from day offsets relative to `today`
    pub fn compute(today: NaiveDate, max_age_days: i64, min_age_days: i64) -> Self {
        Self {
            start: today - Duration::days(max_age_days),
            end: today - Duration::days(min_age_days),
        }
    }

    /// CSV file name for one account: `{start}_{end}_{number}_{currency}.csv`
    pub fn file_name(&self, account: &Account) -> String {
        format!(
            "{}_{}_{}_{}.csv",
            self.start.format(FILE_DATE_FORMAT),
            self.end.format(FILE_DATE_FORMAT),
            account.number,
            account.currency
        )
    }
}

/// Outcome for one exported account
#[derive(Debug, Clone, Serialize)]
pub struct AccountExport {
    pub account: String,
    /// Transactions fetched for the window
    pub discovered: usize,
    /// Transactions exported after the only-new filter
    pub exported: usize,
    /// Transactions dropped because the store already had them
    pub skipped_existing: usize,
    /// Retained CSV path; None when save-to-CSV is disabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emailed_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_error: Option<String>,
}

/// Result of a full run
#[derive(Debug, Serialize)]
pub struct ExportSummary {
    pub start_date: String,
    pub end_date: String,
    /// Accounts that produced an export; skipped accounts do not appear
    pub accounts: Vec<AccountExport>,
}

/// Orchestrator for one export run
///
/// Sequential by design: one account at a time, blocking I/O throughout.
/// The repository is the only stateful collaborator; dropping the service
/// (or the run failing) releases its connection.
pub struct ExportService {
    config: Config,
    repository: Option<Arc<dyn TransactionRepository>>,
    mailer: Option<Box<dyn MailSink>>,
}

impl ExportService {
    pub fn new(
        config: Config,
        repository: Option<Arc<dyn TransactionRepository>>,
        mailer: Option<Box<dyn MailSink>>,
    ) -> Self {
        Self {
            config,
            repository,
            mailer,
        }
    }

    /// Run the export end to end
    ///
    /// Authentication and protocol failures abort the run. Unknown currency
    /// variants only skip the affected account.
    pub fn run(&self) -> Result<ExportSummary> {
        let window = ExportWindow::compute(
            Local::now().date_naive(),
            self.config.max_age_days,
            self.config.min_age_days,
        );
        info!(
            "exporting transactions from {} to {}",
            window.start, window.end
        );

        let mut client = RaiffeisenClient::new(
            &self.config.base_url,
            &self.config.username,
            &self.config.password_hash,
        )?;
        debug!("logging in to the portal as {}", self.config.username);
        client.login()?;

        let accounts = client.accounts()?;
        debug!("portal lists {} accounts", accounts.len());

        let results = self.export_accounts(&accounts, &window, |account| {
            client.transactions(account, window.start, window.end, None, None)
        })?;

        Ok(ExportSummary {
            start_date: window.start.format(FILE_DATE_FORMAT).to_string(),
            end_date: window.end.format(FILE_DATE_FORMAT).to_string(),
            accounts: results,
        })
    }

    /// Drive the per-account loop with the given fetch function
    ///
    /// An unknown currency variant skips the affected account only; every
    /// other fetch error aborts the run.
    fn export_accounts<F>(
        &self,
        accounts: &[Account],
        window: &ExportWindow,
        mut fetch: F,
    ) -> Result<Vec<AccountExport>>
    where
        F: FnMut(&Account) -> Result<Vec<Transaction>>,
    {
        let mut results = Vec::new();
        for account in accounts {
            let transactions = match fetch(account) {
                Ok(transactions) => transactions,
                Err(Error::UnknownCurrencyVariant(code)) => {
                    warn!(
                        "skipping account {}: unknown currency variant {:?}",
                        account.id(),
                        code
                    );
                    continue;
                }
                Err(e) => return Err(e),
            };

            if transactions.is_empty() {
                debug!("no transactions for {} in window", account.id());
                continue;
            }

            if let Some(outcome) = self.export_account(account, transactions, window)? {
                results.push(outcome);
            }
        }
        Ok(results)
    }

    /// Export one account's fetched transactions
    ///
    /// Returns None when the only-new filter leaves nothing to export; in
    /// that case no file is written, no email is sent and the store is not
    /// touched.
    pub fn export_account(
        &self,
        account: &Account,
        transactions: Vec<Transaction>,
        window: &ExportWindow,
    ) -> Result<Option<AccountExport>> {
        let discovered = transactions.len();

        let fresh = match &self.repository {
            Some(repository) => {
                let ids: Vec<String> = transactions.iter().map(|t| t.id.clone()).collect();
                let existing =
                    repository.find(&TransactionFilter::account_ids(&account.number, ids))?;
                let seen: HashSet<&str> = existing.iter().map(|r| r.id.as_str()).collect();
                transactions
                    .into_iter()
                    .filter(|t| !seen.contains(t.id.as_str()))
                    .collect::<Vec<_>>()
            }
            None => transactions,
        };

        if fresh.is_empty() {
            debug!("no new transactions for {}", account.id());
            return Ok(None);
        }

        let records: Vec<ExportRecord> = fresh
            .iter()
            .map(|t| ExportRecord::new(&account.number, t))
            .collect();

        let path = self.config.csv_dir.join(window.file_name(account));
        debug!("writing {} transactions to {}", records.len(), path.display());
        write_csv(&path, &records)?;

        let mut emailed_to = None;
        let mut email_error = None;
        if let (Some(recipient), Some(mailer)) =
            (self.config.recipients.get(&account.id()), &self.mailer)
        {
            let subject = format!(
                "Transactions for {} from {} to {}",
                account.id(),
                window.start.format(FILE_DATE_FORMAT),
                window.end.format(FILE_DATE_FORMAT)
            );
            match mailer.send_csv(recipient, &subject, &path) {
                Ok(()) => {
                    info!("emailed transactions for {} to {}", account.id(), recipient);
                    emailed_to = Some(recipient.clone());
                }
                // Non-fatal: sibling accounts still get processed.
                Err(e) => {
                    warn!("failed to email transactions for {}: {}", account.id(), e);
                    email_error = Some(e.to_string());
                }
            }
        }

        let file = if self.config.save_to_csv {
            info!(
                "saved {} transactions for {} to {}",
                records.len(),
                account.id(),
                path.display()
            );
            Some(path.display().to_string())
        } else {
            std::fs::remove_file(&path)?;
            None
        };

        if let Some(repository) = &self.repository {
            debug!("recording {} exported transactions for {}", records.len(), account.id());
            repository.add(&records)?;
        }

        Ok(Some(AccountExport {
            account: account.id(),
            discovered,
            exported: records.len(),
            skipped_existing: discovered - records.len(),
            file,
            emailed_to,
            email_error,
        }))
    }
}

/// Write export records as a UTF-8 CSV file with a header row
fn write_csv(path: &PathBuf, records: &[ExportRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}
