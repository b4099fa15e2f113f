//! Turnover Core - business logic for the bank statement exporter
//!
//! This crate follows hexagonal architecture:
//!
//! - **domain**: core entities (Account, Transaction, ExportRecord) and row
//!   normalization
//! - **ports**: trait definitions for external dependencies
//!   (TransactionRepository, MailSink)
//! - **services**: run orchestration (ExportService)
//! - **adapters**: concrete implementations (Raiffeisen portal client,
//!   DuckDB store, SMTP sink)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod services;

// Re-export commonly used types at crate root
pub use config::{Config, SmtpSettings};
pub use domain::result::{Error, Result};
pub use domain::{Account, CurrencyVariant, ExportRecord, Transaction};
pub use ports::{MailSink, TransactionFilter, TransactionRepository};
pub use services::{AccountExport, ExportService, ExportSummary, ExportWindow};
