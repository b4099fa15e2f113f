//! Adapter implementations
//!
//! Adapters bind the core to concrete technologies:
//! - Raiffeisen portal HTTP client for account/transaction ingestion
//! - DuckDB for the TransactionRepository port
//! - SMTP (lettre) for email delivery

pub mod duckdb;
pub mod raiffeisen;
pub mod smtp;
