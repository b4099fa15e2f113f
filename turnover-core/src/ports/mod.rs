//! Port definitions (hexagonal architecture)
//!
//! The core depends on these traits, not on concrete implementations.

mod mailer;
mod repository;

pub use mailer::MailSink;
pub use repository::{TransactionFilter, TransactionRepository};
