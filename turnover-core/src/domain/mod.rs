//! Core domain entities
//!
//! Pure data structures and normalization logic - no I/O or external
//! dependencies beyond serde/decimal types.

mod account;
mod record;
pub(crate) mod transaction;
pub mod result;

pub use account::Account;
pub use record::ExportRecord;
pub use transaction::{CurrencyVariant, Transaction};
