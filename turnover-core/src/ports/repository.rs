//! Deduplication store port

use crate::domain::result::Result;
use crate::domain::ExportRecord;

/// Filter for querying previously exported records
///
/// All populated fields are conjunctive (AND); an empty filter matches
/// everything. Dates compare lexically against the stored `datetime` text,
/// which the portal emits in sortable form.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub account: Option<String>,
    pub transaction_ids: Option<Vec<String>>,
    pub currency: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl TransactionFilter {
    /// Filter used by the only-new pass: one account, a known id set
    pub fn account_ids(account_number: &str, ids: Vec<String>) -> Self {
        Self {
            account: Some(account_number.to_string()),
            transaction_ids: Some(ids),
            ..Self::default()
        }
    }
}

/// Deduplication store abstraction
///
/// One production implementation (DuckDB); tests substitute an in-memory
/// fake. The store enforces no uniqueness - callers only `add` ids they have
/// already filtered through `find`.
pub trait TransactionRepository: Send + Sync {
    /// Return previously exported records matching the filter
    ///
    /// An uninitialized store (table absent on first run) yields an empty
    /// result, not an error.
    fn find(&self, filter: &TransactionFilter) -> Result<Vec<ExportRecord>>;

    /// Append records to the store; never overwrites existing rows
    fn add(&self, records: &[ExportRecord]) -> Result<()>;
}
