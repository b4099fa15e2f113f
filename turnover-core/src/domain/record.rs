//! Export record - the persisted/serialized form of a transaction

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::Transaction;

/// A transaction plus its owning account number
///
/// This is both the CSV row shape (the header comes from the field names)
/// and the deduplication-store row shape. Once written to the store a record
/// is never mutated, only appended or read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRecord {
    pub account: String,
    pub id: String,
    pub currency_code: String,
    pub currency: String,
    pub datetime: String,
    pub title: String,
    pub debit: Decimal,
    pub credit: Decimal,
    pub balance: Option<String>,
    pub card_number: Option<String>,
    pub additional_info: String,
    pub transaction_type: String,
    pub description: String,
}

impl ExportRecord {
    /// Attach an owning account number to a normalized transaction
    pub fn new(account_number: &str, tx: &Transaction) -> Self {
        Self {
            account: account_number.to_string(),
            id: tx.id.clone(),
            currency_code: tx.currency_code.clone(),
            currency: tx.currency.clone(),
            datetime: tx.datetime.clone(),
            title: tx.title.clone(),
            debit: tx.debit,
            credit: tx.credit,
            balance: tx.balance.clone(),
            card_number: tx.card_number.clone(),
            additional_info: tx.additional_info.clone(),
            transaction_type: tx.transaction_type.clone(),
            description: tx.description.clone(),
        }
    }
}
