//! Account domain model

use serde::{Deserialize, Serialize};

/// A bank account visible to the authenticated portal user
///
/// Accounts are immutable once fetched; the same account number appears once
/// per currency, so identity is `number + currency`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub number: String,
    /// Display currency code ("RSD", "EUR", ...)
    pub currency: String,
    /// Numeric currency code used by the remote API ("941", "978", ...)
    pub currency_code: String,
    /// Opaque routing id required by the turnover endpoint
    pub product_core_id: String,
}

impl Account {
    /// Account identity, as used for recipient lookup and log lines
    pub fn id(&self) -> String {
        format!("{}-{}", self.number, self.currency)
    }
}
