//! Transaction domain model and row normalization
//!
//! The portal returns transactions as positionally-indexed JSON arrays, not
//! objects. Field order is a contract with the remote service and differs by
//! currency: domestic rows carry a running balance, foreign-currency card
//! rows insert a masked card number at offset 5 and shift everything after
//! it by one. Offsets are hardcoded per variant below.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::domain::result::{Error, Result};

/// Known raw-row layouts, keyed by the currency discriminator at offset 2
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrencyVariant {
    /// Domestic (RSD) layout, with a running balance column
    Domestic,
    /// EUR card layout, with a masked card number instead of balance
    Eur,
    /// USD card layout, identical offsets to EUR
    Usd,
}

impl CurrencyVariant {
    /// Resolve the layout for a currency discriminator
    ///
    /// New currency variants are a realistic future occurrence, so an
    /// unmatched discriminator is a reported error, never a silent drop.
    pub fn from_code(code: &str) -> Result<Self> {
        match code {
            "RSD" => Ok(Self::Domestic),
            "EUR" => Ok(Self::Eur),
            "USD" => Ok(Self::Usd),
            other => Err(Error::UnknownCurrencyVariant(other.to_string())),
        }
    }
}

/// A single account transaction, produced only by normalizing a remote row
///
/// `id` is remote-assigned and unique within an account+currency scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub currency_code: String,
    pub currency: String,
    pub datetime: String,
    pub title: String,
    pub debit: Decimal,
    pub credit: Decimal,
    /// Running balance; domestic rows only
    pub balance: Option<String>,
    /// Masked card number; foreign-currency card rows only
    pub card_number: Option<String>,
    pub additional_info: String,
    pub transaction_type: String,
    pub description: String,
}

/// Offset of the currency discriminator in every known layout
const CURRENCY_OFFSET: usize = 2;

impl Transaction {
    /// Normalize a raw positional row into a typed transaction
    ///
    /// Dispatches on the currency discriminator and reads the documented
    /// offsets for that variant. Missing or null cells become empty strings
    /// for text fields and zero for amounts.
    pub fn from_row(row: &[JsonValue]) -> Result<Self> {
        let currency = text_at(row, CURRENCY_OFFSET);
        match CurrencyVariant::from_code(&currency)? {
            CurrencyVariant::Domestic => Ok(Self {
                id: text_at(row, 11),
                currency_code: text_at(row, 1),
                currency,
                datetime: text_at(row, 3),
                title: text_at(row, 5),
                debit: decimal_at(row, 7),
                credit: decimal_at(row, 8),
                balance: Some(text_at(row, 9)),
                card_number: None,
                additional_info: text_at(row, 10),
                transaction_type: text_at(row, 12),
                description: text_at(row, 13),
            }),
            CurrencyVariant::Eur | CurrencyVariant::Usd => Ok(Self {
                id: text_at(row, 12),
                currency_code: text_at(row, 1),
                currency,
                datetime: text_at(row, 3),
                card_number: Some(text_at(row, 5)),
                title: text_at(row, 6),
                debit: decimal_at(row, 8),
                credit: decimal_at(row, 9),
                balance: None,
                additional_info: text_at(row, 11),
                transaction_type: text_at(row, 13),
                description: text_at(row, 14),
            }),
        }
    }
}

/// Read a cell as text; null and out-of-range cells become empty strings
pub(crate) fn text_at(row: &[JsonValue], idx: usize) -> String {
    match row.get(idx) {
        Some(JsonValue::String(s)) => s.clone(),
        Some(JsonValue::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Read a cell as an amount; accepts JSON numbers and numeric strings
pub(crate) fn decimal_at(row: &[JsonValue], idx: usize) -> Decimal {
    match row.get(idx) {
        Some(JsonValue::Number(n)) => n
            .as_f64()
            .and_then(|f| Decimal::try_from(f).ok())
            .unwrap_or_default(),
        Some(JsonValue::String(s)) => s.trim().parse().unwrap_or_default(),
        _ => Decimal::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Golden domestic row with the documented field offsets
    fn domestic_row() -> Vec<JsonValue> {
        vec![
            json!(0),
            json!("941"),
            json!("RSD"),
            json!("2024-05-10 14:03"),
            json!(null),
            json!("ACME STORE BELGRADE"),
            json!(null),
            json!(1250.50),
            json!(0),
            json!("34200.25"),
            json!("card payment"),
            json!("TX-0001"),
            json!("POS"),
            json!("Purchase at ACME"),
        ]
    }

    /// Golden EUR card row; card number at 5 shifts later fields by one
    fn eur_row() -> Vec<JsonValue> {
        vec![
            json!(0),
            json!("978"),
            json!("EUR"),
            json!("2024-05-11 09:12"),
            json!(null),
            json!("XXXX-XXXX-XXXX-4321"),
            json!("ONLINE SHOP"),
            json!(null),
            json!(0),
            json!("99.99"),
            json!(null),
            json!("fx card payment"),
            json!("TX-0002"),
            json!("ECOM"),
            json!("Online purchase"),
        ]
    }

    #[test]
    fn test_normalize_domestic_row() {
        let tx = Transaction::from_row(&domestic_row()).unwrap();
        assert_eq!(tx.id, "TX-0001");
        assert_eq!(tx.currency_code, "941");
        assert_eq!(tx.currency, "RSD");
        assert_eq!(tx.datetime, "2024-05-10 14:03");
        assert_eq!(tx.title, "ACME STORE BELGRADE");
        assert_eq!(tx.debit, Decimal::try_from(1250.50).unwrap());
        assert_eq!(tx.credit, Decimal::ZERO);
        assert_eq!(tx.balance.as_deref(), Some("34200.25"));
        assert_eq!(tx.card_number, None);
        assert_eq!(tx.additional_info, "card payment");
        assert_eq!(tx.transaction_type, "POS");
        assert_eq!(tx.description, "Purchase at ACME");
    }

    #[test]
    fn test_normalize_eur_card_row() {
        let tx = Transaction::from_row(&eur_row()).unwrap();
        assert_eq!(tx.id, "TX-0002");
        assert_eq!(tx.currency, "EUR");
        assert_eq!(tx.card_number.as_deref(), Some("XXXX-XXXX-XXXX-4321"));
        assert_eq!(tx.title, "ONLINE SHOP");
        assert_eq!(tx.debit, Decimal::ZERO);
        assert_eq!(tx.credit, "99.99".parse::<Decimal>().unwrap());
        assert_eq!(tx.balance, None);
        assert_eq!(tx.additional_info, "fx card payment");
        assert_eq!(tx.transaction_type, "ECOM");
        assert_eq!(tx.description, "Online purchase");
    }

    #[test]
    fn test_usd_shares_card_layout() {
        let mut row = eur_row();
        row[1] = json!("840");
        row[2] = json!("USD");
        let tx = Transaction::from_row(&row).unwrap();
        assert_eq!(tx.currency, "USD");
        assert_eq!(tx.card_number.as_deref(), Some("XXXX-XXXX-XXXX-4321"));
    }

    #[test]
    fn test_unknown_discriminator_is_an_error() {
        let mut row = domestic_row();
        row[2] = json!("CHF");
        let err = Transaction::from_row(&row).unwrap_err();
        match err {
            Error::UnknownCurrencyVariant(code) => assert_eq!(code, "CHF"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_numeric_id_cell_becomes_text() {
        let mut row = domestic_row();
        row[11] = json!(900123);
        let tx = Transaction::from_row(&row).unwrap();
        assert_eq!(tx.id, "900123");
    }

    #[test]
    fn test_string_amount_cell_is_parsed() {
        let mut row = domestic_row();
        row[7] = json!(" 42.10 ");
        let tx = Transaction::from_row(&row).unwrap();
        assert_eq!(tx.debit, "42.10".parse::<Decimal>().unwrap());
    }
}
