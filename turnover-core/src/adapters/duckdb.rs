//! DuckDB deduplication store implementation

use std::path::Path;
use std::sync::Mutex;

use duckdb::{params, params_from_iter, Connection};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::domain::result::{Error, Result};
use crate::domain::ExportRecord;
use crate::ports::{TransactionFilter, TransactionRepository};

/// Column list shared by CREATE, INSERT and SELECT so offsets stay in sync
const COLUMNS: &str = "account, id, currency_code, currency, datetime, title, \
                       debit, credit, balance, card_number, additional_info, \
                       transaction_type, description";

/// DuckDB-backed deduplication store
///
/// Holds one connection for the duration of the run; the connection is
/// released when the store is dropped, on success or failure alike.
pub struct DuckDbStore {
    conn: Mutex<Connection>,
    table: String,
}

impl DuckDbStore {
    /// Open (or create) the store database file
    ///
    /// The table name is configurable but interpolated into SQL as an
    /// identifier, so it is restricted to `[A-Za-z_][A-Za-z0-9_]*`. Values
    /// always go through parameter binding.
    pub fn new(db_path: &Path, table: &str) -> Result<Self> {
        validate_table_name(table)?;

        // Extension autoloading is unnecessary for a plain table and can
        // trip over stale cached extensions.
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        let conn = Connection::open_with_flags(db_path, config)?;

        Ok(Self {
            conn: Mutex::new(conn),
            table: table.to_string(),
        })
    }

    fn create_table_sql(&self) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {} (
                account VARCHAR,
                id VARCHAR,
                currency_code VARCHAR,
                currency VARCHAR,
                datetime VARCHAR,
                title VARCHAR,
                debit DOUBLE,
                credit DOUBLE,
                balance VARCHAR,
                card_number VARCHAR,
                additional_info VARCHAR,
                transaction_type VARCHAR,
                description VARCHAR
            )",
            self.table
        )
    }

    fn row_to_record(row: &duckdb::Row) -> ExportRecord {
        // Column indices follow COLUMNS:
        // 0: account, 1: id, 2: currency_code, 3: currency, 4: datetime,
        // 5: title, 6: debit, 7: credit, 8: balance, 9: card_number,
        // 10: additional_info, 11: transaction_type, 12: description
        ExportRecord {
            account: row.get(0).unwrap_or_default(),
            id: row.get(1).unwrap_or_default(),
            currency_code: row.get(2).unwrap_or_default(),
            currency: row.get(3).unwrap_or_default(),
            datetime: row.get(4).unwrap_or_default(),
            title: row.get(5).unwrap_or_default(),
            debit: row
                .get::<_, f64>(6)
                .ok()
                .and_then(|f| Decimal::try_from(f).ok())
                .unwrap_or_default(),
            credit: row
                .get::<_, f64>(7)
                .ok()
                .and_then(|f| Decimal::try_from(f).ok())
                .unwrap_or_default(),
            balance: row.get::<_, Option<String>>(8).unwrap_or(None),
            card_number: row.get::<_, Option<String>>(9).unwrap_or(None),
            additional_info: row.get(10).unwrap_or_default(),
            transaction_type: row.get(11).unwrap_or_default(),
            description: row.get(12).unwrap_or_default(),
        }
    }
}

impl TransactionRepository for DuckDbStore {
    fn find(&self, filter: &TransactionFilter) -> Result<Vec<ExportRecord>> {
        // An explicitly empty id set can match nothing; "IN ()" is not SQL.
        if matches!(&filter.transaction_ids, Some(ids) if ids.is_empty()) {
            return Ok(Vec::new());
        }

        let mut clauses: Vec<String> = Vec::new();
        let mut values: Vec<String> = Vec::new();

        if let Some(account) = &filter.account {
            clauses.push("account = ?".to_string());
            values.push(account.clone());
        }
        if let Some(ids) = &filter.transaction_ids {
            clauses.push(format!("id IN ({})", placeholders(ids.len())));
            values.extend(ids.iter().cloned());
        }
        if let Some(currency) = &filter.currency {
            clauses.push("currency = ?".to_string());
            values.push(currency.clone());
        }
        if let Some(start) = &filter.start_date {
            clauses.push("datetime >= ?".to_string());
            values.push(start.clone());
        }
        if let Some(end) = &filter.end_date {
            clauses.push("datetime <= ?".to_string());
            values.push(end.clone());
        }

        let mut sql = format!("SELECT {} FROM {}", COLUMNS, self.table);
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }

        let conn = self.conn.lock().unwrap();
        let mut stmt = match conn.prepare(&sql) {
            Ok(stmt) => stmt,
            // First run: the table has never been written, which is an
            // empty result, not a fault.
            Err(e) if is_missing_table(&e) => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let records = stmt
            .query_map(params_from_iter(values), |row| Ok(Self::row_to_record(row)))?
            .filter_map(|r| r.ok())
            .collect();

        Ok(records)
    }

    fn add(&self, records: &[ExportRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let conn = self.conn.lock().unwrap();
        conn.execute_batch(&self.create_table_sql())?;

        let sql = format!(
            "INSERT INTO {} ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            self.table, COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        for record in records {
            let debit = amount_to_db(record.debit)?;
            let credit = amount_to_db(record.credit)?;
            stmt.execute(params![
                record.account,
                record.id,
                record.currency_code,
                record.currency,
                record.datetime,
                record.title,
                debit,
                credit,
                record.balance,
                record.card_number,
                record.additional_info,
                record.transaction_type,
                record.description,
            ])?;
        }

        Ok(())
    }
}

/// `?, ?, ...` for an `IN` clause of the given arity
fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

/// Convert an amount for the DOUBLE column; a value that cannot be
/// represented is a hard error, never a silent zero
fn amount_to_db(value: Decimal) -> Result<f64> {
    value.to_f64().ok_or_else(|| {
        Error::Database(duckdb::Error::ToSqlConversionFailure(
            format!("amount {value} does not fit a DOUBLE column").into(),
        ))
    })
}

fn is_missing_table(error: &duckdb::Error) -> bool {
    let msg = error.to_string();
    msg.contains("Catalog Error") && msg.contains("does not exist")
}

fn validate_table_name(table: &str) -> Result<()> {
    let mut chars = table.chars();
    let valid_start = chars
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);
    if !valid_start || !table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(Error::config(format!(
            "invalid store table name: {table:?}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders_join() {
        assert_eq!(placeholders(1), "?");
        assert_eq!(placeholders(3), "?, ?, ?");
    }

    #[test]
    fn test_amount_conversion_is_exact_for_money_values() {
        assert_eq!(amount_to_db(Decimal::new(125050, 2)).unwrap(), 1250.5);
        assert_eq!(amount_to_db(Decimal::ZERO).unwrap(), 0.0);
        assert_eq!(amount_to_db(Decimal::new(-995, 2)).unwrap(), -9.95);
    }

    #[test]
    fn test_table_name_validation() {
        assert!(validate_table_name("transactions").is_ok());
        assert!(validate_table_name("_t2").is_ok());
        assert!(validate_table_name("").is_err());
        assert!(validate_table_name("2bad").is_err());
        assert!(validate_table_name("drop table; --").is_err());
    }
}
