//! Integration tests for turnover-core
//!
//! These tests verify the deduplication store and the per-account export
//! pipeline against a real DuckDB database. Network IO is not exercised;
//! fetched transactions are handed to the service directly.

use std::sync::Arc;

use rust_decimal::Decimal;
use tempfile::TempDir;

use turnover_core::adapters::duckdb::DuckDbStore;
use turnover_core::{
    Account, Config, ExportRecord, ExportService, ExportWindow, Transaction, TransactionFilter,
    TransactionRepository,
};

// ============================================================================
// Test helpers
// ============================================================================

fn create_test_store(temp_dir: &TempDir) -> Arc<DuckDbStore> {
    let db_path = temp_dir.path().join("test.duckdb");
    Arc::new(DuckDbStore::new(&db_path, "transactions").expect("Failed to open store"))
}

fn test_account() -> Account {
    Account {
        number: "123".to_string(),
        currency: "RSD".to_string(),
        currency_code: "941".to_string(),
        product_core_id: "1".to_string(),
    }
}

fn test_transaction(id: &str, datetime: &str) -> Transaction {
    Transaction {
        id: id.to_string(),
        currency_code: "941".to_string(),
        currency: "RSD".to_string(),
        datetime: datetime.to_string(),
        title: "ACME STORE".to_string(),
        debit: Decimal::new(125050, 2),
        credit: Decimal::ZERO,
        balance: Some("34200.25".to_string()),
        card_number: None,
        additional_info: "card payment".to_string(),
        transaction_type: "POS".to_string(),
        description: "Purchase at ACME".to_string(),
    }
}

fn test_record(account: &str, id: &str, datetime: &str) -> ExportRecord {
    ExportRecord::new(account, &test_transaction(id, datetime))
}

fn test_window() -> ExportWindow {
    ExportWindow {
        start: chrono::NaiveDate::from_ymd_opt(2024, 5, 3).unwrap(),
        end: chrono::NaiveDate::from_ymd_opt(2024, 5, 10).unwrap(),
    }
}

fn test_config(csv_dir: &TempDir, save_to_csv: bool) -> Config {
    Config {
        username: "user".to_string(),
        password_hash: "hash".to_string(),
        only_new: true,
        save_to_csv,
        csv_dir: csv_dir.path().to_path_buf(),
        ..Config::default()
    }
}

// ============================================================================
// Store behavior
// ============================================================================

#[test]
fn test_find_on_uninitialized_store_returns_empty() {
    let temp_dir = TempDir::new().unwrap();
    let store = create_test_store(&temp_dir);

    // No add() has ever run, so the table does not exist yet.
    let found = store.find(&TransactionFilter::default()).unwrap();
    assert!(found.is_empty());

    let filtered = store
        .find(&TransactionFilter::account_ids("123", vec!["t1".to_string()]))
        .unwrap();
    assert!(filtered.is_empty());
}

#[test]
fn test_add_then_find_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let store = create_test_store(&temp_dir);

    let records = vec![
        test_record("123", "t1", "2024-05-04 10:00"),
        test_record("123", "t2", "2024-05-05 11:00"),
    ];
    store.add(&records).unwrap();

    let found = store
        .find(&TransactionFilter::account_ids(
            "123",
            vec!["t1".to_string(), "t2".to_string()],
        ))
        .unwrap();

    assert_eq!(found.len(), 2);
    let mut ids: Vec<&str> = found.iter().map(|r| r.id.as_str()).collect();
    ids.sort();
    assert_eq!(ids, vec!["t1", "t2"]);

    // Full field round trip, including the decimal amounts.
    let t1 = found.iter().find(|r| r.id == "t1").unwrap();
    assert_eq!(t1, &records[0]);
}

#[test]
fn test_find_filters_are_conjunctive() {
    let temp_dir = TempDir::new().unwrap();
    let store = create_test_store(&temp_dir);

    let mut eur = test_record("456", "t3", "2024-05-06 09:00");
    eur.currency = "EUR".to_string();
    eur.balance = None;
    eur.card_number = Some("XXXX-4321".to_string());

    store
        .add(&[
            test_record("123", "t1", "2024-05-04 10:00"),
            test_record("123", "t2", "2024-05-08 11:00"),
            eur,
        ])
        .unwrap();

    // Account alone
    let by_account = store
        .find(&TransactionFilter {
            account: Some("123".to_string()),
            ..TransactionFilter::default()
        })
        .unwrap();
    assert_eq!(by_account.len(), 2);

    // Account AND date range
    let by_account_and_date = store
        .find(&TransactionFilter {
            account: Some("123".to_string()),
            start_date: Some("2024-05-05".to_string()),
            end_date: Some("2024-05-09".to_string()),
            ..TransactionFilter::default()
        })
        .unwrap();
    assert_eq!(by_account_and_date.len(), 1);
    assert_eq!(by_account_and_date[0].id, "t2");

    // Currency filter picks up the foreign-card record
    let by_currency = store
        .find(&TransactionFilter {
            currency: Some("EUR".to_string()),
            ..TransactionFilter::default()
        })
        .unwrap();
    assert_eq!(by_currency.len(), 1);
    assert_eq!(by_currency[0].card_number.as_deref(), Some("XXXX-4321"));

    // Conjunction that matches nothing
    let none = store
        .find(&TransactionFilter {
            account: Some("123".to_string()),
            currency: Some("EUR".to_string()),
            ..TransactionFilter::default()
        })
        .unwrap();
    assert!(none.is_empty());
}

#[test]
fn test_add_appends_and_never_overwrites() {
    let temp_dir = TempDir::new().unwrap();
    let store = create_test_store(&temp_dir);

    let record = test_record("123", "t1", "2024-05-04 10:00");
    store.add(std::slice::from_ref(&record)).unwrap();

    // The store enforces no uniqueness; a second add of the same id is
    // appended verbatim. Callers are responsible for filtering first.
    store.add(std::slice::from_ref(&record)).unwrap();

    let found = store
        .find(&TransactionFilter::account_ids("123", vec!["t1".to_string()]))
        .unwrap();
    assert_eq!(found.len(), 2);
}

#[test]
fn test_empty_id_set_matches_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let store = create_test_store(&temp_dir);
    store
        .add(&[test_record("123", "t1", "2024-05-04 10:00")])
        .unwrap();

    let found = store
        .find(&TransactionFilter::account_ids("123", Vec::new()))
        .unwrap();
    assert!(found.is_empty());
}

// ============================================================================
// Per-account export pipeline against the real store
// ============================================================================

#[test]
fn test_only_new_pipeline_end_to_end() {
    let db_dir = TempDir::new().unwrap();
    let csv_dir = TempDir::new().unwrap();
    let store = create_test_store(&db_dir);

    // The store already knows t1 for account 123-RSD.
    store
        .add(&[test_record("123", "t1", "2024-05-04 10:00")])
        .unwrap();

    let service = ExportService::new(test_config(&csv_dir, true), Some(store.clone()), None);

    let outcome = service
        .export_account(
            &test_account(),
            vec![
                test_transaction("t1", "2024-05-04 10:00"),
                test_transaction("t2", "2024-05-06 12:00"),
            ],
            &test_window(),
        )
        .unwrap()
        .expect("t2 is new and must be exported");

    assert_eq!(outcome.discovered, 2);
    assert_eq!(outcome.exported, 1);
    assert_eq!(outcome.skipped_existing, 1);

    // The exported file holds exactly t2.
    let file = outcome.file.expect("save_to_csv keeps the file");
    let content = std::fs::read_to_string(&file).unwrap();
    assert!(content.contains(",t2,"));
    assert!(!content.contains(",t1,"));

    // The store afterwards holds {t1, t2} for the account.
    let stored = store
        .find(&TransactionFilter {
            account: Some("123".to_string()),
            ..TransactionFilter::default()
        })
        .unwrap();
    let mut ids: Vec<&str> = stored.iter().map(|r| r.id.as_str()).collect();
    ids.sort();
    assert_eq!(ids, vec!["t1", "t2"]);
}

#[test]
fn test_nothing_new_skips_file_and_store() {
    let db_dir = TempDir::new().unwrap();
    let csv_dir = TempDir::new().unwrap();
    let store = create_test_store(&db_dir);

    store
        .add(&[test_record("123", "t1", "2024-05-04 10:00")])
        .unwrap();

    let service = ExportService::new(test_config(&csv_dir, true), Some(store.clone()), None);
    let outcome = service
        .export_account(
            &test_account(),
            vec![test_transaction("t1", "2024-05-04 10:00")],
            &test_window(),
        )
        .unwrap();

    assert!(outcome.is_none());
    let expected = csv_dir.path().join(test_window().file_name(&test_account()));
    assert!(!expected.exists());

    let stored = store.find(&TransactionFilter::default()).unwrap();
    assert_eq!(stored.len(), 1, "store must not grow");
}

#[test]
fn test_save_disabled_removes_file_but_records_export() {
    let db_dir = TempDir::new().unwrap();
    let csv_dir = TempDir::new().unwrap();
    let store = create_test_store(&db_dir);

    let service = ExportService::new(test_config(&csv_dir, false), Some(store.clone()), None);
    let outcome = service
        .export_account(
            &test_account(),
            vec![test_transaction("t1", "2024-05-04 10:00")],
            &test_window(),
        )
        .unwrap()
        .unwrap();

    assert_eq!(outcome.file, None);
    let expected = csv_dir.path().join(test_window().file_name(&test_account()));
    assert!(!expected.exists(), "CSV must not remain on disk");

    // The export is still recorded for future deduplication.
    let stored = store.find(&TransactionFilter::default()).unwrap();
    assert_eq!(stored.len(), 1);
}

#[test]
fn test_store_survives_reopen() {
    let db_dir = TempDir::new().unwrap();
    let db_path = db_dir.path().join("test.duckdb");

    {
        let store = DuckDbStore::new(&db_path, "transactions").unwrap();
        store
            .add(&[test_record("123", "t1", "2024-05-04 10:00")])
            .unwrap();
        // Connection released on drop.
    }

    let reopened = DuckDbStore::new(&db_path, "transactions").unwrap();
    let found = reopened
        .find(&TransactionFilter::account_ids("123", vec!["t1".to_string()]))
        .unwrap();
    assert_eq!(found.len(), 1);
}
