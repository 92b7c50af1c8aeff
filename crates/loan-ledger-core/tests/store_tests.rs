use chrono::NaiveDate;
use loan_ledger_core::loans::{Ledger, LoanDraft, LoanSource, PaymentInput, PaymentTerm};
use loan_ledger_core::session::LedgerSession;
use loan_ledger_core::store::{JsonFileStore, LedgerStore};
use rust_decimal_macros::dec;
use std::fs;
use std::path::Path;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn draft() -> LoanDraft {
    LoanDraft {
        source: LoanSource::GrabPayPayLater,
        product_name: None,
        amount: dec!(1200),
        interest_rate: None,
        due_date: date(2024, 6, 15),
        payment_term: Some(PaymentTerm::SixMonths),
    }
}

/// Contents of every quarantined copy of `loans.json`, sorted.
fn corrupt_backups(dir: &Path) -> Vec<Vec<u8>> {
    let mut backups: Vec<Vec<u8>> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("loans.json.corrupt-"))
        })
        .map(|path| fs::read(path).unwrap())
        .collect();
    backups.sort();
    backups
}

// ===========================================================================
// JSON file store
// ===========================================================================

#[test]
fn test_session_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();

    let loan_id = {
        let mut session = LedgerSession::open(JsonFileStore::in_dir(dir.path()));
        let loan = session.create(draft()).unwrap();
        session
            .record_payment(
                &loan.id,
                PaymentInput {
                    amount: dec!(400),
                    date: date(2024, 6, 20),
                    note: Some("two months".into()),
                },
            )
            .unwrap();
        loan.id
    };

    let session = LedgerSession::open(JsonFileStore::in_dir(dir.path()));
    let loan = session.ledger().get(&loan_id).unwrap();
    assert_eq!(loan.remaining_balance, dec!(800));
    assert_eq!(loan.payments.len(), 1);
    assert_eq!(
        loan.installments.iter().filter(|i| i.status.is_paid()).count(),
        2
    );
}

#[test]
fn test_store_entry_is_a_json_array() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::new(dir.path(), "tracker");
    let mut session = LedgerSession::open(store.clone());
    session.create(draft()).unwrap();

    let raw = fs::read_to_string(dir.path().join("tracker.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value.as_array().map(|a| a.len()), Some(1));
    assert_eq!(value[0]["source"], "GrabPay PayLater");
    assert!(!dir.path().join(".tracker.json.tmp").exists());
}

#[test]
fn test_corrupt_store_starts_empty_and_is_kept_aside() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("loans.json");
    fs::write(&path, "{ this is not a ledger").unwrap();

    let store = JsonFileStore::in_dir(dir.path());
    let ledger = store.load();
    assert!(ledger.is_empty());
    assert!(!path.exists());

    assert_eq!(
        corrupt_backups(dir.path()),
        vec![b"{ this is not a ledger".to_vec()]
    );
}

#[test]
fn test_invalid_utf8_store_is_kept_aside_before_next_save() {
    let dir = tempfile::tempdir().unwrap();
    let original = b"[{\"id\":\"x\",\"source\":\"Caf\xe9\"}]".to_vec();
    fs::write(dir.path().join("loans.json"), &original).unwrap();

    let mut session = LedgerSession::open(JsonFileStore::in_dir(dir.path()));
    assert!(session.ledger().is_empty());
    session.create(draft()).unwrap();

    assert_eq!(corrupt_backups(dir.path()), vec![original]);
    let saved = fs::read_to_string(dir.path().join("loans.json")).unwrap();
    assert!(saved.contains("GrabPay PayLater"));
}

#[test]
fn test_repeated_corruption_keeps_every_backup() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("loans.json");
    let store = JsonFileStore::in_dir(dir.path());

    fs::write(&path, "FIRST corrupt").unwrap();
    assert!(store.load().is_empty());
    fs::write(&path, "SECOND corrupt").unwrap();
    assert!(store.load().is_empty());

    assert_eq!(
        corrupt_backups(dir.path()),
        vec![b"FIRST corrupt".to_vec(), b"SECOND corrupt".to_vec()]
    );
}

#[test]
fn test_failed_rename_removes_temp_file() {
    let dir = tempfile::tempdir().unwrap();
    // A non-empty directory where the entry should be makes the rename fail
    let blocker = dir.path().join("loans.json");
    fs::create_dir(&blocker).unwrap();
    fs::write(blocker.join("keep"), "x").unwrap();

    let store = JsonFileStore::in_dir(dir.path());
    let mut ledger = Ledger::new();
    ledger.create(draft()).unwrap();

    assert!(store.save(&ledger).is_err());
    assert!(!dir.path().join(".loans.json.tmp").exists());
    assert!(blocker.join("keep").exists());
}

#[test]
fn test_empty_file_loads_empty_ledger() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("loans.json"), "  \n").unwrap();
    assert!(JsonFileStore::in_dir(dir.path()).load().is_empty());
}

#[test]
fn test_save_creates_missing_directory() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("a").join("b");
    let mut session = LedgerSession::open(JsonFileStore::in_dir(&nested));
    session.create(draft()).unwrap();
    assert!(nested.join("loans.json").exists());
}

#[test]
fn test_legacy_browser_entry_loads() {
    // Shape written by the browser app: numbers, no installments, no interest
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("loans.json"),
        r#"[{
            "id": "1712000000000",
            "source": "BillEase",
            "amount": 3000,
            "remainingBalance": 3000,
            "dueDate": "2024-05-01",
            "status": "active",
            "createdAt": "2024-04-01T10:00:00.000Z",
            "payments": []
        }]"#,
    )
    .unwrap();

    let ledger = JsonFileStore::in_dir(dir.path()).load();
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger.loans()[0].amount, dec!(3000));
}
