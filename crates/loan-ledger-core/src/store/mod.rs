//! Persistence for the ledger: one named entry holding the JSON array of loans.

mod json_file;

pub use json_file::JsonFileStore;

use std::cell::RefCell;
use tracing::warn;

use crate::loans::Ledger;
use crate::LedgerResult;

/// Key the loan array is stored under unless configured otherwise.
pub const DEFAULT_KEY: &str = "loans";

/// Somewhere the full ledger can be read from once and written back after
/// every mutation.
pub trait LedgerStore {
    /// Load the ledger. A missing entry is an empty ledger; an unreadable
    /// or corrupt one is logged and also treated as empty.
    fn load(&self) -> Ledger;

    /// Replace the stored entry with the full serialized ledger.
    fn save(&self, ledger: &Ledger) -> LedgerResult<()>;
}

/// Keeps the serialized entry in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entry: RefCell<Option<String>>,
    saves: RefCell<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Start from an existing raw entry, valid or not.
    pub fn with_contents(raw: impl Into<String>) -> Self {
        MemoryStore {
            entry: RefCell::new(Some(raw.into())),
            saves: RefCell::new(0),
        }
    }

    pub fn contents(&self) -> Option<String> {
        self.entry.borrow().clone()
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> usize {
        *self.saves.borrow()
    }
}

impl LedgerStore for MemoryStore {
    fn load(&self) -> Ledger {
        match self.entry.borrow().as_deref() {
            None => Ledger::new(),
            Some(raw) => serde_json::from_str(raw).unwrap_or_else(|e| {
                warn!(error = %e, "stored ledger is corrupt; starting with an empty ledger");
                Ledger::new()
            }),
        }
    }

    fn save(&self, ledger: &Ledger) -> LedgerResult<()> {
        let raw = serde_json::to_string(ledger)?;
        *self.entry.borrow_mut() = Some(raw);
        *self.saves.borrow_mut() += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loans::{LoanDraft, LoanSource, PaymentTerm};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    #[test]
    fn test_empty_store_loads_empty_ledger() {
        assert!(MemoryStore::new().load().is_empty());
    }

    #[test]
    fn test_corrupt_entry_loads_empty_ledger() {
        let store = MemoryStore::with_contents("[{\"id\": 12");
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_save_then_load_round_trips() {
        let mut ledger = Ledger::new();
        ledger
            .create(LoanDraft {
                source: LoanSource::Cashalo,
                product_name: None,
                amount: dec!(1500),
                interest_rate: Some(dec!(0.05)),
                due_date: NaiveDate::from_ymd_opt(2024, 4, 30).unwrap(),
                payment_term: Some(PaymentTerm::ThreeMonths),
            })
            .unwrap();

        let store = MemoryStore::new();
        store.save(&ledger).unwrap();
        assert_eq!(store.save_count(), 1);
        assert!(store.contents().unwrap().starts_with('['));
        assert_eq!(store.load(), ledger);
    }
}
