use chrono::NaiveDate;
use tracing::debug;

use crate::loans::{InstallmentOutcome, Ledger, Loan, LoanDraft, PaymentInput, PaymentReceipt};
use crate::store::LedgerStore;
use crate::{LedgerError, LedgerResult};

/// Application state: the ledger, where it is persisted, and which loan
/// the user is currently editing or paying.
///
/// The store is read once on `open` and written after every successful
/// mutation. A mutation only takes effect in memory once its save has
/// succeeded; rejected operations and failed saves change nothing.
pub struct LedgerSession<S: LedgerStore> {
    ledger: Ledger,
    store: S,
    editing: Option<String>,
    selected_for_payment: Option<String>,
}

impl<S: LedgerStore> LedgerSession<S> {
    pub fn open(store: S) -> Self {
        let ledger = store.load();
        debug!(loans = ledger.len(), "session opened");
        LedgerSession {
            ledger,
            store,
            editing: None,
            selected_for_payment: None,
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Run a mutation against a copy of the ledger and keep the copy only
    /// once it is saved, so a failed save leaves memory matching the store.
    /// `should_save` decides whether the outcome changed anything.
    fn commit<T>(
        &mut self,
        mutation: impl FnOnce(&mut Ledger) -> LedgerResult<T>,
        should_save: impl FnOnce(&T) -> bool,
    ) -> LedgerResult<T> {
        let mut next = self.ledger.clone();
        let outcome = mutation(&mut next)?;
        if should_save(&outcome) {
            self.store.save(&next)?;
            self.ledger = next;
        }
        Ok(outcome)
    }

    // -- Pointers ----------------------------------------------------------

    pub fn begin_edit(&mut self, id: &str) -> LedgerResult<&Loan> {
        self.ledger.get(id)?;
        self.editing = Some(id.to_string());
        self.ledger.get(id)
    }

    pub fn editing(&self) -> Option<&Loan> {
        self.editing
            .as_deref()
            .and_then(|id| self.ledger.get(id).ok())
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    /// Apply the draft to the loan being edited and close the edit.
    pub fn submit_edit(&mut self, draft: LoanDraft) -> LedgerResult<Loan> {
        let id = self.editing.clone().ok_or_else(|| LedgerError::InvalidInput {
            field: "editing".into(),
            reason: "No loan is being edited".into(),
        })?;
        let loan = self.edit(&id, draft)?;
        self.editing = None;
        Ok(loan)
    }

    pub fn select_for_payment(&mut self, id: &str) -> LedgerResult<&Loan> {
        self.ledger.get(id)?;
        self.selected_for_payment = Some(id.to_string());
        self.ledger.get(id)
    }

    pub fn selected_for_payment(&self) -> Option<&Loan> {
        self.selected_for_payment
            .as_deref()
            .and_then(|id| self.ledger.get(id).ok())
    }

    pub fn clear_payment_selection(&mut self) {
        self.selected_for_payment = None;
    }

    // -- Mutations -----------------------------------------------------------

    pub fn create(&mut self, draft: LoanDraft) -> LedgerResult<Loan> {
        self.commit(|ledger| ledger.create(draft).cloned(), |_| true)
    }

    pub fn update(&mut self, loan: Loan) -> LedgerResult<()> {
        self.commit(|ledger| ledger.update(loan), |_| true)
    }

    pub fn edit(&mut self, id: &str, draft: LoanDraft) -> LedgerResult<Loan> {
        self.commit(|ledger| ledger.edit(id, draft).cloned(), |_| true)
    }

    pub fn delete(&mut self, id: &str) -> LedgerResult<Loan> {
        let removed = self.commit(|ledger| ledger.delete(id), |_| true)?;
        if self.editing.as_deref() == Some(id) {
            self.editing = None;
        }
        if self.selected_for_payment.as_deref() == Some(id) {
            self.selected_for_payment = None;
        }
        Ok(removed)
    }

    pub fn record_payment(
        &mut self,
        loan_id: &str,
        input: PaymentInput,
    ) -> LedgerResult<PaymentReceipt> {
        self.commit(|ledger| ledger.record_payment(loan_id, input), |_| true)
    }

    pub fn pay_installment(
        &mut self,
        loan_id: &str,
        installment_id: &str,
        date: NaiveDate,
    ) -> LedgerResult<InstallmentOutcome> {
        self.commit(
            |ledger| ledger.pay_installment(loan_id, installment_id, date),
            |outcome| matches!(outcome, InstallmentOutcome::Paid(_)),
        )
    }

    /// Re-derive overdue state; saves only when a status actually moved.
    pub fn refresh_statuses(&mut self, today: NaiveDate) -> LedgerResult<bool> {
        self.commit(|ledger| Ok(ledger.refresh_statuses(today)), |changed| *changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loans::{LoanSource, PaymentTerm};
    use crate::store::MemoryStore;
    use rust_decimal_macros::dec;
    use std::cell::Cell;

    /// Memory store whose saves can be switched off.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        failing: Cell<bool>,
    }

    impl LedgerStore for FlakyStore {
        fn load(&self) -> Ledger {
            self.inner.load()
        }

        fn save(&self, ledger: &Ledger) -> LedgerResult<()> {
            if self.failing.get() {
                return Err(LedgerError::Storage("disk full".into()));
            }
            self.inner.save(ledger)
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn draft() -> LoanDraft {
        LoanDraft {
            source: LoanSource::HomeCredit,
            product_name: Some("Washing machine".into()),
            amount: dec!(6000),
            interest_rate: None,
            due_date: date(2024, 1, 1),
            payment_term: Some(PaymentTerm::ThreeMonths),
        }
    }

    #[test]
    fn test_mutations_save_and_rejections_do_not() {
        let mut session = LedgerSession::open(MemoryStore::new());
        let loan = session.create(draft()).unwrap();
        assert_eq!(session.store().save_count(), 1);

        let rejected = session.record_payment(
            &loan.id,
            PaymentInput {
                amount: dec!(9000),
                date: date(2024, 1, 2),
                note: None,
            },
        );
        assert!(rejected.is_err());
        assert_eq!(session.store().save_count(), 1);

        session
            .record_payment(
                &loan.id,
                PaymentInput {
                    amount: dec!(2000),
                    date: date(2024, 1, 2),
                    note: Some("first".into()),
                },
            )
            .unwrap();
        assert_eq!(session.store().save_count(), 2);
    }

    #[test]
    fn test_already_paid_installment_is_not_saved() {
        let mut session = LedgerSession::open(MemoryStore::new());
        let loan = session.create(draft()).unwrap();
        let inst = loan.installments[0].id.clone();
        session
            .pay_installment(&loan.id, &inst, date(2024, 1, 1))
            .unwrap();
        let saves = session.store().save_count();
        session
            .pay_installment(&loan.id, &inst, date(2024, 1, 1))
            .unwrap();
        assert_eq!(session.store().save_count(), saves);
    }

    #[test]
    fn test_edit_pointer_flow() {
        let mut session = LedgerSession::open(MemoryStore::new());
        let loan = session.create(draft()).unwrap();

        assert!(session.submit_edit(draft()).is_err());
        session.begin_edit(&loan.id).unwrap();
        assert_eq!(session.editing().map(|l| l.id.clone()), Some(loan.id.clone()));

        let mut changed = draft();
        changed.product_name = Some("Dryer".into());
        let edited = session.submit_edit(changed).unwrap();
        assert_eq!(edited.product_name.as_deref(), Some("Dryer"));
        assert!(session.editing().is_none());
    }

    #[test]
    fn test_delete_clears_pointers() {
        let mut session = LedgerSession::open(MemoryStore::new());
        let loan = session.create(draft()).unwrap();
        session.begin_edit(&loan.id).unwrap();
        session.select_for_payment(&loan.id).unwrap();
        session.delete(&loan.id).unwrap();
        assert!(session.editing().is_none());
        assert!(session.selected_for_payment().is_none());
        assert!(session.select_for_payment(&loan.id).is_err());
    }

    #[test]
    fn test_reopen_sees_saved_state() {
        let store = MemoryStore::new();
        let mut session = LedgerSession::open(store);
        let loan = session.create(draft()).unwrap();
        let raw = session.store().contents().unwrap();

        let reopened = LedgerSession::open(MemoryStore::with_contents(raw));
        assert_eq!(reopened.ledger().get(&loan.id).unwrap(), &loan);
    }

    #[test]
    fn test_failed_save_leaves_ledger_unchanged() {
        let mut session = LedgerSession::open(FlakyStore::default());
        let loan = session.create(draft()).unwrap();
        let before = session.ledger().clone();

        session.store().failing.set(true);
        let paid = session.record_payment(
            &loan.id,
            PaymentInput {
                amount: dec!(2000),
                date: date(2024, 1, 2),
                note: None,
            },
        );
        assert!(matches!(paid, Err(LedgerError::Storage(_))));
        assert!(session.create(draft()).is_err());
        assert!(session.delete(&loan.id).is_err());
        assert_eq!(session.ledger(), &before);

        session.store().failing.set(false);
        let reopened = LedgerSession::open(MemoryStore::with_contents(
            session.store().inner.contents().unwrap(),
        ));
        assert_eq!(reopened.ledger(), session.ledger());
    }
}
