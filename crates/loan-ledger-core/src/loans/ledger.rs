use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::allocation::{allocate_payment, apply_allocation};
use super::model::*;
use super::schedule::{generate_schedule, monthly_installment};
use crate::{types::*, LedgerError, LedgerResult};

// ---------------------------------------------------------------------------
// Operation results
// ---------------------------------------------------------------------------

/// Outcome of a successful payment against a loan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReceipt {
    pub loan_id: String,
    pub payment: Payment,
    pub remaining_balance: Money,
    pub status: LoanStatus,
    /// Months whose installments this payment flipped to paid
    pub installments_paid: Vec<u32>,
    /// Part of the payment not matched to a whole installment. It still
    /// reduces the balance.
    pub unapplied: Money,
    pub settled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum InstallmentOutcome {
    Paid(PaymentReceipt),
    #[serde(rename_all = "camelCase")]
    AlreadyPaid {
        loan_id: String,
        installment_id: String,
    },
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// The in-memory collection of loans. Serializes as a plain JSON array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ledger {
    loans: Vec<Loan>,
}

impl Ledger {
    pub fn new() -> Self {
        Ledger::default()
    }

    pub fn from_loans(loans: Vec<Loan>) -> Self {
        Ledger { loans }
    }

    pub fn loans(&self) -> &[Loan] {
        &self.loans
    }

    pub fn len(&self) -> usize {
        self.loans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loans.is_empty()
    }

    pub fn get(&self, id: &str) -> LedgerResult<&Loan> {
        self.loans
            .iter()
            .find(|l| l.id == id)
            .ok_or_else(|| LedgerError::LoanNotFound(id.to_string()))
    }

    fn get_mut(&mut self, id: &str) -> LedgerResult<&mut Loan> {
        self.loans
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| LedgerError::LoanNotFound(id.to_string()))
    }

    /// Add a new loan from a submitted form.
    pub fn create(&mut self, draft: LoanDraft) -> LedgerResult<&Loan> {
        draft.validate()?;

        let term = draft.term();
        let installments = generate_schedule(draft.amount, term, draft.due_date)?;
        let loan = Loan {
            id: new_id(),
            source: draft.source,
            product_name: draft.product_name.map(|n| n.trim().to_string()),
            amount: draft.amount,
            interest_rate: draft.interest_rate,
            remaining_balance: draft.amount,
            due_date: draft.due_date,
            payment_term: term,
            monthly_installment: monthly_installment(draft.amount, term),
            installments,
            status: LoanStatus::Active,
            created_at: Utc::now(),
            payments: Vec::new(),
        };

        info!(loan_id = %loan.id, source = %loan.source, amount = %loan.amount, "loan created");
        self.loans.push(loan);
        Ok(&self.loans[self.loans.len() - 1])
    }

    /// Replace the stored record with the same id. Balance and status are
    /// re-derived from the record's payments. The schedule is rebuilt when
    /// amount, term or due date moved, or when the record's installments no
    /// longer add up to its amount.
    pub fn update(&mut self, mut loan: Loan) -> LedgerResult<()> {
        if loan.amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidInput {
                field: "amount".into(),
                reason: "Loan amount must be positive".into(),
            });
        }

        let slot = self.get_mut(&loan.id)?;
        let scheduled: Money = loan.installments.iter().map(|i| i.amount).sum();
        let reschedule = loan.amount != slot.amount
            || loan.payment_term != slot.payment_term
            || loan.due_date != slot.due_date
            || loan.installments.len() as u32 != loan.payment_term.months()
            || scheduled != loan.amount;

        if reschedule {
            rebuild_schedule(&mut loan)?;
            debug!(loan_id = %loan.id, months = loan.payment_term.months(), "schedule regenerated");
        } else {
            loan.monthly_installment = monthly_installment(loan.amount, loan.payment_term);
        }
        loan.recompute_balance();
        loan.sync_status();
        debug!(loan_id = %loan.id, remaining = %loan.remaining_balance, "loan replaced");
        *slot = loan;
        Ok(())
    }

    /// Apply an edit form to an existing loan. The schedule is regenerated
    /// only when amount, term or due date change; payments are kept and
    /// replayed onto the new schedule.
    pub fn edit(&mut self, id: &str, draft: LoanDraft) -> LedgerResult<&Loan> {
        draft.validate()?;
        let term = draft.term();

        let loan = self.get_mut(id)?;
        let reschedule = loan.amount != draft.amount
            || loan.payment_term != term
            || loan.due_date != draft.due_date
            || loan.installments.is_empty();

        // Work on a copy so a failed reschedule leaves the record unchanged.
        let mut edited = loan.clone();
        edited.source = draft.source;
        edited.product_name = draft.product_name.map(|n| n.trim().to_string());
        edited.interest_rate = draft.interest_rate;
        edited.amount = draft.amount;
        edited.payment_term = term;
        edited.due_date = draft.due_date;

        if reschedule {
            rebuild_schedule(&mut edited)?;
            debug!(loan_id = %id, months = term.months(), "schedule regenerated");
        }

        edited.recompute_balance();
        edited.sync_status();
        *loan = edited;
        Ok(&*loan)
    }

    /// Remove a loan and hand it back.
    pub fn delete(&mut self, id: &str) -> LedgerResult<Loan> {
        let index = self
            .loans
            .iter()
            .position(|l| l.id == id)
            .ok_or_else(|| LedgerError::LoanNotFound(id.to_string()))?;
        let removed = self.loans.remove(index);
        info!(loan_id = %id, "loan deleted");
        Ok(removed)
    }

    /// Record a lump-sum payment. Rejected payments leave the loan untouched.
    pub fn record_payment(
        &mut self,
        loan_id: &str,
        input: PaymentInput,
    ) -> LedgerResult<PaymentReceipt> {
        let loan = self.get_mut(loan_id)?;

        if input.amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidInput {
                field: "amount".into(),
                reason: "Payment amount must be positive".into(),
            });
        }
        if input.amount > loan.remaining_balance {
            return Err(LedgerError::PaymentExceedsBalance {
                amount: input.amount,
                remaining: loan.remaining_balance,
            });
        }

        let payment = Payment {
            id: new_id(),
            amount: input.amount,
            date: input.date,
            note: input.note.filter(|n| !n.trim().is_empty()),
            installment_id: None,
        };

        let allocation = allocate_payment(&loan.installments, payment.amount);
        let mut installments_paid = apply_allocation(&mut loan.installments, &allocation);

        loan.payments.push(payment.clone());
        loan.remaining_balance = (loan.remaining_balance - payment.amount).max(Decimal::ZERO);

        let settled = loan.is_settled();
        if settled {
            // Settlement closes out whatever the whole-installment walk left.
            for installment in loan.installments.iter().filter(|i| !i.status.is_paid()) {
                installments_paid.push(installment.month);
            }
            installments_paid.sort_unstable();
            info!(loan_id = %loan_id, "loan settled");
        }
        loan.sync_status();

        debug!(
            loan_id = %loan_id,
            amount = %payment.amount,
            remaining = %loan.remaining_balance,
            unapplied = %allocation.unapplied,
            "payment recorded"
        );

        Ok(PaymentReceipt {
            loan_id: loan_id.to_string(),
            payment,
            remaining_balance: loan.remaining_balance,
            status: loan.status,
            installments_paid,
            unapplied: if settled {
                Decimal::ZERO
            } else {
                allocation.unapplied
            },
            settled,
        })
    }

    /// Mark a single installment paid, recording its amount as a payment.
    /// Paying an installment that is already paid changes nothing.
    pub fn pay_installment(
        &mut self,
        loan_id: &str,
        installment_id: &str,
        date: NaiveDate,
    ) -> LedgerResult<InstallmentOutcome> {
        let loan = self.get_mut(loan_id)?;
        let index = loan
            .installments
            .iter()
            .position(|i| i.id == installment_id)
            .ok_or_else(|| LedgerError::InstallmentNotFound {
                loan_id: loan_id.to_string(),
                installment_id: installment_id.to_string(),
            })?;

        if loan.installments[index].status.is_paid() {
            debug!(loan_id = %loan_id, installment_id = %installment_id, "installment already paid");
            return Ok(InstallmentOutcome::AlreadyPaid {
                loan_id: loan_id.to_string(),
                installment_id: installment_id.to_string(),
            });
        }

        let month = loan.installments[index].month;
        let amount = loan.installments[index]
            .amount
            .min(loan.remaining_balance)
            .max(Decimal::ZERO);

        let payment = Payment {
            id: new_id(),
            amount,
            date,
            note: Some(format!("Month {month} installment")),
            installment_id: Some(installment_id.to_string()),
        };

        loan.installments[index].status = InstallmentStatus::Paid;
        loan.payments.push(payment.clone());
        loan.remaining_balance = (loan.remaining_balance - amount).max(Decimal::ZERO);

        let settled = loan.is_settled();
        let mut installments_paid = vec![month];
        if settled {
            for installment in loan.installments.iter().filter(|i| !i.status.is_paid()) {
                installments_paid.push(installment.month);
            }
            installments_paid.sort_unstable();
            info!(loan_id = %loan_id, "loan settled");
        }
        loan.sync_status();

        debug!(loan_id = %loan_id, month, amount = %amount, "installment paid");

        Ok(InstallmentOutcome::Paid(PaymentReceipt {
            loan_id: loan_id.to_string(),
            payment,
            remaining_balance: loan.remaining_balance,
            status: loan.status,
            installments_paid,
            unapplied: Decimal::ZERO,
            settled,
        }))
    }

    /// Derive overdue state as of `today`. Returns true when anything changed.
    pub fn refresh_statuses(&mut self, today: NaiveDate) -> bool {
        let mut changed = false;
        for loan in &mut self.loans {
            for installment in &mut loan.installments {
                if installment.status == InstallmentStatus::Pending && installment.due_date < today
                {
                    installment.status = InstallmentStatus::Overdue;
                    changed = true;
                }
            }

            let status = if loan.is_settled() {
                LoanStatus::Paid
            } else if loan.due_date < today {
                LoanStatus::Overdue
            } else {
                LoanStatus::Active
            };
            if loan.status != status {
                debug!(loan_id = %loan.id, from = %loan.status, to = %status, "status refreshed");
                loan.status = status;
                changed = true;
            }
        }
        changed
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

/// Regenerate the loan's schedule from its amount, term and due date, then
/// re-mark installments paid by replaying the total paid in month order.
fn rebuild_schedule(loan: &mut Loan) -> LedgerResult<()> {
    let mut installments = generate_schedule(loan.amount, loan.payment_term, loan.due_date)?;
    let replay = allocate_payment(&installments, loan.total_paid());
    apply_allocation(&mut installments, &replay);
    loan.installments = installments;
    loan.monthly_installment = monthly_installment(loan.amount, loan.payment_term);
    Ok(())
}
