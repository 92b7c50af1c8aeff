use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::model::{Loan, LoanSource, LoanStatus};
use crate::types::*;

/// The next unpaid installment across all loans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpcomingInstallment {
    pub loan_id: String,
    pub source: LoanSource,
    pub month: u32,
    pub amount: Money,
    pub due_date: NaiveDate,
}

/// Portfolio totals shown above the loan list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSummary {
    pub loan_count: usize,
    pub total_borrowed: Money,
    /// Sum of remaining balances
    pub total_debt: Money,
    /// total_borrowed - total_debt
    pub total_paid: Money,
    pub active_loans: usize,
    pub overdue_loans: usize,
    pub paid_loans: usize,
    /// Repaid share of everything borrowed, as a whole percentage
    pub progress_percent: Decimal,
    pub next_due: Option<UpcomingInstallment>,
}

pub fn summarize(loans: &[Loan]) -> ComputationOutput<LedgerSummary> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if loans.is_empty() {
        warnings.push("No loans recorded; all totals are zero".into());
    }

    let total_borrowed: Money = loans.iter().map(|l| l.amount).sum();
    let total_debt: Money = loans.iter().map(|l| l.remaining_balance).sum();
    let total_paid = total_borrowed - total_debt;

    let count = |status: LoanStatus| loans.iter().filter(|l| l.status == status).count();

    let progress_percent = if total_borrowed > Decimal::ZERO {
        (total_paid / total_borrowed * Decimal::ONE_HUNDRED).round_dp(0)
    } else {
        Decimal::ZERO
    };

    let next_due = loans
        .iter()
        .filter(|l| !l.is_settled())
        .filter_map(|l| {
            l.next_unpaid().map(|i| UpcomingInstallment {
                loan_id: l.id.clone(),
                source: l.source,
                month: i.month,
                amount: i.amount,
                due_date: i.due_date,
            })
        })
        .min_by_key(|u| u.due_date);

    let legacy = loans
        .iter()
        .filter(|l| l.installments.is_empty() && !l.is_settled())
        .count();
    if legacy > 0 {
        warnings.push(format!(
            "{legacy} open loan(s) have no installment schedule and are excluded from next_due"
        ));
    }

    let output = LedgerSummary {
        loan_count: loans.len(),
        total_borrowed,
        total_debt,
        total_paid,
        active_loans: count(LoanStatus::Active),
        overdue_loans: count(LoanStatus::Overdue),
        paid_loans: count(LoanStatus::Paid),
        progress_percent,
        next_due,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    let assumptions = serde_json::json!({
        "totalDebt": "sum of remaining balances",
        "totalPaid": "total borrowed minus total debt",
        "statuses": "as of the last status refresh",
    });

    with_metadata(
        "Loan Portfolio Summary",
        &assumptions,
        warnings,
        elapsed,
        output,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loans::ledger::Ledger;
    use crate::loans::model::{LoanDraft, PaymentInput, PaymentTerm};
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_empty_ledger_summary() {
        let out = summarize(&[]);
        assert_eq!(out.result.loan_count, 0);
        assert_eq!(out.result.total_debt, Decimal::ZERO);
        assert_eq!(out.result.next_due, None);
        assert_eq!(out.warnings.len(), 1);
    }

    #[test]
    fn test_totals_and_next_due() {
        let mut ledger = Ledger::new();
        let first = ledger
            .create(LoanDraft {
                source: LoanSource::GCashGLoan,
                product_name: None,
                amount: dec!(6000),
                interest_rate: None,
                due_date: date(2024, 3, 10),
                payment_term: Some(PaymentTerm::ThreeMonths),
            })
            .unwrap()
            .id
            .clone();
        ledger
            .create(LoanDraft {
                source: LoanSource::BillEase,
                product_name: Some("Headphones".into()),
                amount: dec!(1200),
                interest_rate: None,
                due_date: date(2024, 2, 20),
                payment_term: Some(PaymentTerm::OneMonth),
            })
            .unwrap();

        ledger
            .record_payment(
                &first,
                PaymentInput {
                    amount: dec!(2000),
                    date: date(2024, 3, 1),
                    note: None,
                },
            )
            .unwrap();

        let out = summarize(ledger.loans());
        let s = &out.result;
        assert_eq!(s.loan_count, 2);
        assert_eq!(s.total_borrowed, dec!(7200));
        assert_eq!(s.total_debt, dec!(5200));
        assert_eq!(s.total_paid, dec!(2000));
        assert_eq!(s.active_loans, 2);
        assert_eq!(s.progress_percent, dec!(28));

        let next = s.next_due.as_ref().unwrap();
        assert_eq!(next.source, LoanSource::BillEase);
        assert_eq!(next.due_date, date(2024, 2, 20));
    }
}
