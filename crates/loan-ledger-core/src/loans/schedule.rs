use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::model::{new_id, Installment, InstallmentStatus, PaymentTerm};
use crate::{types::*, LedgerError, LedgerResult};

// ---------------------------------------------------------------------------
// Input / Output types
// ---------------------------------------------------------------------------

/// Input for a stateless schedule preview.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleInput {
    pub amount: Money,
    pub payment_term: PaymentTerm,
    /// Due date of the first installment
    pub start_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleOutput {
    pub monthly_installment: Money,
    pub final_installment: Money,
    pub total: Money,
    pub final_due_date: NaiveDate,
    pub installments: Vec<Installment>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Per-month figure for an even split, rounded to the currency scale.
pub fn monthly_installment(amount: Money, term: PaymentTerm) -> Money {
    round_money(amount / Decimal::from(term.months()))
}

/// Due date of the given 1-based month, counted from the first due date.
/// Day-of-month is clamped to the end of shorter months (Jan 31 -> Feb 29).
pub fn installment_due_date(start: NaiveDate, month: u32) -> LedgerResult<NaiveDate> {
    start
        .checked_add_months(Months::new(month.saturating_sub(1)))
        .ok_or_else(|| {
            LedgerError::DateError(format!(
                "{start} + {} months is out of range",
                month.saturating_sub(1)
            ))
        })
}

/// Split `amount` into `term` monthly installments starting at `start_date`.
///
/// Rounding rule: every installment but the last is the rounded even split;
/// the last installment absorbs the rounding remainder, so the schedule
/// always sums to exactly `amount`.
pub fn generate_schedule(
    amount: Money,
    term: PaymentTerm,
    start_date: NaiveDate,
) -> LedgerResult<Vec<Installment>> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::InvalidInput {
            field: "amount".into(),
            reason: "Loan amount must be positive".into(),
        });
    }

    let months = term.months();
    let per_month = monthly_installment(amount, term);
    let leading_total = per_month * Decimal::from(months - 1);
    let final_amount = amount - leading_total;

    if final_amount < Decimal::ZERO {
        return Err(LedgerError::InvalidInput {
            field: "amount".into(),
            reason: format!("{amount} is too small to split across {months} installments"),
        });
    }

    let mut installments = Vec::with_capacity(months as usize);
    for month in 1..=months {
        let installment_amount = if month == months {
            final_amount
        } else {
            per_month
        };
        installments.push(Installment {
            id: new_id(),
            month,
            amount: installment_amount,
            due_date: installment_due_date(start_date, month)?,
            status: InstallmentStatus::Pending,
        });
    }

    Ok(installments)
}

/// Preview the schedule a loan would get, without touching any ledger.
pub fn preview_schedule(
    input: &ScheduleInput,
) -> LedgerResult<ComputationOutput<ScheduleOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let installments = generate_schedule(input.amount, input.payment_term, input.start_date)?;
    let per_month = monthly_installment(input.amount, input.payment_term);
    let total: Money = installments.iter().map(|i| i.amount).sum();

    // generate_schedule always yields at least one installment
    let (final_installment, final_due_date) = installments
        .last()
        .map(|i| (i.amount, i.due_date))
        .unwrap_or((Decimal::ZERO, input.start_date));

    if installments.len() > 1 && final_installment != per_month {
        warnings.push(format!(
            "Final installment of {final_installment} absorbs a rounding remainder of {}",
            final_installment - per_month
        ));
    }
    if input.amount.scale() > CURRENCY_SCALE {
        warnings.push(format!(
            "Amount {} has more than {CURRENCY_SCALE} decimal places; only the final installment carries them",
            input.amount
        ));
    }

    let output = ScheduleOutput {
        monthly_installment: per_month,
        final_installment,
        total,
        final_due_date,
        installments,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    let assumptions = serde_json::json!({
        "split": "even split per month, rounded half away from zero",
        "currencyScale": CURRENCY_SCALE,
        "remainder": "absorbed by the final installment",
        "dueDates": "first due date + (month - 1) months, clamped to month end",
    });

    Ok(with_metadata(
        "Monthly Installment Schedule",
        &assumptions,
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
