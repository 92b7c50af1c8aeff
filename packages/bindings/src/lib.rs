use chrono::NaiveDate;
use napi::Result as NapiResult;
use napi_derive::napi;
use serde::Serialize;

use loan_ledger_core::loans::schedule::{self, ScheduleInput};
use loan_ledger_core::loans::summary;
use loan_ledger_core::loans::{Ledger, Loan, LoanDraft, PaymentInput};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// The caller owns the stored ledger: every mutation takes the current
/// JSON array and hands back the new one next to the operation result.
#[derive(Serialize)]
struct Mutation<'a, T: Serialize> {
    ledger: &'a Ledger,
    result: T,
}

fn parse_ledger(ledger_json: &str) -> NapiResult<Ledger> {
    if ledger_json.trim().is_empty() {
        return Ok(Ledger::new());
    }
    serde_json::from_str(ledger_json).map_err(to_napi_error)
}

fn parse_date(date: &str) -> NapiResult<NaiveDate> {
    date.parse::<NaiveDate>().map_err(to_napi_error)
}

fn respond<T: Serialize>(ledger: &Ledger, result: T) -> NapiResult<String> {
    serde_json::to_string(&Mutation { ledger, result }).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------------

#[napi]
pub fn generate_schedule(input_json: String) -> NapiResult<String> {
    let input: ScheduleInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = schedule::preview_schedule(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Ledger mutations
// ---------------------------------------------------------------------------

#[napi]
pub fn create_loan(ledger_json: String, draft_json: String) -> NapiResult<String> {
    let mut ledger = parse_ledger(&ledger_json)?;
    let draft: LoanDraft = serde_json::from_str(&draft_json).map_err(to_napi_error)?;
    let loan = ledger.create(draft).map_err(to_napi_error)?.clone();
    respond(&ledger, loan)
}

#[napi]
pub fn update_loan(ledger_json: String, loan_json: String) -> NapiResult<String> {
    let mut ledger = parse_ledger(&ledger_json)?;
    let loan: Loan = serde_json::from_str(&loan_json).map_err(to_napi_error)?;
    let id = loan.id.clone();
    ledger.update(loan).map_err(to_napi_error)?;
    let stored = ledger.get(&id).map_err(to_napi_error)?.clone();
    respond(&ledger, stored)
}

#[napi]
pub fn edit_loan(ledger_json: String, loan_id: String, draft_json: String) -> NapiResult<String> {
    let mut ledger = parse_ledger(&ledger_json)?;
    let draft: LoanDraft = serde_json::from_str(&draft_json).map_err(to_napi_error)?;
    let loan = ledger.edit(&loan_id, draft).map_err(to_napi_error)?.clone();
    respond(&ledger, loan)
}

#[napi]
pub fn delete_loan(ledger_json: String, loan_id: String) -> NapiResult<String> {
    let mut ledger = parse_ledger(&ledger_json)?;
    let removed = ledger.delete(&loan_id).map_err(to_napi_error)?;
    respond(&ledger, removed)
}

#[napi]
pub fn record_payment(
    ledger_json: String,
    loan_id: String,
    payment_json: String,
) -> NapiResult<String> {
    let mut ledger = parse_ledger(&ledger_json)?;
    let input: PaymentInput = serde_json::from_str(&payment_json).map_err(to_napi_error)?;
    let receipt = ledger
        .record_payment(&loan_id, input)
        .map_err(to_napi_error)?;
    respond(&ledger, receipt)
}

#[napi]
pub fn pay_installment(
    ledger_json: String,
    loan_id: String,
    installment_id: String,
    date: String,
) -> NapiResult<String> {
    let mut ledger = parse_ledger(&ledger_json)?;
    let outcome = ledger
        .pay_installment(&loan_id, &installment_id, parse_date(&date)?)
        .map_err(to_napi_error)?;
    respond(&ledger, outcome)
}

#[napi]
pub fn refresh_statuses(ledger_json: String, today: String) -> NapiResult<String> {
    let mut ledger = parse_ledger(&ledger_json)?;
    let changed = ledger.refresh_statuses(parse_date(&today)?);
    respond(&ledger, changed)
}

// ---------------------------------------------------------------------------
// Portfolio
// ---------------------------------------------------------------------------

#[napi]
pub fn ledger_summary(ledger_json: String) -> NapiResult<String> {
    let ledger = parse_ledger(&ledger_json)?;
    let output = summary::summarize(ledger.loans());
    serde_json::to_string(&output).map_err(to_napi_error)
}
