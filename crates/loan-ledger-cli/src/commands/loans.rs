use chrono::{Local, NaiveDate};
use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use loan_ledger_core::loans::summary;
use loan_ledger_core::loans::{LoanDraft, LoanSource, LoanStatus, PaymentInput, PaymentTerm};

use crate::input;
use crate::Session;

/// Arguments for recording a new loan
#[derive(Args)]
pub struct AddArgs {
    /// Path to JSON file with a loan draft
    #[arg(long)]
    pub input: Option<String>,

    /// Lender, e.g. "Shopee PayLater", "gcash-gloan", "home-credit"
    #[arg(long)]
    pub source: Option<LoanSource>,

    /// Optional product or purchase name
    #[arg(long)]
    pub product: Option<String>,

    /// Principal amount
    #[arg(long)]
    pub amount: Option<Decimal>,

    /// Interest rate as a decimal (0.03 = 3%)
    #[arg(long)]
    pub interest_rate: Option<Decimal>,

    /// Due date of the first installment (YYYY-MM-DD)
    #[arg(long)]
    pub due_date: Option<NaiveDate>,

    /// Payment term in months: 1, 3, 6 or 12
    #[arg(long)]
    pub term: Option<PaymentTerm>,
}

/// Arguments for editing a loan. Omitted fields keep their current value.
#[derive(Args)]
pub struct EditArgs {
    /// Loan id
    pub id: String,

    #[arg(long)]
    pub source: Option<LoanSource>,

    #[arg(long)]
    pub product: Option<String>,

    /// Remove the product name
    #[arg(long, conflicts_with = "product")]
    pub clear_product: bool,

    #[arg(long)]
    pub amount: Option<Decimal>,

    #[arg(long)]
    pub interest_rate: Option<Decimal>,

    #[arg(long)]
    pub due_date: Option<NaiveDate>,

    #[arg(long)]
    pub term: Option<PaymentTerm>,
}

/// Arguments for deleting a loan
#[derive(Args)]
pub struct DeleteArgs {
    /// Loan id
    pub id: String,
}

/// Arguments for a lump-sum payment
#[derive(Args)]
pub struct PayArgs {
    /// Loan id
    pub id: String,

    /// Amount paid
    #[arg(long)]
    pub amount: Decimal,

    /// Payment date (YYYY-MM-DD), defaults to today
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Free-text note
    #[arg(long)]
    pub note: Option<String>,
}

/// Arguments for paying a single installment
#[derive(Args)]
pub struct PayInstallmentArgs {
    /// Loan id
    pub id: String,

    /// Installment id
    #[arg(long, conflicts_with = "month", required_unless_present = "month")]
    pub installment: Option<String>,

    /// Installment month number (1-based)
    #[arg(long)]
    pub month: Option<u32>,

    /// Payment date (YYYY-MM-DD), defaults to today
    #[arg(long)]
    pub date: Option<NaiveDate>,
}

/// Arguments for listing loans
#[derive(Args)]
pub struct ListArgs {
    /// Only show loans with this status: active, paid, overdue
    #[arg(long)]
    pub status: Option<LoanStatus>,
}

/// Arguments for showing one loan
#[derive(Args)]
pub struct ShowArgs {
    /// Loan id
    pub id: String,
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn run_add(args: AddArgs, session: &mut Session) -> Result<Value, Box<dyn std::error::Error>> {
    let draft: LoanDraft = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if args.source.is_some() || args.amount.is_some() || args.due_date.is_some() {
        draft_from_flags(args)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err(
            "--source, --amount and --due-date (or --input <file.json> or stdin) required to add a loan"
                .into(),
        );
    };
    let loan = session.create(draft)?;
    Ok(serde_json::to_value(loan)?)
}

fn draft_from_flags(args: AddArgs) -> Result<LoanDraft, Box<dyn std::error::Error>> {
    Ok(LoanDraft {
        source: args.source.ok_or("--source is required")?,
        product_name: args.product,
        amount: args.amount.ok_or("--amount is required")?,
        interest_rate: args.interest_rate,
        due_date: args.due_date.ok_or("--due-date is required")?,
        payment_term: args.term,
    })
}

pub fn run_edit(args: EditArgs, session: &mut Session) -> Result<Value, Box<dyn std::error::Error>> {
    let mut draft = session.begin_edit(&args.id)?.to_draft();

    if let Some(source) = args.source {
        draft.source = source;
    }
    if args.clear_product {
        draft.product_name = None;
    } else if args.product.is_some() {
        draft.product_name = args.product;
    }
    if let Some(amount) = args.amount {
        draft.amount = amount;
    }
    if args.interest_rate.is_some() {
        draft.interest_rate = args.interest_rate;
    }
    if let Some(due_date) = args.due_date {
        draft.due_date = due_date;
    }
    if args.term.is_some() {
        draft.payment_term = args.term;
    }

    let loan = session.submit_edit(draft)?;
    Ok(serde_json::to_value(loan)?)
}

pub fn run_delete(
    args: DeleteArgs,
    session: &mut Session,
) -> Result<Value, Box<dyn std::error::Error>> {
    let removed = session.delete(&args.id)?;
    Ok(serde_json::json!({
        "deleted": removed.id,
        "source": removed.source,
        "remainingLoans": session.ledger().len(),
    }))
}

pub fn run_pay(args: PayArgs, session: &mut Session) -> Result<Value, Box<dyn std::error::Error>> {
    session.select_for_payment(&args.id)?;
    let receipt = session.record_payment(
        &args.id,
        PaymentInput {
            amount: args.amount,
            date: args.date.unwrap_or_else(today),
            note: args.note,
        },
    )?;
    session.clear_payment_selection();
    Ok(serde_json::to_value(receipt)?)
}

pub fn run_pay_installment(
    args: PayInstallmentArgs,
    session: &mut Session,
) -> Result<Value, Box<dyn std::error::Error>> {
    let loan = session.select_for_payment(&args.id)?;
    let installment_id = match (args.installment, args.month) {
        (Some(id), _) => id,
        (None, Some(month)) => loan
            .installment_for_month(month)
            .map(|i| i.id.clone())
            .ok_or_else(|| format!("Loan {} has no installment for month {month}", args.id))?,
        (None, None) => return Err("--installment <ID> or --month <N> required".into()),
    };

    let outcome =
        session.pay_installment(&args.id, &installment_id, args.date.unwrap_or_else(today))?;
    session.clear_payment_selection();
    Ok(serde_json::to_value(outcome)?)
}

pub fn run_list(args: ListArgs, session: &mut Session) -> Result<Value, Box<dyn std::error::Error>> {
    session.refresh_statuses(today())?;
    let loans: Vec<_> = session
        .ledger()
        .loans()
        .iter()
        .filter(|l| args.status.map_or(true, |s| l.status == s))
        .collect();
    Ok(serde_json::to_value(loans)?)
}

pub fn run_show(args: ShowArgs, session: &mut Session) -> Result<Value, Box<dyn std::error::Error>> {
    session.refresh_statuses(today())?;
    let loan = session.ledger().get(&args.id)?;
    let mut value = serde_json::to_value(loan)?;
    if let Value::Object(ref mut map) = value {
        map.insert(
            "progressPercent".into(),
            serde_json::to_value(loan.progress_percent())?,
        );
        map.insert("totalPaid".into(), serde_json::to_value(loan.total_paid())?);
    }
    Ok(value)
}

pub fn run_summary(session: &mut Session) -> Result<Value, Box<dyn std::error::Error>> {
    session.refresh_statuses(today())?;
    let result = summary::summarize(session.ledger().loans());
    Ok(serde_json::to_value(result)?)
}
