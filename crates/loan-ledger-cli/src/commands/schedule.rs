use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use loan_ledger_core::loans::schedule::{self, ScheduleInput};
use loan_ledger_core::loans::PaymentTerm;

use crate::input;

/// Arguments for a schedule preview
#[derive(Args)]
pub struct ScheduleArgs {
    /// Path to JSON input file
    #[arg(long)]
    pub input: Option<String>,

    /// Principal amount
    #[arg(long)]
    pub amount: Option<Decimal>,

    /// Payment term in months: 1, 3, 6 or 12
    #[arg(long, default_value = "1")]
    pub term: PaymentTerm,

    /// Due date of the first installment (YYYY-MM-DD)
    #[arg(long)]
    pub start: Option<NaiveDate>,
}

pub fn run_schedule(args: ScheduleArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let schedule_input: ScheduleInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let (Some(amount), Some(start_date)) = (args.amount, args.start) {
        ScheduleInput {
            amount,
            payment_term: args.term,
            start_date,
        }
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--amount and --start (or --input <file.json> or stdin) required for a schedule preview".into());
    };
    let result = schedule::preview_schedule(&schedule_input)?;
    Ok(serde_json::to_value(result)?)
}
