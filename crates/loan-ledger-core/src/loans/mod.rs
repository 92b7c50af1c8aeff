//! Loan records, installment schedules and the ledger that mutates them.

pub mod allocation;
pub mod ledger;
mod model;
pub mod schedule;
pub mod summary;

pub use ledger::{InstallmentOutcome, Ledger, PaymentReceipt};
pub use model::*;
