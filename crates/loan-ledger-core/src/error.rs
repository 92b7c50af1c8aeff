use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Payment of {amount} exceeds remaining balance of {remaining}")]
    PaymentExceedsBalance { amount: Decimal, remaining: Decimal },

    #[error("Loan not found: {0}")]
    LoanNotFound(String),

    #[error("Installment {installment_id} not found on loan {loan_id}")]
    InstallmentNotFound {
        loan_id: String,
        installment_id: String,
    },

    #[error("Date error: {0}")]
    DateError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<serde_json::Error> for LedgerError {
    fn from(e: serde_json::Error) -> Self {
        LedgerError::SerializationError(e.to_string())
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(e: std::io::Error) -> Self {
        LedgerError::Storage(e.to_string())
    }
}
