pub mod error;
pub mod types;

#[cfg(feature = "ledger")]
pub mod loans;

#[cfg(feature = "store")]
pub mod store;

#[cfg(feature = "store")]
pub mod session;

pub use error::LedgerError;
pub use types::*;

/// Standard result type for all loan-ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;
