use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{types::*, LedgerError, LedgerResult};

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

/// Lender or pay-later product the loan was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoanSource {
    #[serde(rename = "Shopee PayLater")]
    ShopeePayLater,
    #[serde(rename = "GCash GLoan")]
    GCashGLoan,
    #[serde(rename = "GrabPay PayLater")]
    GrabPayPayLater,
    BillEase,
    Cashalo,
    #[serde(rename = "Home Credit")]
    HomeCredit,
    Other,
}

impl LoanSource {
    pub const ALL: [LoanSource; 7] = [
        LoanSource::ShopeePayLater,
        LoanSource::GCashGLoan,
        LoanSource::GrabPayPayLater,
        LoanSource::BillEase,
        LoanSource::Cashalo,
        LoanSource::HomeCredit,
        LoanSource::Other,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            LoanSource::ShopeePayLater => "Shopee PayLater",
            LoanSource::GCashGLoan => "GCash GLoan",
            LoanSource::GrabPayPayLater => "GrabPay PayLater",
            LoanSource::BillEase => "BillEase",
            LoanSource::Cashalo => "Cashalo",
            LoanSource::HomeCredit => "Home Credit",
            LoanSource::Other => "Other",
        }
    }
}

impl fmt::Display for LoanSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Accepts the display label in any case, or a kebab/snake form
/// ("shopee-paylater", "home_credit").
impl FromStr for LoanSource {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize_label(s);
        LoanSource::ALL
            .iter()
            .copied()
            .find(|source| normalize_label(source.label()) == wanted)
            .ok_or_else(|| LedgerError::InvalidInput {
                field: "source".into(),
                reason: format!(
                    "Unknown loan source '{s}'. Expected one of: {}",
                    LoanSource::ALL
                        .iter()
                        .map(|src| src.label())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            })
    }
}

fn normalize_label(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Number of monthly installments. Only 1, 3, 6 and 12 are offered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum PaymentTerm {
    #[default]
    OneMonth,
    ThreeMonths,
    SixMonths,
    TwelveMonths,
}

impl PaymentTerm {
    pub fn months(&self) -> u32 {
        match self {
            PaymentTerm::OneMonth => 1,
            PaymentTerm::ThreeMonths => 3,
            PaymentTerm::SixMonths => 6,
            PaymentTerm::TwelveMonths => 12,
        }
    }
}

impl TryFrom<u8> for PaymentTerm {
    type Error = LedgerError;

    fn try_from(months: u8) -> Result<Self, Self::Error> {
        match months {
            1 => Ok(PaymentTerm::OneMonth),
            3 => Ok(PaymentTerm::ThreeMonths),
            6 => Ok(PaymentTerm::SixMonths),
            12 => Ok(PaymentTerm::TwelveMonths),
            other => Err(LedgerError::InvalidInput {
                field: "payment_term".into(),
                reason: format!("Payment term must be 1, 3, 6 or 12 months, got {other}"),
            }),
        }
    }
}

impl From<PaymentTerm> for u8 {
    fn from(term: PaymentTerm) -> u8 {
        term.months() as u8
    }
}

impl FromStr for PaymentTerm {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let months: u8 = s.trim().parse().map_err(|_| LedgerError::InvalidInput {
            field: "payment_term".into(),
            reason: format!("'{s}' is not a number of months"),
        })?;
        PaymentTerm::try_from(months)
    }
}

impl fmt::Display for PaymentTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.months())
    }
}

/// Loan status. Derived from the balance and due date, never set directly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    #[default]
    Active,
    Paid,
    Overdue,
}

impl FromStr for LoanStatus {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(LoanStatus::Active),
            "paid" => Ok(LoanStatus::Paid),
            "overdue" => Ok(LoanStatus::Overdue),
            other => Err(LedgerError::InvalidInput {
                field: "status".into(),
                reason: format!("Unknown status '{other}'. Expected active, paid or overdue"),
            }),
        }
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LoanStatus::Active => "active",
            LoanStatus::Paid => "paid",
            LoanStatus::Overdue => "overdue",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallmentStatus {
    #[default]
    Pending,
    Paid,
    Overdue,
}

impl InstallmentStatus {
    pub fn is_paid(&self) -> bool {
        matches!(self, InstallmentStatus::Paid)
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One month of a loan's repayment schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Installment {
    pub id: String,
    /// 1-based month index, unique within the loan
    pub month: u32,
    pub amount: Money,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub status: InstallmentStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: String,
    pub amount: Money,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Set when the payment was generated by paying a single installment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installment_id: Option<String>,
}

/// A tracked loan. Older records without an interest rate or an
/// installment schedule deserialize with those fields empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Loan {
    pub id: String,
    pub source: LoanSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    pub amount: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interest_rate: Option<Rate>,
    pub remaining_balance: Money,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub payment_term: PaymentTerm,
    #[serde(default)]
    pub monthly_installment: Money,
    #[serde(default)]
    pub installments: Vec<Installment>,
    #[serde(default)]
    pub status: LoanStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub payments: Vec<Payment>,
}

impl Loan {
    pub fn total_paid(&self) -> Money {
        self.payments.iter().map(|p| p.amount).sum()
    }

    pub fn is_settled(&self) -> bool {
        self.remaining_balance <= Decimal::ZERO
    }

    /// Share of the principal repaid, as a whole percentage.
    pub fn progress_percent(&self) -> Decimal {
        if self.amount <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        ((self.amount - self.remaining_balance) / self.amount * Decimal::ONE_HUNDRED).round_dp(0)
    }

    pub fn installment(&self, installment_id: &str) -> Option<&Installment> {
        self.installments.iter().find(|i| i.id == installment_id)
    }

    pub fn installment_for_month(&self, month: u32) -> Option<&Installment> {
        self.installments.iter().find(|i| i.month == month)
    }

    /// First unpaid installment in month order.
    pub fn next_unpaid(&self) -> Option<&Installment> {
        self.installments
            .iter()
            .filter(|i| !i.status.is_paid())
            .min_by_key(|i| i.month)
    }

    /// The editable fields of this loan, as a form would be pre-filled.
    pub fn to_draft(&self) -> LoanDraft {
        LoanDraft {
            source: self.source,
            product_name: self.product_name.clone(),
            amount: self.amount,
            interest_rate: self.interest_rate,
            due_date: self.due_date,
            payment_term: Some(self.payment_term),
        }
    }

    /// Re-derive the balance from the payment list, clamped to [0, amount].
    pub(crate) fn recompute_balance(&mut self) {
        let outstanding = self.amount - self.total_paid();
        self.remaining_balance = outstanding.max(Decimal::ZERO).min(self.amount);
    }

    /// Bring status and installments in line with the balance. A settled
    /// loan has every installment paid; an unsettled one is never `paid`.
    pub(crate) fn sync_status(&mut self) {
        if self.is_settled() {
            self.remaining_balance = Decimal::ZERO;
            self.status = LoanStatus::Paid;
            for installment in &mut self.installments {
                installment.status = InstallmentStatus::Paid;
            }
        } else if self.status == LoanStatus::Paid {
            self.status = LoanStatus::Active;
        }
    }
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Fields a user fills in when adding or editing a loan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanDraft {
    pub source: LoanSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    pub amount: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interest_rate: Option<Rate>,
    pub due_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_term: Option<PaymentTerm>,
}

impl LoanDraft {
    pub fn term(&self) -> PaymentTerm {
        self.payment_term.unwrap_or_default()
    }

    pub fn validate(&self) -> LedgerResult<()> {
        if self.amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidInput {
                field: "amount".into(),
                reason: "Loan amount must be positive".into(),
            });
        }
        if let Some(name) = &self.product_name {
            if name.trim().is_empty() {
                return Err(LedgerError::InvalidInput {
                    field: "product_name".into(),
                    reason: "Product name must not be blank when given".into(),
                });
            }
        }
        if let Some(rate) = self.interest_rate {
            if rate < Decimal::ZERO {
                return Err(LedgerError::InvalidInput {
                    field: "interest_rate".into(),
                    reason: "Interest rate cannot be negative".into(),
                });
            }
        }
        Ok(())
    }
}

/// A lump-sum payment entered against a loan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInput {
    pub amount: Money,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_source_parses_labels_and_kebab_forms() {
        assert_eq!(
            "Shopee PayLater".parse::<LoanSource>().unwrap(),
            LoanSource::ShopeePayLater
        );
        assert_eq!(
            "gcash-gloan".parse::<LoanSource>().unwrap(),
            LoanSource::GCashGLoan
        );
        assert_eq!(
            "home_credit".parse::<LoanSource>().unwrap(),
            LoanSource::HomeCredit
        );
        assert!("Payday Shark".parse::<LoanSource>().is_err());
    }

    #[test]
    fn test_source_serializes_as_label() {
        let json = serde_json::to_string(&LoanSource::GrabPayPayLater).unwrap();
        assert_eq!(json, "\"GrabPay PayLater\"");
    }

    #[test]
    fn test_payment_term_serializes_as_number() {
        assert_eq!(serde_json::to_string(&PaymentTerm::SixMonths).unwrap(), "6");
        let term: PaymentTerm = serde_json::from_str("12").unwrap();
        assert_eq!(term, PaymentTerm::TwelveMonths);
        assert!(serde_json::from_str::<PaymentTerm>("4").is_err());
    }

    #[test]
    fn test_payment_term_from_str() {
        assert_eq!("3".parse::<PaymentTerm>().unwrap(), PaymentTerm::ThreeMonths);
        assert!("three".parse::<PaymentTerm>().is_err());
        assert!("2".parse::<PaymentTerm>().is_err());
    }

    #[test]
    fn test_status_round_trips_lowercase() {
        assert_eq!(serde_json::to_string(&LoanStatus::Overdue).unwrap(), "\"overdue\"");
        assert_eq!("PAID".parse::<LoanStatus>().unwrap(), LoanStatus::Paid);
    }

    #[test]
    fn test_draft_rejects_non_positive_amount() {
        let draft = LoanDraft {
            source: LoanSource::BillEase,
            product_name: None,
            amount: dec!(0),
            interest_rate: None,
            due_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            payment_term: None,
        };
        match draft.validate() {
            Err(LedgerError::InvalidInput { field, .. }) => assert_eq!(field, "amount"),
            other => panic!("Expected InvalidInput on amount, got {other:?}"),
        }
    }

    #[test]
    fn test_draft_rejects_blank_product_name() {
        let draft = LoanDraft {
            source: LoanSource::Other,
            product_name: Some("   ".into()),
            amount: dec!(100),
            interest_rate: None,
            due_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            payment_term: Some(PaymentTerm::OneMonth),
        };
        assert!(draft.validate().is_err());
    }

    #[test]
    fn test_legacy_record_without_schedule_deserializes() {
        let json = r#"{
            "id": "1717171717",
            "source": "Cashalo",
            "amount": 1500,
            "remainingBalance": 500,
            "dueDate": "2024-03-15",
            "status": "active",
            "createdAt": "2024-02-01T08:00:00Z",
            "payments": [{"id": "1717171800", "amount": 1000, "date": "2024-02-15"}]
        }"#;
        let loan: Loan = serde_json::from_str(json).unwrap();
        assert_eq!(loan.payment_term, PaymentTerm::OneMonth);
        assert!(loan.installments.is_empty());
        assert_eq!(loan.total_paid(), dec!(1000));
        assert_eq!(loan.progress_percent(), dec!(67));
    }
}
