use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::model::{Installment, InstallmentStatus};
use crate::types::Money;

/// How a lump payment maps onto a loan's installments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Allocation {
    /// Installments fully covered by the payment, in month order
    pub covered: Vec<String>,
    /// Portion of the payment consumed by covered installments
    pub applied: Money,
    /// Portion left over after the last fully covered installment
    pub unapplied: Money,
}

/// Allocate `amount` against the unpaid installments in month order.
///
/// Whole installments only: an installment flips to paid when the rest of
/// the payment covers its full amount. Allocation stops at the first
/// installment that does not fit, and whatever is left is reported as
/// `unapplied` rather than carried as partial credit.
pub fn allocate_payment(installments: &[Installment], amount: Money) -> Allocation {
    let mut unpaid: Vec<&Installment> = installments
        .iter()
        .filter(|i| !i.status.is_paid())
        .collect();
    unpaid.sort_by_key(|i| i.month);

    let mut left = amount.max(Decimal::ZERO);
    let mut allocation = Allocation::default();

    for installment in unpaid {
        if installment.amount > left {
            break;
        }
        left -= installment.amount;
        allocation.applied += installment.amount;
        allocation.covered.push(installment.id.clone());
    }

    allocation.unapplied = left;
    allocation
}

/// Mark the covered installments paid. Returns the months flipped.
pub fn apply_allocation(installments: &mut [Installment], allocation: &Allocation) -> Vec<u32> {
    let mut months = Vec::with_capacity(allocation.covered.len());
    for installment in installments.iter_mut() {
        if allocation.covered.contains(&installment.id) && !installment.status.is_paid() {
            installment.status = InstallmentStatus::Paid;
            months.push(installment.month);
        }
    }
    months.sort_unstable();
    months
}
