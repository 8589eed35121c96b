//! Clinic-wide accounting summary.

use super::InvoiceStatus;
use sqlx::FromRow;

/// A non-void invoice with the sum of its payments.
#[derive(Debug, Clone, FromRow)]
pub struct InvoiceBalance {
    pub status: String,
    pub total_cents: i64,
    pub paid_cents: i64,
}

impl InvoiceBalance {
    pub fn outstanding_cents(&self) -> i64 {
        (self.total_cents - self.paid_cents).max(0)
    }
}

/// Cash and receivable totals, in cents.
///
/// `cash_received_cents` counts every payment ever recorded, including payments
/// against invoices that were later voided, while the outstanding figures only
/// consider non-void invoices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountingSummary {
    pub cash_received_cents: i64,
    pub pending_cents: i64,
    pub overdue_cents: i64,
    pub receivables_cents: i64,
    pub invoice_count: i64,
}

impl AccountingSummary {
    /// Fold non-void invoice balances into a summary. `None` if a total overflows.
    pub fn from_balances(cash_received_cents: i64, balances: &[InvoiceBalance]) -> Option<Self> {
        let mut summary = AccountingSummary {
            cash_received_cents,
            invoice_count: balances.len() as i64,
            ..Default::default()
        };

        for balance in balances {
            let outstanding = balance.outstanding_cents();
            summary.receivables_cents = summary.receivables_cents.checked_add(outstanding)?;
            match balance.status.parse::<InvoiceStatus>() {
                Ok(InvoiceStatus::Pending) => {
                    summary.pending_cents = summary.pending_cents.checked_add(outstanding)?;
                }
                Ok(InvoiceStatus::Overdue) => {
                    summary.overdue_cents = summary.overdue_cents.checked_add(outstanding)?;
                }
                _ => {}
            }
        }

        Some(summary)
    }
}
