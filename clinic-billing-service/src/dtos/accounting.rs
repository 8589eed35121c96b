use crate::models::AccountingSummary;
use crate::services::money::cents_to_decimal;
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountingSummaryResponse {
    #[serde(with = "rust_decimal::serde::float")]
    pub cash_received: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub pending_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub overdue_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub receivables: Decimal,
    pub invoice_count: i64,
}

impl From<AccountingSummary> for AccountingSummaryResponse {
    fn from(summary: AccountingSummary) -> Self {
        Self {
            cash_received: cents_to_decimal(summary.cash_received_cents),
            pending_amount: cents_to_decimal(summary.pending_cents),
            overdue_amount: cents_to_decimal(summary.overdue_cents),
            receivables: cents_to_decimal(summary.receivables_cents),
            invoice_count: summary.invoice_count,
        }
    }
}
