//! Invoice model for clinic-billing-service.

use super::Payment;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Invoice status. Any status may move to any other; only `Paid` has a side effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Pending,
    Paid,
    Overdue,
    Void,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid status.")]
pub struct InvoiceStatusError;

impl InvoiceStatus {
    pub const ALL: [InvoiceStatus; 4] = [
        InvoiceStatus::Pending,
        InvoiceStatus::Paid,
        InvoiceStatus::Overdue,
        InvoiceStatus::Void,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
            InvoiceStatus::Void => "void",
        }
    }
}

impl FromStr for InvoiceStatus {
    type Err = InvoiceStatusError;

    /// Case-insensitive, surrounding whitespace ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(InvoiceStatus::Pending),
            "paid" => Ok(InvoiceStatus::Paid),
            "overdue" => Ok(InvoiceStatus::Overdue),
            "void" => Ok(InvoiceStatus::Void),
            _ => Err(InvoiceStatusError),
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored invoice row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Invoice {
    pub id: String,
    pub invoice_number: String,
    pub patient_id: Option<String>,
    pub patient_name: String,
    pub patient_contact: Option<String>,
    pub invoice_date: NaiveDate,
    pub status: String,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub currency: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Invoice row as returned by the list query, with derived payment figures.
#[derive(Debug, Clone, FromRow)]
pub struct InvoiceListEntry {
    pub id: String,
    pub invoice_number: String,
    pub patient_name: String,
    pub patient_contact: Option<String>,
    pub invoice_date: NaiveDate,
    pub status: String,
    pub total_cents: i64,
    pub paid_cents: i64,
    pub outstanding_cents: i64,
    /// Item names joined with ", ".
    pub service: Option<String>,
}

/// Filter parameters for listing invoices. `None` fields do not filter.
#[derive(Debug, Clone, Default)]
pub struct ListInvoicesFilter {
    pub query: Option<String>,
    pub status: Option<InvoiceStatus>,
}

/// A normalized line item ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInvoiceItem {
    pub name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

impl NewInvoiceItem {
    pub fn line_total_cents(&self) -> i64 {
        self.unit_price_cents * self.quantity
    }
}

/// A validated invoice submission.
#[derive(Debug, Clone)]
pub struct NewInvoice {
    /// Caller-chosen number; generated when `None`.
    pub invoice_number: Option<String>,
    pub patient_id: Option<String>,
    pub patient_name: String,
    pub patient_contact: Option<String>,
    pub invoice_date: NaiveDate,
    pub status: InvoiceStatus,
    pub items: Vec<NewInvoiceItem>,
    pub tax_cents: i64,
    pub discount_cents: i64,
    pub currency: String,
    pub notes: Option<String>,
}

impl NewInvoice {
    pub fn subtotal_cents(&self) -> i64 {
        self.items.iter().map(NewInvoiceItem::line_total_cents).sum()
    }

    /// `max(0, subtotal + tax - discount)`.
    pub fn total_cents(&self) -> i64 {
        (self.subtotal_cents() + self.tax_cents - self.discount_cents).max(0)
    }
}

/// Input for moving an invoice to a new status.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub status: InvoiceStatus,
    /// Date for the settling payment; defaults to the invoice date.
    pub payment_date: Option<NaiveDate>,
    pub method: Option<String>,
    pub notes: Option<String>,
}

/// Result of a status change: the updated invoice and the settling payment, if one was needed.
#[derive(Debug, Clone)]
pub struct StatusTransition {
    pub invoice: Invoice,
    pub payment: Option<Payment>,
}
