use crate::models::{
    Invoice, InvoiceItem, InvoiceListEntry, InvoiceStatus, NewInvoice, NewInvoiceItem, Payment,
    StatusChange,
};
use crate::services::money::{
    cents_to_decimal, non_negative_cents, normalize_quantity, MAX_INVOICE_CENTS,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use service_core::error::AppError;

fn bad_request(message: &'static str) -> AppError {
    AppError::BadRequest(anyhow::anyhow!(message))
}

/// Trimmed, non-empty text.
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Identifiers may arrive as JSON strings or numbers.
fn id_text(value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(s) => non_blank(Some(s)),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Date portion of `YYYY-MM-DD` or any ISO-8601 timestamp.
pub fn parse_date_prefix(value: &str) -> Option<NaiveDate> {
    let date_part = value.trim().split(['T', ' ']).next()?;
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

fn parse_status(value: Option<&str>, default: Option<InvoiceStatus>) -> Result<InvoiceStatus, AppError> {
    match value.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => s.parse().map_err(|_| bad_request("Invalid status.")),
        None => default.ok_or_else(|| bad_request("Invalid status.")),
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvoiceItemRequest {
    pub name: Option<String>,
    pub quantity: Option<Value>,
    pub price: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoiceRequest {
    #[serde(default)]
    pub items: Option<Vec<InvoiceItemRequest>>,
    pub patient_name: Option<String>,
    pub status: Option<String>,
    pub invoice_number: Option<String>,
    pub date: Option<String>,
    pub tax: Option<Value>,
    pub discount: Option<Value>,
    pub patient_id: Option<Value>,
    pub patient_contact: Option<String>,
    pub notes: Option<String>,
}

impl CreateInvoiceRequest {
    /// Validate and normalize the submission.
    pub fn into_new_invoice(self, currency: &str, today: NaiveDate) -> Result<NewInvoice, AppError> {
        let raw_items = self.items.unwrap_or_default();
        if raw_items.is_empty() {
            return Err(bad_request("At least one invoice item is required."));
        }

        let mut items = Vec::with_capacity(raw_items.len());
        let mut subtotal_cents: i64 = 0;
        for raw in raw_items {
            let name = non_blank(raw.name).ok_or_else(|| bad_request("Item name is required."))?;
            let item = NewInvoiceItem {
                name,
                quantity: normalize_quantity(raw.quantity.as_ref()),
                unit_price_cents: non_negative_cents(raw.price.as_ref()),
            };
            subtotal_cents = item
                .unit_price_cents
                .checked_mul(item.quantity)
                .and_then(|line| subtotal_cents.checked_add(line))
                .ok_or_else(|| bad_request("Invoice amount is too large."))?;
            items.push(item);
        }

        let patient_name =
            non_blank(self.patient_name).ok_or_else(|| bad_request("Patient name is required."))?;

        let status = parse_status(self.status.as_deref(), Some(InvoiceStatus::Pending))?;

        let invoice_date = match non_blank(self.date) {
            Some(date) => {
                parse_date_prefix(&date).ok_or_else(|| bad_request("Invalid invoice date."))?
            }
            None => today,
        };

        let tax_cents = non_negative_cents(self.tax.as_ref());
        let discount_cents = non_negative_cents(self.discount.as_ref());
        match subtotal_cents.checked_add(tax_cents) {
            Some(gross) if gross <= MAX_INVOICE_CENTS => {}
            _ => return Err(bad_request("Invoice amount is too large.")),
        }

        Ok(NewInvoice {
            invoice_number: non_blank(self.invoice_number),
            patient_id: id_text(self.patient_id),
            patient_name,
            patient_contact: non_blank(self.patient_contact),
            invoice_date,
            status,
            items,
            tax_cents,
            discount_cents,
            currency: currency.to_string(),
            notes: non_blank(self.notes),
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoiceResponse {
    pub id: String,
    pub invoice_number: String,
    pub date: NaiveDate,
    pub patient: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub status: String,
}

impl From<&Invoice> for CreateInvoiceResponse {
    fn from(invoice: &Invoice) -> Self {
        Self {
            id: invoice.id.clone(),
            invoice_number: invoice.invoice_number.clone(),
            date: invoice.invoice_date,
            patient: invoice.patient_name.clone(),
            amount: cents_to_decimal(invoice.total_cents),
            status: invoice.status.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListInvoicesQuery {
    pub q: Option<String>,
    pub status: Option<String>,
}

impl ListInvoicesQuery {
    /// `None` for "all" or an absent filter.
    pub fn status_filter(&self) -> Result<Option<InvoiceStatus>, AppError> {
        match self.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            None => Ok(None),
            Some(s) if s.eq_ignore_ascii_case("all") => Ok(None),
            Some(s) => s
                .parse()
                .map(Some)
                .map_err(|_| bad_request("Invalid status.")),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceListItem {
    pub id: String,
    pub invoice_number: String,
    pub patient: String,
    pub patient_contact: Option<String>,
    pub date: NaiveDate,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub status: String,
    pub service: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub paid_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub outstanding_amount: Decimal,
}

impl From<InvoiceListEntry> for InvoiceListItem {
    fn from(entry: InvoiceListEntry) -> Self {
        Self {
            id: entry.id,
            invoice_number: entry.invoice_number,
            patient: entry.patient_name,
            patient_contact: entry.patient_contact,
            date: entry.invoice_date,
            amount: cents_to_decimal(entry.total_cents),
            status: entry.status,
            service: entry.service.unwrap_or_default(),
            paid_amount: cents_to_decimal(entry.paid_cents),
            outstanding_amount: cents_to_decimal(entry.outstanding_cents),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListInvoicesResponse {
    pub invoices: Vec<InvoiceListItem>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInvoiceStatusRequest {
    pub status: Option<String>,
    pub payment_date: Option<String>,
    pub method: Option<String>,
    pub notes: Option<String>,
}

impl UpdateInvoiceStatusRequest {
    pub fn into_status_change(self) -> Result<StatusChange, AppError> {
        let status = parse_status(self.status.as_deref(), None)?;

        let payment_date = match non_blank(self.payment_date) {
            Some(date) => {
                Some(parse_date_prefix(&date).ok_or_else(|| bad_request("Invalid payment date."))?)
            }
            None => None,
        };

        Ok(StatusChange {
            status,
            payment_date,
            method: non_blank(self.method),
            notes: non_blank(self.notes),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

impl OkResponse {
    pub fn ok() -> Self {
        Self { ok: true }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceItemResponse {
    pub id: String,
    pub name: String,
    pub quantity: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub line_total: Decimal,
}

impl From<InvoiceItem> for InvoiceItemResponse {
    fn from(item: InvoiceItem) -> Self {
        Self {
            id: item.id,
            name: item.item_name,
            quantity: item.quantity,
            unit_price: cents_to_decimal(item.unit_price_cents),
            line_total: cents_to_decimal(item.line_total_cents),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    pub id: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub payment_date: NaiveDate,
    pub method: String,
    pub notes: Option<String>,
}

impl From<Payment> for PaymentResponse {
    fn from(payment: Payment) -> Self {
        Self {
            id: payment.id,
            amount: cents_to_decimal(payment.amount_cents),
            payment_date: payment.payment_date,
            method: payment.method,
            notes: payment.notes,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDetailResponse {
    pub id: String,
    pub invoice_number: String,
    pub patient_id: Option<String>,
    pub patient: String,
    pub patient_contact: Option<String>,
    pub date: NaiveDate,
    pub status: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub tax: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub discount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub paid_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub outstanding_amount: Decimal,
    pub currency: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<InvoiceItemResponse>,
    pub payments: Vec<PaymentResponse>,
}

impl InvoiceDetailResponse {
    pub fn new(invoice: Invoice, items: Vec<InvoiceItem>, payments: Vec<Payment>) -> Self {
        let paid_cents: i64 = payments.iter().map(|p| p.amount_cents).sum();
        Self {
            id: invoice.id,
            invoice_number: invoice.invoice_number,
            patient_id: invoice.patient_id,
            patient: invoice.patient_name,
            patient_contact: invoice.patient_contact,
            date: invoice.invoice_date,
            status: invoice.status,
            subtotal: cents_to_decimal(invoice.subtotal_cents),
            tax: cents_to_decimal(invoice.tax_cents),
            discount: cents_to_decimal(invoice.discount_cents),
            amount: cents_to_decimal(invoice.total_cents),
            paid_amount: cents_to_decimal(paid_cents),
            outstanding_amount: cents_to_decimal((invoice.total_cents - paid_cents).max(0)),
            currency: invoice.currency,
            notes: invoice.notes,
            created_at: invoice.created_at,
            updated_at: invoice.updated_at,
            items: items.into_iter().map(Into::into).collect(),
            payments: payments.into_iter().map(Into::into).collect(),
        }
    }
}
