//! Payment model.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Method recorded on payments the service synthesizes itself.
pub const DEFAULT_PAYMENT_METHOD: &str = "manual";

/// Payment recorded against an invoice.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Payment {
    pub id: String,
    pub invoice_id: String,
    pub amount_cents: i64,
    pub payment_date: NaiveDate,
    pub method: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}
