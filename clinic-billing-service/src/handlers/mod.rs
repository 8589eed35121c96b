pub mod accounting;
pub mod health;
pub mod invoices;

pub use accounting::accounting_summary;
pub use health::{health_check, metrics_handler, readiness_check};
pub use invoices::{create_invoice, get_invoice, list_invoices, update_invoice_status};

use crate::services::metrics::ERRORS_TOTAL;
use axum::extract::rejection::JsonRejection;
use axum::Json;
use service_core::error::AppError;

/// Count a failed request by error kind before it is rendered.
pub(crate) fn track_error(err: AppError) -> AppError {
    ERRORS_TOTAL.with_label_values(&[err.kind()]).inc();
    err
}

/// Unwrap a JSON body, turning malformed input into a validation error.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| {
            track_error(AppError::BadRequest(anyhow::anyhow!(
                "Invalid request body: {}",
                rejection.body_text()
            )))
        })
}
