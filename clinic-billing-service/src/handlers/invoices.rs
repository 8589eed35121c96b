use super::{json_body, track_error};
use crate::dtos::{
    CreateInvoiceRequest, CreateInvoiceResponse, InvoiceDetailResponse, InvoiceListItem,
    ListInvoicesQuery, ListInvoicesResponse, OkResponse, UpdateInvoiceStatusRequest,
};
use crate::models::{ListInvoicesFilter, Payment};
use crate::services::metrics::{
    INVOICES_TOTAL, PAYMENTS_TOTAL, PAYMENT_AMOUNT_CENTS_TOTAL, STATUS_TRANSITIONS_TOTAL,
};
use crate::services::policy::{Action, Principal};
use crate::startup::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use service_core::error::AppError;

fn invoice_not_found(invoice_id: &str) -> AppError {
    tracing::debug!(invoice_id = %invoice_id, "Invoice not found");
    track_error(AppError::NotFound(anyhow::anyhow!("Invoice not found.")))
}

fn record_payment(payment: &Payment, currency: &str) {
    PAYMENTS_TOTAL
        .with_label_values(&[payment.method.as_str()])
        .inc();
    PAYMENT_AMOUNT_CENTS_TOTAL
        .with_label_values(&[currency])
        .inc_by(payment.amount_cents as f64);
}

pub async fn create_invoice(
    State(state): State<AppState>,
    principal: Principal,
    payload: Result<Json<CreateInvoiceRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    state
        .authorize(&principal, Action::CreateInvoice)
        .map_err(track_error)?;

    let new_invoice = json_body(payload)?
        .into_new_invoice(&state.config.billing.currency, Utc::now().date_naive())
        .map_err(track_error)?;

    let (invoice, payment) = state
        .db
        .create_invoice(&new_invoice)
        .await
        .map_err(track_error)?;

    INVOICES_TOTAL.with_label_values(&[invoice.status.as_str()]).inc();
    if let Some(payment) = &payment {
        record_payment(payment, &invoice.currency);
    }

    Ok((StatusCode::CREATED, Json(CreateInvoiceResponse::from(&invoice))))
}

pub async fn list_invoices(
    State(state): State<AppState>,
    principal: Principal,
    Query(params): Query<ListInvoicesQuery>,
) -> Result<Json<ListInvoicesResponse>, AppError> {
    state
        .authorize(&principal, Action::ViewInvoices)
        .map_err(track_error)?;

    let filter = ListInvoicesFilter {
        status: params.status_filter().map_err(track_error)?,
        query: params.q,
    };

    let invoices = state.db.list_invoices(&filter).await.map_err(track_error)?;

    Ok(Json(ListInvoicesResponse {
        invoices: invoices.into_iter().map(InvoiceListItem::from).collect(),
    }))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    principal: Principal,
    Path(invoice_id): Path<String>,
) -> Result<Json<InvoiceDetailResponse>, AppError> {
    state
        .authorize(&principal, Action::ViewInvoices)
        .map_err(track_error)?;

    let invoice = state
        .db
        .get_invoice(&invoice_id)
        .await
        .map_err(track_error)?
        .ok_or_else(|| invoice_not_found(&invoice_id))?;

    let items = state
        .db
        .get_invoice_items(&invoice.id)
        .await
        .map_err(track_error)?;
    let payments = state.db.get_payments(&invoice.id).await.map_err(track_error)?;

    Ok(Json(InvoiceDetailResponse::new(invoice, items, payments)))
}

pub async fn update_invoice_status(
    State(state): State<AppState>,
    principal: Principal,
    Path(invoice_id): Path<String>,
    payload: Result<Json<UpdateInvoiceStatusRequest>, JsonRejection>,
) -> Result<Json<OkResponse>, AppError> {
    state
        .authorize(&principal, Action::UpdateInvoiceStatus)
        .map_err(track_error)?;

    let change = json_body(payload)?
        .into_status_change()
        .map_err(track_error)?;

    let transition = state
        .db
        .update_invoice_status(&invoice_id, &change)
        .await
        .map_err(track_error)?
        .ok_or_else(|| invoice_not_found(&invoice_id))?;

    STATUS_TRANSITIONS_TOTAL
        .with_label_values(&[change.status.as_str()])
        .inc();
    if let Some(payment) = &transition.payment {
        record_payment(payment, &transition.invoice.currency);
    }

    Ok(Json(OkResponse::ok()))
}
