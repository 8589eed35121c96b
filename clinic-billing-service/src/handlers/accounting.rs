use super::track_error;
use crate::dtos::AccountingSummaryResponse;
use crate::services::policy::{Action, Principal};
use crate::startup::AppState;
use axum::{extract::State, Json};
use service_core::error::AppError;

pub async fn accounting_summary(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<AccountingSummaryResponse>, AppError> {
    state
        .authorize(&principal, Action::ViewSummary)
        .map_err(track_error)?;

    let summary = state.db.accounting_summary().await.map_err(track_error)?;

    Ok(Json(summary.into()))
}
