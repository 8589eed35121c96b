//! Caller identity from gateway headers.
//!
//! The gateway in front of this service authenticates staff and forwards their
//! role and identifiers. Nothing here is verified; the values only feed the
//! access policy, which is off unless `AUTH_ENFORCE_ROLES` is set.

use crate::services::policy::{Principal, Role};
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use std::convert::Infallible;

pub const ROLE_HEADER: &str = "x-user-role";
pub const USER_ID_HEADER: &str = "x-user-id";
pub const CLINIC_ID_HEADER: &str = "x-clinic-id";

fn header_text(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl Principal {
    /// An unknown role string is treated the same as a missing one.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            role: header_text(headers, ROLE_HEADER).and_then(|r| r.parse::<Role>().ok()),
            user_id: header_text(headers, USER_ID_HEADER),
            clinic_id: header_text(headers, CLINIC_ID_HEADER),
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let principal = Principal::from_headers(&parts.headers);

        let span = tracing::Span::current();
        if let Some(role) = principal.role {
            span.record("role", role.as_str());
        }
        if let Some(user_id) = &principal.user_id {
            span.record("user_id", user_id.as_str());
        }
        if let Some(clinic_id) = &principal.clinic_id {
            span.record("clinic_id", clinic_id.as_str());
        }

        Ok(principal)
    }
}
