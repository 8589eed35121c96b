//! Application startup and lifecycle management.

use crate::config::BillingConfig;
use crate::handlers;
use crate::middleware::{http_metrics_middleware, preflight_middleware};
use crate::services::policy::{authorize, Action, Decision, Principal};
use crate::services::{init_metrics, Database};
use axum::{
    extract::Request,
    http::Method,
    middleware,
    routing::{get, patch},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::security_headers::security_headers_middleware;
use service_core::middleware::tracing::request_id_middleware;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::field::Empty;
use tracing::Span;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: BillingConfig,
    pub db: Arc<Database>,
}

impl AppState {
    pub fn new(config: BillingConfig, db: Database) -> Self {
        Self {
            config,
            db: Arc::new(db),
        }
    }

    /// Apply the access policy. Every caller passes while role enforcement is off.
    pub fn authorize(&self, principal: &Principal, action: Action) -> Result<(), AppError> {
        if !self.config.auth.enforce_roles {
            return Ok(());
        }

        match authorize(principal, action) {
            Decision::Allow => Ok(()),
            Decision::Unauthenticated => {
                tracing::warn!(action = action.as_str(), "Request without a recognized role");
                Err(AppError::Unauthorized(anyhow::anyhow!(
                    "A valid X-User-Role header is required."
                )))
            }
            Decision::Deny => {
                tracing::warn!(
                    action = action.as_str(),
                    role = ?principal.role,
                    user_id = ?principal.user_id,
                    clinic_id = ?principal.clinic_id,
                    "Access denied"
                );
                Err(AppError::Forbidden(anyhow::anyhow!(
                    "Role is not allowed to perform this action."
                )))
            }
        }
    }
}

/// Per-request span. Caller identity fields are filled in by the `Principal` extractor.
pub fn request_span(request: &Request) -> Span {
    tracing::info_span!(
        "request",
        method = %request.method(),
        uri = %request.uri(),
        version = ?request.version(),
        role = Empty,
        user_id = Empty,
        clinic_id = Empty,
    )
}

/// Assemble the HTTP router with all middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_handler))
        .route(
            "/api/invoices",
            get(handlers::list_invoices).post(handlers::create_invoice),
        )
        .route("/api/invoices/:id", get(handlers::get_invoice))
        .route(
            "/api/invoices/:id/status",
            patch(handlers::update_invoice_status),
        )
        .route(
            "/api/accounting/summary",
            get(handlers::accounting_summary),
        )
        .layer(middleware::from_fn(http_metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors)
        .layer(middleware::from_fn(preflight_middleware))
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    http_port: u16,
    http_listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Connect to the database, apply the schema and bind the HTTP listener.
    ///
    /// Fails if the schema cannot be applied; the service never serves requests
    /// against a partial schema.
    pub async fn build(config: BillingConfig) -> Result<Self, AppError> {
        init_metrics();

        let db = Database::new(
            &config.database.url,
            config.database.max_connections,
            config.database.min_connections,
        )
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to connect to SQLite");
            e
        })?;

        db.ensure_schema().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to apply invoicing schema");
            e
        })?;

        let state = AppState::new(config.clone(), db);

        let http_addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let http_listener = TcpListener::bind(http_addr).await.map_err(|e| {
            tracing::error!(error = %e, addr = %http_addr, "Failed to bind HTTP listener");
            AppError::from(e)
        })?;
        let http_port = http_listener.local_addr()?.port();

        tracing::info!(http_port = http_port, "Clinic billing listener bound");

        Ok(Self {
            http_port,
            http_listener,
            state,
        })
    }

    /// Get the HTTP port the server is listening on.
    pub fn http_port(&self) -> u16 {
        self.http_port
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let router = build_router(self.state.clone());

        tracing::info!(
            service = %self.state.config.service_name,
            version = %self.state.config.service_version,
            http_port = self.http_port,
            enforce_roles = self.state.config.auth.enforce_roles,
            "Service ready to accept connections"
        );

        axum::serve(self.http_listener, router).await.map_err(|e| {
            tracing::error!(error = %e, "HTTP server error");
            std::io::Error::other(format!("HTTP server error: {}", e))
        })
    }
}
