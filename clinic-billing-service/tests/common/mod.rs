//! Common test utilities for clinic-billing-service integration tests.

use axum::{
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode},
    Router,
};
use clinic_billing_service::config::{AuthConfig, BillingConfig, BillingSettings, DatabaseConfig};
use clinic_billing_service::services::{init_metrics, Database};
use clinic_billing_service::startup::{build_router, AppState};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use service_core::config::Config as CommonConfig;
use std::sync::Once;
use tower::util::ServiceExt;

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,clinic_billing_service=debug,sqlx=warn")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Test configuration backed by a private in-memory database.
#[allow(dead_code)]
pub fn test_config(enforce_roles: bool) -> BillingConfig {
    BillingConfig {
        common: CommonConfig { port: 0 },
        service_name: "clinic-billing-service-test".to_string(),
        service_version: "test".to_string(),
        log_level: "debug".to_string(),
        otlp_endpoint: None,
        database: DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
        },
        billing: BillingSettings {
            currency: "USD".to_string(),
        },
        auth: AuthConfig { enforce_roles },
    }
}

/// Response status, headers and body parsed as JSON (`Null` when empty).
#[allow(dead_code)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
    pub text: String,
}

#[allow(dead_code)]
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

/// Build the router over a fresh, migrated database. Roles are not enforced.
#[allow(dead_code)]
pub async fn spawn_app() -> TestApp {
    spawn_app_with(false).await
}

#[allow(dead_code)]
pub async fn spawn_app_with(enforce_roles: bool) -> TestApp {
    init_tracing();
    init_metrics();

    let config = test_config(enforce_roles);
    let db = Database::new(
        &config.database.url,
        config.database.max_connections,
        config.database.min_connections,
    )
    .await
    .expect("Failed to open in-memory database");
    db.ensure_schema().await.expect("Failed to apply schema");

    let state = AppState::new(config, db);
    TestApp {
        router: build_router(state.clone()),
        state,
    }
}

#[allow(dead_code)]
impl TestApp {
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8_lossy(&bytes).to_string();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            headers,
            body,
            text,
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(Method::GET, uri, None, &[]).await
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> TestResponse {
        self.send(Method::POST, uri, Some(body), &[]).await
    }

    pub async fn patch_json(&self, uri: &str, body: Value) -> TestResponse {
        self.send(Method::PATCH, uri, Some(body), &[]).await
    }

    /// Create an invoice and return the 201 body.
    pub async fn create_invoice(&self, body: Value) -> Value {
        let response = self.post_json("/api/invoices", body).await;
        assert_eq!(
            response.status,
            StatusCode::CREATED,
            "unexpected response: {}",
            response.text
        );
        response.body
    }

    /// A single-item invoice of `price` for `patient`.
    pub async fn create_simple_invoice(&self, patient: &str, price: f64) -> Value {
        self.create_invoice(json!({
            "items": [{"name": "Consult", "price": price, "quantity": 1}],
            "patientName": patient
        }))
        .await
    }

    pub async fn set_status(&self, invoice_id: &str, body: Value) -> TestResponse {
        self.patch_json(&format!("/api/invoices/{}/status", invoice_id), body)
            .await
    }

    pub async fn invoice_detail(&self, invoice_id: &str) -> Value {
        let response = self.get(&format!("/api/invoices/{}", invoice_id)).await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.text);
        response.body
    }

    pub async fn summary(&self) -> Value {
        let response = self.get("/api/accounting/summary").await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.text);
        response.body
    }

    /// Record a payment directly, as an external payment flow would.
    pub async fn insert_payment(&self, invoice_id: &str, amount_cents: i64) {
        sqlx::query(
            r#"
            INSERT INTO payments (id, invoice_id, amount_cents, payment_date, method, notes, created_at)
            VALUES (?, ?, ?, '2026-01-15', 'cash', NULL, ?)
            "#,
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(invoice_id)
        .bind(amount_cents)
        .bind(chrono::Utc::now())
        .execute(self.state.db.pool())
        .await
        .expect("Failed to insert payment");
    }
}

/// A JSON money amount in whole cents.
#[allow(dead_code)]
pub fn cents(value: &Value) -> i64 {
    let amount = value
        .as_f64()
        .unwrap_or_else(|| panic!("expected a number, got {value}"));
    (amount * 100.0).round() as i64
}
