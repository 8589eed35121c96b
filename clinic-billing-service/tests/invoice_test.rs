//! Integration tests for invoice creation and detail.

mod common;

use axum::http::StatusCode;
use chrono::Utc;
use common::{cents, spawn_app};
use serde_json::json;

#[tokio::test]
async fn create_invoice_applies_tax_and_discount() {
    let app = spawn_app().await;

    let body = app
        .create_invoice(json!({
            "items": [{"name": "Consult", "price": 50, "quantity": 2}],
            "patientName": "Ada Lovelace",
            "tax": 5,
            "discount": 3
        }))
        .await;

    assert_eq!(cents(&body["amount"]), 10200);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["patient"], "Ada Lovelace");
    assert_eq!(body["date"], Utc::now().date_naive().to_string());
    assert!(body["id"].as_str().is_some_and(|id| !id.is_empty()));

    let detail = app.invoice_detail(body["id"].as_str().unwrap()).await;
    assert_eq!(cents(&detail["subtotal"]), 10000);
    assert_eq!(cents(&detail["tax"]), 500);
    assert_eq!(cents(&detail["discount"]), 300);
    assert_eq!(cents(&detail["outstandingAmount"]), 10200);
    assert_eq!(detail["currency"], "USD");
    assert_eq!(detail["items"][0]["name"], "Consult");
    assert_eq!(detail["items"][0]["quantity"], 2);
    assert_eq!(cents(&detail["items"][0]["unitPrice"]), 5000);
    assert_eq!(cents(&detail["items"][0]["lineTotal"]), 10000);
    assert_eq!(detail["payments"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn generated_invoice_numbers_follow_the_pattern() {
    let app = spawn_app().await;

    let body = app.create_simple_invoice("Grace Hopper", 20.0).await;
    let number = body["invoiceNumber"].as_str().unwrap();
    let parts: Vec<&str> = number.split('-').collect();

    assert_eq!(parts.len(), 3, "unexpected number {number}");
    assert_eq!(parts[0], "INV");
    assert!(parts[1].chars().all(|c| c.is_ascii_digit()));
    assert_eq!(parts[2].len(), 5);
    assert!(parts[2].chars().all(|c| c.is_ascii_digit()));
}

#[tokio::test]
async fn explicit_invoice_number_is_kept_and_must_be_unique() {
    let app = spawn_app().await;
    let invoice = json!({
        "items": [{"name": "Consult", "price": 10}],
        "patientName": "Ada",
        "invoiceNumber": "  CLINIC-0001  "
    });

    let body = app.create_invoice(invoice.clone()).await;
    assert_eq!(body["invoiceNumber"], "CLINIC-0001");

    let duplicate = app.post_json("/api/invoices", invoice).await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);
    assert_eq!(duplicate.body["error"], "Invoice number already exists.");

    let list = app.get("/api/invoices").await;
    assert_eq!(list.body["invoices"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn invoice_created_as_paid_records_one_payment() {
    let app = spawn_app().await;

    let body = app
        .create_invoice(json!({
            "items": [{"name": "Consult", "price": 50, "quantity": 2}],
            "patientName": "Ada",
            "tax": 5,
            "discount": 3,
            "status": "PAID",
            "date": "2026-03-05"
        }))
        .await;
    assert_eq!(body["status"], "paid");

    let detail = app.invoice_detail(body["id"].as_str().unwrap()).await;
    let payments = detail["payments"].as_array().unwrap();
    assert_eq!(payments.len(), 1);
    assert_eq!(cents(&payments[0]["amount"]), 10200);
    assert_eq!(payments[0]["method"], "manual");
    assert_eq!(payments[0]["paymentDate"], "2026-03-05");
    assert_eq!(cents(&detail["outstandingAmount"]), 0);

    let summary = app.summary().await;
    assert_eq!(cents(&summary["cashReceived"]), 10200);
}

#[tokio::test]
async fn zero_total_paid_invoice_has_no_payment() {
    let app = spawn_app().await;

    let body = app
        .create_invoice(json!({
            "items": [{"name": "Follow-up", "price": 0}],
            "patientName": "Ada",
            "status": "paid"
        }))
        .await;

    assert_eq!(cents(&body["amount"]), 0);
    let detail = app.invoice_detail(body["id"].as_str().unwrap()).await;
    assert!(detail["payments"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn discount_larger_than_subtotal_floors_total_at_zero() {
    let app = spawn_app().await;

    let body = app
        .create_invoice(json!({
            "items": [{"name": "Bandage", "price": "2.50"}],
            "patientName": "Ada",
            "discount": 10
        }))
        .await;

    assert_eq!(cents(&body["amount"]), 0);
}

#[tokio::test]
async fn quantities_and_prices_are_normalized() {
    let app = spawn_app().await;

    let body = app
        .create_invoice(json!({
            "items": [
                {"name": "Gauze", "price": "1.005", "quantity": 0},
                {"name": "Tape", "price": -4, "quantity": "3"},
                {"name": "Swab", "price": 0.1, "quantity": "lots"}
            ],
            "patientName": "Ada",
            "tax": -2
        }))
        .await;

    let detail = app.invoice_detail(body["id"].as_str().unwrap()).await;
    let items = detail["items"].as_array().unwrap();
    assert_eq!(items[0]["quantity"], 1);
    assert_eq!(cents(&items[0]["unitPrice"]), 101);
    assert_eq!(items[1]["quantity"], 3);
    assert_eq!(cents(&items[1]["lineTotal"]), 0);
    assert_eq!(items[2]["quantity"], 1);
    assert_eq!(cents(&items[2]["unitPrice"]), 10);
    assert_eq!(cents(&detail["tax"]), 0);
    assert_eq!(cents(&detail["amount"]), 111);
}

#[tokio::test]
async fn timestamp_dates_are_truncated_to_the_day() {
    let app = spawn_app().await;

    let body = app
        .create_invoice(json!({
            "items": [{"name": "Consult", "price": 10}],
            "patientName": "Ada",
            "date": "2026-03-05T22:15:00.000Z"
        }))
        .await;

    assert_eq!(body["date"], "2026-03-05");
}

#[tokio::test]
async fn validation_failures_return_400() {
    let app = spawn_app().await;

    let cases = [
        (
            json!({"patientName": "Ada"}),
            "At least one invoice item is required.",
        ),
        (
            json!({"items": [], "patientName": "Ada"}),
            "At least one invoice item is required.",
        ),
        (
            json!({"items": [{"name": "  ", "price": 5}], "patientName": "Ada"}),
            "Item name is required.",
        ),
        (
            json!({"items": [{"name": "Consult"}], "patientName": "   "}),
            "Patient name is required.",
        ),
        (
            json!({"items": [{"name": "Consult"}], "patientName": "Ada", "status": "draft"}),
            "Invalid status.",
        ),
        (
            json!({"items": [{"name": "Consult"}], "patientName": "Ada", "date": "05/03/2026"}),
            "Invalid invoice date.",
        ),
    ];

    for (body, message) in cases {
        let response = app.post_json("/api/invoices", body.clone()).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "body: {body}");
        assert_eq!(response.body["error"], message, "body: {body}");
    }

    let list = app.get("/api/invoices").await;
    assert!(list.body["invoices"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn malformed_json_is_a_validation_error() {
    let app = spawn_app().await;

    let response = app
        .send(
            axum::http::Method::POST,
            "/api/invoices",
            None,
            &[("content-type", "application/json")],
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body["error"].is_string());
}

#[tokio::test]
async fn unknown_invoice_detail_is_404() {
    let app = spawn_app().await;

    let response = app.get("/api/invoices/does-not-exist").await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], "Invoice not found.");
}

#[tokio::test]
async fn oversized_amounts_are_rejected_and_summary_stays_available() {
    let app = spawn_app().await;

    for _ in 0..2 {
        let response = app
            .post_json(
                "/api/invoices",
                json!({
                    "items": [{"name": "Surgery", "price": "50000000000000000"}],
                    "patientName": "Ada"
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.body["error"], "Invoice amount is too large.");
    }

    for patient in ["Ada", "Grace"] {
        app.create_invoice(json!({
            "items": [{"name": "Surgery", "price": 1_000_000_000}],
            "patientName": patient
        }))
        .await;
    }

    let summary = app.summary().await;
    assert_eq!(cents(&summary["receivables"]), 200_000_000_000);
    assert_eq!(cents(&summary["pendingAmount"]), 200_000_000_000);
    assert_eq!(summary["invoiceCount"], 2);
}
