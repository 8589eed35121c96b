//! Integration tests for invoice status transitions.

mod common;

use axum::http::StatusCode;
use common::{cents, spawn_app};
use serde_json::json;

#[tokio::test]
async fn marking_paid_settles_the_outstanding_balance() {
    let app = spawn_app().await;
    let invoice = app.create_simple_invoice("Ada", 100.0).await;
    let id = invoice["id"].as_str().unwrap();
    app.insert_payment(id, 4_000).await;

    let response = app.set_status(id, json!({"status": "paid"})).await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.text);
    assert_eq!(response.body, json!({"ok": true}));

    let detail = app.invoice_detail(id).await;
    assert_eq!(detail["status"], "paid");
    let payments = detail["payments"].as_array().unwrap();
    assert_eq!(payments.len(), 2);
    assert_eq!(cents(&payments[1]["amount"]), 6_000);
    assert_eq!(payments[1]["method"], "manual");
    assert_eq!(payments[1]["paymentDate"], invoice["date"]);
    assert_eq!(cents(&detail["paidAmount"]), 10_000);
    assert_eq!(cents(&detail["outstandingAmount"]), 0);

    // Already settled: a second transition records nothing.
    let again = app.set_status(id, json!({"status": "paid"})).await;
    assert_eq!(again.status, StatusCode::OK);
    let detail = app.invoice_detail(id).await;
    assert_eq!(detail["payments"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn caller_can_set_payment_date_method_and_notes() {
    let app = spawn_app().await;
    let invoice = app.create_simple_invoice("Grace", 75.0).await;
    let id = invoice["id"].as_str().unwrap();

    let response = app
        .set_status(
            id,
            json!({
                "status": "paid",
                "paymentDate": "2026-04-30T16:45:00Z",
                "method": "card",
                "notes": "Paid at front desk"
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let detail = app.invoice_detail(id).await;
    let payment = &detail["payments"][0];
    assert_eq!(cents(&payment["amount"]), 7_500);
    assert_eq!(payment["paymentDate"], "2026-04-30");
    assert_eq!(payment["method"], "card");
    assert_eq!(payment["notes"], "Paid at front desk");
}

#[tokio::test]
async fn transitions_are_unrestricted_and_only_paid_records_payments() {
    let app = spawn_app().await;
    let invoice = app.create_simple_invoice("Ada", 30.0).await;
    let id = invoice["id"].as_str().unwrap();

    for status in ["overdue", "void", "pending", "Overdue"] {
        let response = app.set_status(id, json!({"status": status})).await;
        assert_eq!(response.status, StatusCode::OK, "status {status}");
    }

    let detail = app.invoice_detail(id).await;
    assert_eq!(detail["status"], "overdue");
    assert!(detail["payments"].as_array().unwrap().is_empty());

    app.set_status(id, json!({"status": "paid"})).await;
    app.set_status(id, json!({"status": "pending"})).await;

    // Leaving "paid" keeps the recorded payment.
    let detail = app.invoice_detail(id).await;
    assert_eq!(detail["status"], "pending");
    assert_eq!(detail["payments"].as_array().unwrap().len(), 1);
    assert_eq!(cents(&detail["outstandingAmount"]), 0);
}

#[tokio::test]
async fn overpaid_invoice_gets_no_extra_payment() {
    let app = spawn_app().await;
    let invoice = app.create_simple_invoice("Ada", 10.0).await;
    let id = invoice["id"].as_str().unwrap();
    app.insert_payment(id, 2_500).await;

    app.set_status(id, json!({"status": "paid"})).await;

    let detail = app.invoice_detail(id).await;
    assert_eq!(detail["payments"].as_array().unwrap().len(), 1);
    assert_eq!(cents(&detail["outstandingAmount"]), 0);
}

#[tokio::test]
async fn unknown_invoice_is_404() {
    let app = spawn_app().await;

    let response = app
        .set_status("missing-invoice", json!({"status": "paid"}))
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], "Invoice not found.");
}

#[tokio::test]
async fn invalid_status_is_400_and_changes_nothing() {
    let app = spawn_app().await;
    let invoice = app.create_simple_invoice("Ada", 10.0).await;
    let id = invoice["id"].as_str().unwrap();

    for body in [json!({"status": "refunded"}), json!({"status": "all"}), json!({})] {
        let response = app.set_status(id, body.clone()).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "body: {body}");
        assert_eq!(response.body["error"], "Invalid status.");
    }

    let detail = app.invoice_detail(id).await;
    assert_eq!(detail["status"], "pending");
}
