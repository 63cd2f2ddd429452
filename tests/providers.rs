use std::time::Duration;

use chrono::{Datelike, Utc};
use httpmock::prelude::*;
use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::Instant;

use vpswatch::providers::oneprovider::OneProvider;
use vpswatch::providers::vdsina::VdsinaProvider;
use vpswatch::{BillingProvider, Monitor, ProviderError};

fn deadline() -> Instant {
    Instant::now() + Duration::from_secs(5)
}

#[tokio::test]
async fn vdsina_forecast_is_parsed_as_utc_midnight() {
    let server = MockServer::start_async().await;
    let account = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/account")
                .header("authorization", "Bearer vd-key");
            then.status(200).json_body(json!({
                "status": "ok",
                "status_msg": "",
                "data": {
                    "account": {"id": 1, "name": "test"},
                    "created": "2020-01-01",
                    "forecast": "2029-02-20",
                    "can": {"add_user": true, "add_service": true, "convert_to_cash": false}
                }
            }));
        })
        .await;

    let provider = VdsinaProvider::with_base_url("vd-key", server.base_url());
    let due = provider.next_payment_date(deadline()).await.unwrap().unwrap();

    assert_eq!((due.year(), due.month(), due.day()), (2029, 2, 20));
    assert_eq!(due.timestamp() % 86_400, 0);
    account.assert_async().await;
}

#[tokio::test]
async fn vdsina_missing_forecast_means_overdue() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/account");
            then.status(200)
                .json_body(json!({"status": "ok", "status_msg": "", "data": {"forecast": null}}));
        })
        .await;

    let provider = VdsinaProvider::with_base_url("vd-key", server.base_url());
    let due = provider.next_payment_date(deadline()).await.unwrap().unwrap();
    assert!(due < Utc::now());

    let msg = vpswatch::format_payment_message(provider.name(), due, Utc::now());
    assert!(msg.starts_with("CRITICAL: Provider vdsina - Payment overdue!"), "{msg}");
}

#[tokio::test]
async fn vdsina_api_error_status() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/account");
            then.status(200)
                .json_body(json!({"status": "error", "status_msg": "token expired", "data": {}}));
        })
        .await;

    let provider = VdsinaProvider::with_base_url("vd-key", server.base_url());
    let err = provider.next_payment_date(deadline()).await.unwrap_err();
    assert!(matches!(err.root(), ProviderError::Api(m) if m == "token expired"), "{err}");
    assert_eq!(err.to_string(), "failed to fetch account: API error: token expired");
}

#[tokio::test]
async fn vdsina_non_200_is_status_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/account");
            then.status(401).body("unauthorized");
        })
        .await;

    let provider = VdsinaProvider::with_base_url("bad", server.base_url());
    let err = provider.next_payment_date(deadline()).await.unwrap_err();
    assert_eq!(err.to_string(), "failed to fetch account: unexpected status code: 401, body: unauthorized");
}

#[tokio::test]
async fn vdsina_bad_forecast_is_parse_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/account");
            then.status(200)
                .json_body(json!({"status": "ok", "status_msg": "", "data": {"forecast": "tomorrow"}}));
        })
        .await;

    let provider = VdsinaProvider::with_base_url("vd-key", server.base_url());
    let err = provider.next_payment_date(deadline()).await.unwrap_err();
    assert!(matches!(err, ProviderError::InvalidDate { .. }), "{err}");
}

#[tokio::test]
async fn oneprovider_earliest_unpaid_invoice() {
    let server = MockServer::start_async().await;
    let invoices = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/invoices")
                .query_param("status", "Unpaid")
                .query_param("page", "1")
                .query_param("limit", "20")
                .header("api-key", "api")
                .header("client-key", "client")
                .header("user-agent", "OneApi/1.0");
            then.status(200).json_body(json!({
                "result": "success",
                "response": {
                    "current_page": 1,
                    "total_pages": 1,
                    "number_of_entries": 2,
                    "total_number_of_entries": 2,
                    "invoices": [
                        {"id": "2", "status": "Unpaid", "due_date": "2031-04-01", "balance": "10.00", "items": []},
                        {"id": "1", "status": "Unpaid", "due_date": "2031-03-15", "balance": "5.00", "items": []}
                    ]
                }
            }));
        })
        .await;

    let provider = OneProvider::with_base_url("api", "client", server.base_url());
    let due = provider.next_payment_date(deadline()).await.unwrap().unwrap();
    assert_eq!(due.format("%Y-%m-%d").to_string(), "2031-03-15");
    invoices.assert_async().await;
}

#[tokio::test]
async fn oneprovider_no_invoices_is_nothing_due() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/invoices");
            then.status(200)
                .json_body(json!({"result": "success", "response": {"invoices": []}}));
        })
        .await;

    let provider = OneProvider::with_base_url("api", "client", server.base_url());
    assert_eq!(provider.next_payment_date(deadline()).await.unwrap(), None);
}

#[tokio::test]
async fn oneprovider_api_error_object() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/invoices");
            then.status(200).json_body(json!({
                "result": "error",
                "error": {"message": "Invalid API key", "code": "AUTH_001"}
            }));
        })
        .await;

    let provider = OneProvider::with_base_url("api", "client", server.base_url());
    let err = provider.next_payment_date(deadline()).await.unwrap_err();
    assert_eq!(err.to_string(), "failed to fetch invoices: API error: Invalid API key (code: AUTH_001)");
}

#[tokio::test]
async fn monitor_cycle_over_real_clients() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/account");
            then.status(500).body("boom");
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/invoices");
            then.status(200)
                .json_body(json!({"result": "success", "response": {"invoices": []}}));
        })
        .await;

    let (tx, mut rx) = mpsc::channel(8);
    let monitor = Monitor::builder()
        .channel(tx)
        .converter(|text| text)
        .provider(VdsinaProvider::with_base_url("vd-key", server.base_url()))
        .provider(OneProvider::with_base_url("api", "client", server.base_url()))
        .build()
        .unwrap();

    let report = monitor.run_cycle().await;
    assert_eq!(report.produced, 2);
    assert_eq!(report.failed, 1);

    assert_eq!(
        rx.try_recv().unwrap(),
        "Error checking payment date for provider vdsina: failed to fetch account: unexpected status code: 500, body: boom"
    );
    assert_eq!(rx.try_recv().unwrap(), "Provider oneprovider: no payment due");
}

#[tokio::test]
async fn expired_deadline_fails_fast() {
    let provider = VdsinaProvider::with_base_url("vd-key", "http://127.0.0.1:9");
    let err = provider
        .next_payment_date(Instant::now() - Duration::from_millis(1))
        .await
        .unwrap_err();
    assert!(matches!(err.root(), ProviderError::Timeout(_)), "{err}");
}
