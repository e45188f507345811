mod common;

use axum::http::{Method, StatusCode};
use common::*;
use serde_json::json;

#[tokio::test]
async fn health_reports_ok() {
    let app = TestApp::new();
    let (status, body) = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "ledger-api");
}

#[tokio::test]
async fn transfer_returns_transfer_accounts_and_entries() {
    let app = TestApp::new();
    let alice = app.account("alice", 1_000, "USD");
    let bob = app.account("bob", 500, "USD");

    let (status, body) = app.transfer("alice", alice.id, bob.id, 300, "USD").await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["transfer"]["amount"], 300);
    assert_eq!(body["transfer"]["from_account_id"], alice.id);
    assert_eq!(body["from_account"]["balance"], 700);
    assert_eq!(body["to_account"]["balance"], 800);
    assert_eq!(body["from_entry"]["amount"], -300);
    assert_eq!(body["to_entry"]["amount"], 300);
    assert_eq!(app.balance(alice.id), 700);
    assert_eq!(app.balance(bob.id), 800);
}

#[tokio::test]
async fn missing_principal_is_unauthorized() {
    let app = TestApp::new();
    let alice = app.account("alice", 1_000, "USD");
    let bob = app.account("bob", 500, "USD");

    let (status, body) = app
        .request(
            Method::POST,
            "/v1/transfers",
            None,
            Some(json!({
                "from_account_id": alice.id,
                "to_account_id": bob.id,
                "amount": 10,
                "currency": "USD",
            })),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "unauthenticated");
    assert_eq!(app.balance(alice.id), 1_000);
}

#[tokio::test]
async fn caller_must_own_the_source_account() {
    let app = TestApp::new();
    let alice = app.account("alice", 1_000, "USD");
    let bob = app.account("bob", 500, "USD");

    let (status, body) = app.transfer("bob", alice.id, bob.id, 100, "USD").await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), "forbidden");
    assert_eq!(
        body["error"]["message"],
        "from account doesn't belong to the authenticated user"
    );
    assert_eq!(app.balance(alice.id), 1_000);
}

#[tokio::test]
async fn malformed_requests_are_rejected() {
    let app = TestApp::new();
    let alice = app.account("alice", 1_000, "USD");
    let bob = app.account("bob", 500, "USD");

    for (from, to, amount, currency) in [
        (alice.id, bob.id, 0, "USD"),
        (alice.id, bob.id, -10, "USD"),
        (alice.id, alice.id, 10, "USD"),
        (0, bob.id, 10, "USD"),
        (alice.id, bob.id, 10, "usd"),
        (alice.id, bob.id, 10, "DOLLARS"),
    ] {
        let (status, body) = app.transfer("alice", from, to, amount, currency).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{from}->{to} {amount} {currency}");
        assert_eq!(error_code(&body), "invalid_request");
    }
    assert!(app.store.transfers().is_empty());
}

#[tokio::test]
async fn unknown_account_is_not_found() {
    let app = TestApp::new();
    let alice = app.account("alice", 1_000, "USD");

    let (status, body) = app.transfer("alice", alice.id, 4_242, 10, "USD").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), "not_found");
}

#[tokio::test]
async fn currency_must_match_both_accounts() {
    let app = TestApp::new();
    let alice = app.account("alice", 1_000, "USD");
    let pierre = app.account("pierre", 1_000, "EUR");

    let (status, _) = app.transfer("alice", alice.id, pierre.id, 10, "USD").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.transfer("alice", alice.id, pierre.id, 10, "EUR").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(app.balance(alice.id), 1_000);
    assert_eq!(app.balance(pierre.id), 1_000);
}

#[tokio::test]
async fn daily_limit_rejection_has_distinct_code() {
    let app = TestApp::new();
    let alice = app.account("alice", 10_000, "USD");
    let bob = app.account("bob", 0, "USD");

    let (status, _) = app
        .request(
            Method::PUT,
            &format!("/v1/accounts/{}/limits", alice.id),
            Some("alice"),
            Some(json!({ "daily_transfer_limit": 1_000 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.transfer("alice", alice.id, bob.id, 900, "USD").await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.transfer("alice", alice.id, bob.id, 150, "USD").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), "daily_limit_exceeded");
    assert_eq!(app.balance(alice.id), 9_100);

    let (status, _) = app.transfer("alice", alice.id, bob.id, 100, "USD").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.balance(alice.id), 9_000);
}

#[tokio::test]
async fn crossing_enqueues_alert_and_response_is_unaffected_by_queue_outage() {
    let app = TestApp::new();
    let alice = app.account("alice", 150, "USD");
    let bank = app.account("bank", 1_000, "USD");

    let (status, _) = app
        .request(
            Method::PUT,
            &format!("/v1/accounts/{}/alerts", alice.id),
            Some("alice"),
            Some(json!({ "low_balance_threshold": 100, "high_balance_threshold": 0 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.transfer("alice", alice.id, bank.id, 60, "USD").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.queue.pending(QUEUE).len(), 1);

    // Recover above the threshold, then cross again while the queue is down.
    let (status, _) = app.transfer("bank", bank.id, alice.id, 60, "USD").await;
    assert_eq!(status, StatusCode::OK);
    app.queue.set_unavailable(true);
    let (status, body) = app.transfer("alice", alice.id, bank.id, 60, "USD").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["from_account"]["balance"], 90);
    assert_eq!(app.store.transfers().len(), 3);
}

#[tokio::test]
async fn store_outage_is_service_unavailable_without_details() {
    let app = TestApp::new();
    let alice = app.account("alice", 1_000, "USD");
    let bob = app.account("bob", 500, "USD");

    app.store.set_unavailable(true);
    let (status, body) = app.transfer("alice", alice.id, bob.id, 10, "USD").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(error_code(&body), "service_unavailable");
    assert!(!body["error"]["message"]
        .as_str()
        .unwrap_or_default()
        .contains("in-memory"));
}
