#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use ledger::memory::{InMemoryQueue, InMemoryStore};
use ledger::{Account, TaskDistributor, TaskOptions, TransferService};
use ledger_api::{app, extractors::AUTHENTICATED_USER_HEADER, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

pub const QUEUE: &str = "alerts";

/// Router wired to in-memory adapters, driven without a listening socket.
pub struct TestApp {
    pub store: Arc<InMemoryStore>,
    pub queue: Arc<InMemoryQueue>,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let queue = Arc::new(InMemoryQueue::new());
        let distributor = TaskDistributor::new(queue.clone()).with_options(TaskOptions {
            queue: QUEUE.to_string(),
            max_retry: 3,
        });
        let service = TransferService::new(store.clone()).with_distributor(distributor);

        Self {
            store,
            queue,
            router: app(AppState::from_service(service)),
        }
    }

    pub fn account(&self, owner: &str, balance: i64, currency: &str) -> Account {
        self.store
            .create_user(owner, &format!("{owner} Example"), &format!("{owner}@example.com"));
        self.store.create_account(owner, balance, currency)
    }

    pub fn balance(&self, id: i64) -> i64 {
        self.store.account(id).expect("account exists").balance
    }

    /// Send a request as `user` (or anonymously) and decode the JSON reply.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        user: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header(AUTHENTICATED_USER_HEADER, user);
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request builds");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router responds");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body reads");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    pub async fn transfer(
        &self,
        user: &str,
        from: i64,
        to: i64,
        amount: i64,
        currency: &str,
    ) -> (StatusCode, Value) {
        self.request(
            Method::POST,
            "/v1/transfers",
            Some(user),
            Some(json!({
                "from_account_id": from,
                "to_account_id": to,
                "amount": amount,
                "currency": currency,
            })),
        )
        .await
    }
}

pub fn error_code(body: &Value) -> &str {
    body["error"]["code"].as_str().unwrap_or_default()
}
