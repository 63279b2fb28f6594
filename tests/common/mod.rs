//! Shared helpers for driving the router in-process.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;
use webhook_dashboard::{
    create_router,
    error::{StoreError, StoreResult},
    types::{EventFilter, GroupCount, GroupField},
    EventId, EventStore, EventSummary, MemoryEventStore, NewWebhookEvent, WebhookEvent,
};

pub fn router(store: Arc<dyn EventStore>) -> Router {
    create_router(store, Duration::from_secs(5))
}

pub fn memory_app() -> (Arc<MemoryEventStore>, Router) {
    let store = Arc::new(MemoryEventStore::new());
    let app = router(store.clone());
    (store, app)
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build request");
    send(app, request).await
}

pub async fn post_json(app: &Router, uri: &str, body: &Value) -> (StatusCode, Value) {
    post_raw(app, uri, serde_json::to_vec(body).expect("serialize body")).await
}

pub async fn post_raw(app: &Router, uri: &str, body: Vec<u8>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("user-agent", "GitHub-Hookshot/test")
        .header("x-github-event", "push")
        .body(Body::from(body))
        .expect("build request");
    send(app, request).await
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.expect("execute request");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("parse response json")
    };
    (status, json)
}

/// Store that fails every call, for exercising 500 paths.
pub struct FailingStore;

fn unavailable<T>() -> StoreResult<T> {
    Err(StoreError::Unavailable("connection refused (os error 111)".to_string()))
}

#[async_trait]
impl EventStore for FailingStore {
    async fn create(&self, _event: NewWebhookEvent) -> StoreResult<WebhookEvent> {
        unavailable()
    }

    async fn find_by_id(&self, _id: EventId) -> StoreResult<Option<WebhookEvent>> {
        unavailable()
    }

    async fn find_many(
        &self,
        _filter: &EventFilter,
        _skip: u64,
        _take: u64,
    ) -> StoreResult<Vec<WebhookEvent>> {
        unavailable()
    }

    async fn count(&self, _filter: &EventFilter) -> StoreResult<u64> {
        unavailable()
    }

    async fn count_by(&self, _field: GroupField) -> StoreResult<Vec<GroupCount>> {
        unavailable()
    }

    async fn recent(&self, _limit: u64) -> StoreResult<Vec<EventSummary>> {
        unavailable()
    }

    async fn delete_all(&self) -> StoreResult<u64> {
        unavailable()
    }

    async fn ping(&self) -> StoreResult<()> {
        unavailable()
    }
}
