//! Test utilities and common setup.

#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use serde_json::Value;
use tower::ServiceExt;

use userd::api::{self, AppState};
use userd::user::{SeedUser, UserService, UserStore};

/// Application state seeded with the default two users.
pub fn test_state() -> AppState {
    let store = UserStore::seeded(SeedUser::defaults()).unwrap();
    AppState::new(UserService::new(store))
}

/// Create a test application with the default seed and no static files.
pub fn test_app() -> Router {
    api::create_router(test_state())
}

/// Send a request and return the status and raw body.
pub async fn send_raw(
    app: &Router,
    method: Method,
    uri: &str,
    content_type: Option<&str>,
    body: Body,
) -> (StatusCode, Vec<u8>) {
    let mut builder = Request::builder().uri(uri).method(method);
    if let Some(content_type) = content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    (status, body.to_vec())
}

/// Send a request with an optional JSON body and parse the JSON response.
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let (content_type, body) = match body {
        Some(json) => (
            Some("application/json"),
            Body::from(serde_json::to_vec(&json).unwrap()),
        ),
        None => (None, Body::empty()),
    };

    let (status, bytes) = send_raw(app, method, uri, content_type, body).await;
    let json = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}
