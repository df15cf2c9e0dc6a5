// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use mangrove_watch::backend::Backend;
use mangrove_watch::config::Config;
use mangrove_watch::routes::create_router;
use mangrove_watch::AppState;
use std::sync::Arc;
use tower::ServiceExt;

/// Pass-phrase configured in [`Config::test_default`].
#[allow(dead_code)]
pub const ADMIN_SECRET: &str = "TIDE_GUARD_2024";

/// Create a test app in offline mode (local accounts, fallback data).
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (Router, Arc<AppState>) {
    create_test_app_with_config(Config::test_default())
}

#[allow(dead_code)]
pub fn create_test_app_with_config(config: Config) -> (Router, Arc<AppState>) {
    let backend = Backend::from_config(&config).expect("Failed to build backend");
    let state = Arc::new(AppState::new(config, backend));
    (create_router(state.clone()), state)
}

/// Build a request with an optional session cookie and JSON body.
#[allow(dead_code)]
pub fn request(
    method: Method,
    uri: &str,
    cookie: Option<&str>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Send one request through a clone of the router.
#[allow(dead_code)]
pub async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

#[allow(dead_code)]
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// `name=value` of the session cookie set by a response.
#[allow(dead_code)]
pub fn session_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with("mw_session="))
        .and_then(|value| value.split(';').next())
        .map(str::to_string)
}

#[allow(dead_code)]
pub fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

/// Sign up and return the session cookie.
#[allow(dead_code)]
pub async fn sign_up(app: &Router, email: &str, role: &str, secret: Option<&str>) -> String {
    let response = send(
        app,
        request(
            Method::POST,
            "/auth/signup",
            None,
            Some(serde_json::json!({
                "email": email,
                "password": "mangrove1",
                "full_name": "Test Ranger",
                "role": role,
                "admin_secret_key": secret,
            })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    session_cookie(&response).expect("signup should set a session cookie")
}

/// Community signup in one call.
#[allow(dead_code)]
pub async fn sign_up_community(app: &Router, email: &str) -> String {
    sign_up(app, email, "community", None).await
}

/// Base64 payload of a tiny JPEG-like file.
#[allow(dead_code)]
pub fn photo_json() -> serde_json::Value {
    serde_json::json!({
        "file_name": "spill.jpg",
        "content_type": "image/jpeg",
        "data": "/9j/4AAQSkZJRgABAQ==",
    })
}
