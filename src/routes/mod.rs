// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP route handlers.
//!
//! Each page is a JSON view. Route groups carry the guard for their access
//! level; `/health` and `/status` are unguarded.

pub mod admin;
pub mod auth;
pub mod public;
pub mod reports;

use crate::error::{BackendError, Result};
use crate::middleware::session::{admin_required, auth_required, load_session, public_only};
use crate::AppState;
use axum::http::{header, Method};
use axum::{middleware, routing::get, Router};
use std::future::Future;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

/// Build the complete router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    // CORS layer - allow requests from frontend URL and localhost (for dev)
    let frontend_url = state.config.frontend_url.clone();
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::AllowOrigin::predicate(
            move |origin: &axum::http::HeaderValue, _request_parts: &axum::http::request::Parts| {
                let origin_str = origin.to_str().unwrap_or("");
                origin_str == frontend_url
                    || origin_str.starts_with("http://localhost")
                    || origin_str.starts_with("http://127.0.0.1")
            },
        ))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]);

    let unguarded = Router::new()
        .route("/health", get(public::health_check))
        .route("/status", get(public::backend_status));

    let public_only_routes = public::routes()
        .merge(auth::public_routes())
        .route_layer(middleware::from_fn(public_only));

    let signed_in_routes = reports::routes()
        .merge(auth::session_routes())
        .route_layer(middleware::from_fn(auth_required));

    let admin_routes = admin::routes().route_layer(middleware::from_fn(admin_required));

    Router::new()
        .merge(unguarded)
        .merge(public_only_routes)
        .merge(signed_in_routes)
        .merge(admin_routes)
        .layer(middleware::from_fn_with_state(state.clone(), load_session))
        .layer(middleware::from_fn(
            crate::middleware::security::add_security_headers,
        ))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

/// Read from the fallback store first and only go to the backend when it
/// has nothing.
pub(crate) async fn fallback_first<T, F>(local: Vec<T>, remote: F) -> Result<Vec<T>>
where
    F: Future<Output = std::result::Result<Vec<T>, BackendError>>,
{
    if !local.is_empty() {
        return Ok(local);
    }
    Ok(remote.await?)
}

/// Log a failed backend write that mirrors a fallback write.
pub(crate) fn warn_on_remote_error(result: std::result::Result<(), BackendError>, what: &str) {
    if let Err(e) = result {
        tracing::warn!(error = %e, "Remote {} failed, local copy kept", what);
    }
}
