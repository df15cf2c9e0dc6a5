// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Browser session lookup and route guards.

use crate::backend::Identity;
use crate::error::AppError;
use crate::guard::{decide, Access, GuardDecision, GuardInput};
use crate::models::Profile;
use crate::session::{ClientSession, SessionSnapshot, SESSION_TTL_SECS};
use crate::AppState;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Cookie carrying the signed session id.
pub const SESSION_COOKIE: &str = "mw_session";

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Session id in the registry
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

/// The registry entry for the request's session, when there is one.
#[derive(Clone)]
pub struct CurrentSession(pub Arc<ClientSession>);

/// Resolve the session cookie (or bearer token) to a live session.
///
/// Unknown, expired or forged tokens leave the request anonymous.
pub async fn load_session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let session_id = session_token(&jar, request.headers())
        .and_then(|token| decode_session_id(&token, &state.config.session_signing_key));

    if let Some(id) = session_id {
        match state.sessions.get(&id).map(|entry| entry.value().clone()) {
            Some(session) if session.is_expired(chrono::Utc::now()) => {
                tracing::debug!(session_id = %id, "Session expired");
                state.end_session(id);
            }
            Some(session) => {
                request.extensions_mut().insert(CurrentSession(session));
            }
            None => tracing::debug!(session_id = %id, "Session not found"),
        }
    }

    next.run(request).await
}

fn session_token(jar: &CookieJar, headers: &HeaderMap) -> Option<String> {
    // Try cookie first, then header
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        return Some(cookie.value().to_string());
    }
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::to_string)
}

/// Verify a session token and return the session id it names.
pub fn decode_session_id(token: &str, signing_key: &[u8]) -> Option<Uuid> {
    let key = DecodingKey::from_secret(signing_key);
    let validation = Validation::new(Algorithm::HS256);
    let data = decode::<Claims>(token, &key, &validation).ok()?;
    data.claims.sub.parse().ok()
}

/// Create a signed token naming a session.
pub fn create_session_token(session_id: Uuid, signing_key: &[u8]) -> anyhow::Result<String> {
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as usize;

    let claims = Claims {
        sub: session_id.to_string(),
        iat: now,
        exp: now + SESSION_TTL_SECS as usize,
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )?)
}

/// Session cookie; `Secure` unless the frontend is served over plain HTTP.
pub fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

/// Cookie matching [`session_cookie`] for removal.
pub fn session_cookie_removal() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}

// ─── Guards ──────────────────────────────────────────────────

pub async fn public_only(request: Request, next: Next) -> Response {
    enforce(Access::PublicOnly, request, next).await
}

pub async fn auth_required(request: Request, next: Next) -> Response {
    enforce(Access::AuthRequired, request, next).await
}

pub async fn admin_required(request: Request, next: Next) -> Response {
    enforce(Access::AdminRequired, request, next).await
}

async fn enforce(access: Access, request: Request, next: Next) -> Response {
    let snapshot = request
        .extensions()
        .get::<CurrentSession>()
        .map(|current| current.0.store.snapshot())
        .unwrap_or_else(SessionSnapshot::anonymous);

    let decision = decide(GuardInput::from(&snapshot), access);
    match decision_response(decision) {
        Some(response) => {
            tracing::debug!(path = %request.uri().path(), ?access, ?decision, "Navigation blocked");
            response
        }
        None => next.run(request).await,
    }
}

/// HTTP rendering of a guard decision; `None` lets the request through.
pub fn decision_response(decision: GuardDecision) -> Option<Response> {
    match decision {
        GuardDecision::Render => None,
        GuardDecision::Redirect(to) => Some(Redirect::to(to).into_response()),
        GuardDecision::Loading => Some(
            (
                StatusCode::ACCEPTED,
                [(header::RETRY_AFTER, "1")],
                Json(serde_json::json!({ "status": "loading" })),
            )
                .into_response(),
        ),
    }
}

// ─── Extractor ───────────────────────────────────────────────

/// Signed-in user of the request, as the session store sees it now.
pub struct CurrentUser {
    pub session: Arc<ClientSession>,
    pub identity: Identity,
    pub profile: Option<Profile>,
    access_token: Option<String>,
}

impl CurrentUser {
    pub fn id(&self) -> &str {
        &self.identity.id
    }

    /// Backend token for calls made on the user's behalf.
    pub fn token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub fn is_authority(&self) -> bool {
        self.profile.as_ref().is_some_and(Profile::is_authority)
    }

    /// Name from the profile, else from signup metadata.
    pub fn display_name(&self) -> Option<&str> {
        self.profile
            .as_ref()
            .and_then(|p| p.full_name.as_deref())
            .or(self.identity.metadata.full_name.as_deref())
    }
}

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let CurrentSession(session) = parts
            .extensions
            .get::<CurrentSession>()
            .cloned()
            .ok_or(AppError::Unauthorized)?;

        let snapshot = session.store.snapshot();
        let identity = snapshot.identity().cloned().ok_or(AppError::Unauthorized)?;

        Ok(Self {
            identity,
            profile: snapshot.profile,
            access_token: snapshot.access_token,
            session,
        })
    }
}
