// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sign-up, sign-in and session routes.

use crate::auth_client::AuthClient;
use crate::backend::{Identity, Session, SignUpMetadata};
use crate::credential::validate_admin_secret;
use crate::error::{AppError, Result};
use crate::middleware::session::{
    create_session_token, session_cookie, session_cookie_removal, CurrentUser,
};
use crate::models::{Profile, Role};
use crate::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

/// Auth pages for visitors who are not signed in.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth", get(auth_page))
        .route("/auth/signup", post(sign_up))
        .route("/auth/signin", post(sign_in))
}

/// Session routes for signed-in users.
pub fn session_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/signout", post(sign_out))
        .route("/auth/refresh", post(refresh))
        .route("/me", get(get_me))
}

#[derive(Serialize)]
pub struct AuthPage {
    pub roles: [Role; 2],
    /// Authority signup needs the pass-phrase
    pub authority_requires_secret: bool,
}

async fn auth_page() -> Json<AuthPage> {
    Json(AuthPage {
        roles: [Role::Community, Role::Authority],
        authority_requires_secret: true,
    })
}

#[derive(Debug, Deserialize, Validate)]
pub struct SignUpRequest {
    #[validate(email(message = "A valid email address is required"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password should be at least 6 characters"))]
    pub password: String,
    #[validate(length(min = 1, max = 100, message = "Full name is required"))]
    pub full_name: String,
    #[serde(default)]
    pub role: Role,
    pub admin_secret_key: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SignInRequest {
    #[validate(email(message = "A valid email address is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: Option<Identity>,
    pub profile: Option<Profile>,
    /// Account created but the backend wants the e-mail confirmed first
    pub confirmation_required: bool,
}

/// Authority accounts need the configured pass-phrase.
fn check_role_secret(request: &SignUpRequest, configured: &str) -> Result<()> {
    if request.role != Role::Authority {
        return Ok(());
    }
    let secret = request
        .admin_secret_key
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or(AppError::MissingAdminSecret)?;
    if !validate_admin_secret(secret, configured) {
        tracing::warn!(email = %request.email, "Authority signup with invalid admin secret key");
        return Err(AppError::InvalidAdminSecret);
    }
    Ok(())
}

async fn sign_up(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(request): Json<SignUpRequest>,
) -> Result<(CookieJar, (StatusCode, Json<AuthResponse>))> {
    request.validate()?;
    check_role_secret(&request, &state.config.admin_secret_key)?;

    let client = Arc::new(AuthClient::new(state.backend.auth.clone()));
    let metadata = SignUpMetadata {
        full_name: Some(request.full_name.clone()),
        role: Some(request.role),
    };
    let session = client
        .sign_up(&request.email, &request.password, &metadata)
        .await?;

    let Some(session) = session else {
        tracing::info!(email = %request.email, "Signup pending e-mail confirmation");
        let response = AuthResponse {
            user: None,
            profile: None,
            confirmation_required: true,
        };
        return Ok((jar, (StatusCode::CREATED, Json(response))));
    };

    let mut profile = Profile::new(
        session.user.id.clone(),
        Some(request.full_name.clone()),
        request.role,
    );
    let now = chrono::Utc::now();
    profile.created_at = Some(now);
    profile.updated_at = Some(now);
    match state
        .backend
        .profiles
        .insert(Some(&session.access_token), &profile)
        .await
    {
        Ok(()) => tracing::info!(user_id = %profile.id, role = %profile.role, "Profile created"),
        Err(e) => tracing::error!(user_id = %profile.id, error = %e, "Error creating profile"),
    }
    state
        .fallback
        .upsert_profile(&profile.id, Some(&request.full_name));

    let (jar, response) = open_session(&state, jar, client, &session).await?;
    Ok((jar, (StatusCode::CREATED, Json(response))))
}

async fn sign_in(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(request): Json<SignInRequest>,
) -> Result<(CookieJar, Json<AuthResponse>)> {
    request.validate()?;

    let client = Arc::new(AuthClient::new(state.backend.auth.clone()));
    let session = client.sign_in(&request.email, &request.password).await?;
    let (jar, response) = open_session(&state, jar, client, &session).await?;
    Ok((jar, Json(response)))
}

/// Register a browser session for a signed-in client and set its cookie.
async fn open_session(
    state: &AppState,
    jar: CookieJar,
    client: Arc<AuthClient>,
    session: &Session,
) -> Result<(CookieJar, AuthResponse)> {
    let client_session = state.start_session(client);
    let token = create_session_token(client_session.id, &state.config.session_signing_key)?;

    let snapshot = client_session.store.ready().await;
    tracing::info!(
        user_id = %session.user.id,
        session_id = %client_session.id,
        "Session started"
    );

    let secure = state.config.frontend_url.starts_with("https://");
    let response = AuthResponse {
        user: snapshot.identity().cloned(),
        profile: snapshot.profile,
        confirmation_required: false,
    };
    Ok((jar.add(session_cookie(token, secure)), response))
}

#[derive(Serialize)]
pub struct SignOutResponse {
    pub signed_out: bool,
}

async fn sign_out(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    user: CurrentUser,
) -> (CookieJar, Json<SignOutResponse>) {
    if let Err(e) = user.session.client.sign_out().await {
        tracing::warn!(user_id = %user.id(), error = %e, "Backend sign-out failed");
    }
    state.end_session(user.session.id);
    tracing::info!(user_id = %user.id(), "Signed out");

    (
        jar.remove(session_cookie_removal()),
        Json(SignOutResponse { signed_out: true }),
    )
}

#[derive(Serialize)]
pub struct RefreshResponse {
    pub expires_in: i64,
}

async fn refresh(user: CurrentUser) -> Result<Json<RefreshResponse>> {
    let session = user.session.client.refresh().await?;
    let token = session.access_token.clone();
    user.session
        .store
        .wait_for(|s| s.access_token.as_deref() == Some(token.as_str()))
        .await;
    Ok(Json(RefreshResponse {
        expires_in: session.expires_in,
    }))
}

#[derive(Serialize)]
pub struct MeResponse {
    pub user: Identity,
    pub profile: Option<Profile>,
}

async fn get_me(user: CurrentUser) -> Json<MeResponse> {
    Json(MeResponse {
        user: user.identity,
        profile: user.profile,
    })
}
