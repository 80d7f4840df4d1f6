// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sign-up, sign-in and session token routes.
//!
//! Credentials are checked by the identity provider; on success the service
//! issues its own session JWT, returned in the body and as the
//! `garage_token` cookie.

use crate::error::{AppError, Result};
use crate::middleware::auth::{
    clear_session_cookie, cookies_secure, create_jwt, session_cookie, AuthUser,
};
use crate::services::{Identity, OwnerScope};
use crate::AppState;
use axum::{
    extract::State,
    http::{header, HeaderValue, StatusCode},
    routing::post,
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// Public auth routes.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/signup", post(sign_up))
        .route("/auth/signin", post(sign_in))
        .route("/auth/signout", post(sign_out))
}

/// Auth routes that need a valid session.
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new().route("/auth/refresh", post(refresh))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
    #[validate(length(max = 100))]
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SignInRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Session issued after a successful sign-in.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SessionResponse {
    pub token: String,
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
}

type SessionReply = (
    StatusCode,
    [(header::HeaderName, HeaderValue); 1],
    Json<SessionResponse>,
);

fn issue_session(state: &AppState, identity: Identity, status: StatusCode) -> Result<SessionReply> {
    let token = create_jwt(
        &identity.uid,
        &identity.email,
        &state.config.jwt_signing_key,
        state.config.session_ttl_days,
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;

    let cookie = session_cookie(
        &token,
        state.config.session_ttl_days,
        cookies_secure(&state.config.frontend_url),
    )?;

    Ok((
        status,
        [(header::SET_COOKIE, cookie)],
        Json(SessionResponse {
            token,
            uid: identity.uid,
            email: identity.email,
            display_name: identity.display_name,
        }),
    ))
}

/// Create an account and provision its profile.
async fn sign_up(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SignUpRequest>,
) -> Result<SessionReply> {
    request.validate()?;

    let session = state
        .identity
        .sign_up(
            &request.email,
            &request.password,
            request.display_name.as_deref(),
        )
        .await?;

    let scope = OwnerScope::new(session.identity.uid.clone())?;
    state
        .services
        .profiles
        .ensure_profile(
            &scope,
            &session.identity.email,
            session.identity.display_name.as_deref(),
        )
        .await?;

    tracing::info!(uid = %scope, "Account created");
    issue_session(&state, session.identity, StatusCode::CREATED)
}

async fn sign_in(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SignInRequest>,
) -> Result<SessionReply> {
    request.validate()?;

    let session = state
        .identity
        .sign_in(&request.email, &request.password)
        .await?;

    tracing::info!(uid = %session.identity.uid, "Signed in");
    issue_session(&state, session.identity, StatusCode::OK)
}

/// Clear the session cookie. Bearer tokens simply expire.
async fn sign_out(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, [(header::HeaderName, HeaderValue); 1]) {
    let secure = cookies_secure(&state.config.frontend_url);
    (
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, clear_session_cookie(secure))],
    )
}

/// Re-issue a fresh token for the current session.
async fn refresh(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<SessionReply> {
    let display_name = state
        .services
        .profiles
        .get(&user.scope()?)
        .await?
        .map(|profile| profile.display_name)
        .filter(|name| !name.is_empty());

    let identity = Identity {
        uid: user.uid,
        email: user.email,
        display_name,
        photo_url: None,
    };
    issue_session(&state, identity, StatusCode::OK)
}
