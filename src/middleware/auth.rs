// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JWT authentication middleware and session cookie helpers.

use crate::error::AppError;
use crate::services::OwnerScope;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Session cookie name.
pub const SESSION_COOKIE: &str = "garage_token";

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (identity provider uid)
    pub sub: String,
    pub email: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

/// Authenticated user extracted from JWT.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub uid: String,
    pub email: String,
}

impl AuthUser {
    pub fn scope(&self) -> Result<OwnerScope, AppError> {
        OwnerScope::new(self.uid.clone())
    }
}

/// Middleware that requires valid JWT authentication.
///
/// On success the request carries both an [`AuthUser`] and its
/// [`OwnerScope`] as extensions.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    // Try cookie first, then header
    let token = if let Some(cookie) = jar.get(SESSION_COOKIE) {
        cookie.value().to_string()
    } else {
        let auth_header = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        match auth_header.and_then(|h| h.strip_prefix("Bearer ")) {
            Some(token) => token.to_string(),
            None => return Err(AppError::Unauthorized),
        }
    };

    let claims = verify_jwt(&token, &state.config.jwt_signing_key)?;
    let scope = OwnerScope::new(claims.sub.clone()).map_err(|_| AppError::InvalidToken)?;

    request.extensions_mut().insert(AuthUser {
        uid: claims.sub,
        email: claims.email,
    });
    request.extensions_mut().insert(scope);

    Ok(next.run(request).await)
}

/// Decode and validate a session token.
pub fn verify_jwt(token: &str, signing_key: &[u8]) -> Result<Claims, AppError> {
    let key = DecodingKey::from_secret(signing_key);
    let validation = Validation::new(Algorithm::HS256);

    decode::<Claims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!(error = %e, "Rejected session token");
            AppError::InvalidToken
        })
}

/// Session lifetime in seconds, at least one day.
fn ttl_seconds(ttl_days: i64) -> anyhow::Result<i64> {
    ttl_days
        .max(1)
        .checked_mul(24 * 60 * 60)
        .ok_or_else(|| anyhow::anyhow!("Session TTL of {} days is out of range", ttl_days))
}

/// Create a JWT for a user session.
pub fn create_jwt(
    uid: &str,
    email: &str,
    signing_key: &[u8],
    ttl_days: i64,
) -> anyhow::Result<String> {
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = usize::try_from(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs())?;
    let exp = usize::try_from(ttl_seconds(ttl_days)?)?
        .checked_add(now)
        .ok_or_else(|| anyhow::anyhow!("Session expiry overflows"))?;

    let claims = Claims {
        sub: uid.to_string(),
        email: email.to_string(),
        iat: now,
        exp,
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )?)
}

/// `Secure` is only set when the frontend is served over HTTPS.
pub fn cookies_secure(frontend_url: &str) -> bool {
    frontend_url.starts_with("https://")
}

/// `Set-Cookie` value carrying a session token.
pub fn session_cookie(token: &str, ttl_days: i64, secure: bool) -> Result<HeaderValue, AppError> {
    let secure_flag = if secure { "; Secure" } else { "" };
    let cookie = format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}{}",
        SESSION_COOKIE,
        token,
        ttl_seconds(ttl_days)?,
        secure_flag
    );
    HeaderValue::from_str(&cookie)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid session cookie: {}", e)))
}

/// `Set-Cookie` value that clears the session cookie.
pub fn clear_session_cookie(secure: bool) -> HeaderValue {
    if secure {
        HeaderValue::from_static("garage_token=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0; Secure")
    } else {
        HeaderValue::from_static("garage_token=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0")
    }
}
