// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile routes for the signed-in user.

use crate::error::{AppError, Result};
use crate::models::{ProfileUpdate, UserProfile};
use crate::services::OwnerScope;
use crate::AppState;
use axum::{
    extract::State,
    routing::{get, post},
    Extension, Json, Router,
};
use std::sync::Arc;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me).patch(update_me))
        .route("/api/me/recount", post(recount))
}

/// Get current user profile.
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(scope): Extension<OwnerScope>,
) -> Result<Json<UserProfile>> {
    let profile = state
        .services
        .profiles
        .get(&scope)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Profile {}", scope.uid())))?;
    Ok(Json(profile))
}

async fn update_me(
    State(state): State<Arc<AppState>>,
    Extension(scope): Extension<OwnerScope>,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<UserProfile>> {
    let profile = state.services.profiles.update(&scope, &update).await?;
    Ok(Json(profile))
}

/// Recompute the denormalized counters from the live collections.
async fn recount(
    State(state): State<Arc<AppState>>,
    Extension(scope): Extension<OwnerScope>,
) -> Result<Json<UserProfile>> {
    let vehicles = state.services.vehicles.list(&scope).await?;
    let profile = state.services.profiles.recount(&scope, &vehicles).await?;
    Ok(Json(profile))
}
