// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Vehicle routes.

use crate::error::{AppError, Result};
use crate::models::{NewVehicle, Vehicle, VehicleUpdate};
use crate::routes::snapshot_events;
use crate::services::OwnerScope;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Extension, Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/vehicles", get(list_vehicles).post(create_vehicle))
        .route("/api/vehicles/events", get(vehicle_events))
        .route(
            "/api/vehicles/{id}",
            get(get_vehicle).patch(update_vehicle).delete(delete_vehicle),
        )
        .route("/api/vehicles/{id}/mileage", put(update_mileage))
}

async fn list_vehicles(
    State(state): State<Arc<AppState>>,
    Extension(scope): Extension<OwnerScope>,
) -> Result<Json<Vec<Vehicle>>> {
    Ok(Json(state.services.vehicles.list(&scope).await?))
}

async fn create_vehicle(
    State(state): State<Arc<AppState>>,
    Extension(scope): Extension<OwnerScope>,
    Json(new): Json<NewVehicle>,
) -> Result<(StatusCode, Json<Vehicle>)> {
    let vehicle = state.services.vehicles.create(&scope, new).await?;
    Ok((StatusCode::CREATED, Json(vehicle)))
}

/// Live vehicle list as server-sent events.
async fn vehicle_events(
    State(state): State<Arc<AppState>>,
    Extension(scope): Extension<OwnerScope>,
) -> Result<impl IntoResponse> {
    let subscription = state.services.vehicles.subscribe(&scope).await?;
    Ok(snapshot_events(subscription))
}

async fn get_vehicle(
    State(state): State<Arc<AppState>>,
    Extension(scope): Extension<OwnerScope>,
    Path(id): Path<String>,
) -> Result<Json<Vehicle>> {
    let vehicle = state
        .services
        .vehicles
        .get(&scope, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Vehicle {}", id)))?;
    Ok(Json(vehicle))
}

async fn update_vehicle(
    State(state): State<Arc<AppState>>,
    Extension(scope): Extension<OwnerScope>,
    Path(id): Path<String>,
    Json(update): Json<VehicleUpdate>,
) -> Result<Json<Vehicle>> {
    Ok(Json(
        state.services.vehicles.update(&scope, &id, update).await?,
    ))
}

/// Delete a vehicle together with its maintenance tasks.
async fn delete_vehicle(
    State(state): State<Arc<AppState>>,
    Extension(scope): Extension<OwnerScope>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.services.vehicles.delete(&scope, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct MileageRequest {
    pub mileage: u64,
}

async fn update_mileage(
    State(state): State<Arc<AppState>>,
    Extension(scope): Extension<OwnerScope>,
    Path(id): Path<String>,
    Json(request): Json<MileageRequest>,
) -> Result<Json<Vehicle>> {
    Ok(Json(
        state
            .services
            .vehicles
            .update_mileage(&scope, &id, request.mileage)
            .await?,
    ))
}
