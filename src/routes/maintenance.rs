// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Maintenance task routes, nested under their vehicle.
//!
//! Lists are returned classified (status + highlight) and in display order,
//! evaluated at request time.

use crate::error::{AppError, Result};
use crate::models::{
    CompletionInput, MaintenanceTask, MaintenanceTaskUpdate, NewMaintenanceTask,
};
use crate::routes::snapshot_events;
use crate::services::status::{classify, ClassifiedTask, StatusSummary, TaskListFilter};
use crate::services::OwnerScope;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::Utc;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/vehicles/{id}/maintenance",
            get(list_tasks).post(create_task),
        )
        .route("/api/vehicles/{id}/maintenance/summary", get(summary))
        .route("/api/vehicles/{id}/maintenance/events", get(task_events))
        .route(
            "/api/vehicles/{id}/maintenance/{task_id}",
            get(get_task).patch(update_task).delete(delete_task),
        )
        .route(
            "/api/vehicles/{id}/maintenance/{task_id}/complete",
            post(complete_task),
        )
}

fn vehicle_not_found(id: &str) -> AppError {
    AppError::NotFound(format!("Vehicle {}", id))
}

/// Classified task list. `?show_completed=true` includes completed tasks,
/// `?status=overdue` narrows to one status.
async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Extension(scope): Extension<OwnerScope>,
    Path(id): Path<String>,
    Query(filter): Query<TaskListFilter>,
) -> Result<Json<Vec<ClassifiedTask>>> {
    let tasks = state
        .services
        .maintenance
        .list_classified(&scope, &id, &filter, Utc::now())
        .await?
        .ok_or_else(|| vehicle_not_found(&id))?;
    Ok(Json(tasks))
}

async fn create_task(
    State(state): State<Arc<AppState>>,
    Extension(scope): Extension<OwnerScope>,
    Path(id): Path<String>,
    Json(new): Json<NewMaintenanceTask>,
) -> Result<(StatusCode, Json<MaintenanceTask>)> {
    let task = state.services.maintenance.create(&scope, &id, new).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

async fn summary(
    State(state): State<Arc<AppState>>,
    Extension(scope): Extension<OwnerScope>,
    Path(id): Path<String>,
) -> Result<Json<StatusSummary>> {
    let summary = state
        .services
        .maintenance
        .summary(&scope, &id, Utc::now())
        .await?
        .ok_or_else(|| vehicle_not_found(&id))?;
    Ok(Json(summary))
}

/// Live raw task list for one vehicle as server-sent events.
async fn task_events(
    State(state): State<Arc<AppState>>,
    Extension(scope): Extension<OwnerScope>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    if state.services.vehicles.get(&scope, &id).await?.is_none() {
        return Err(vehicle_not_found(&id));
    }
    let subscription = state.services.maintenance.subscribe(&scope, &id).await?;
    Ok(snapshot_events(subscription))
}

async fn get_task(
    State(state): State<Arc<AppState>>,
    Extension(scope): Extension<OwnerScope>,
    Path((id, task_id)): Path<(String, String)>,
) -> Result<Json<ClassifiedTask>> {
    let vehicle = state
        .services
        .vehicles
        .get(&scope, &id)
        .await?
        .ok_or_else(|| vehicle_not_found(&id))?;
    let task = state
        .services
        .maintenance
        .get(&scope, &id, &task_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Maintenance task {}", task_id)))?;

    let status = classify(&task, &vehicle, Utc::now());
    Ok(Json(ClassifiedTask::new(task, status)))
}

async fn update_task(
    State(state): State<Arc<AppState>>,
    Extension(scope): Extension<OwnerScope>,
    Path((id, task_id)): Path<(String, String)>,
    Json(update): Json<MaintenanceTaskUpdate>,
) -> Result<Json<MaintenanceTask>> {
    Ok(Json(
        state
            .services
            .maintenance
            .update(&scope, &id, &task_id, update)
            .await?,
    ))
}

async fn delete_task(
    State(state): State<Arc<AppState>>,
    Extension(scope): Extension<OwnerScope>,
    Path((id, task_id)): Path<(String, String)>,
) -> Result<StatusCode> {
    state
        .services
        .maintenance
        .delete(&scope, &id, &task_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// One-way completion transition.
async fn complete_task(
    State(state): State<Arc<AppState>>,
    Extension(scope): Extension<OwnerScope>,
    Path((id, task_id)): Path<(String, String)>,
    Json(input): Json<CompletionInput>,
) -> Result<Json<MaintenanceTask>> {
    Ok(Json(
        state
            .services
            .maintenance
            .complete(&scope, &id, &task_id, input)
            .await?,
    ))
}
