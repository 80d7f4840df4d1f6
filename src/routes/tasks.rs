// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Generic to-do task routes.

use crate::error::{AppError, Result};
use crate::models::{NewTask, Task, TaskUpdate};
use crate::routes::snapshot_events;
use crate::services::status::TaskListFilter;
use crate::services::OwnerScope;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Extension, Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route("/api/tasks/events", get(task_events))
        .route(
            "/api/tasks/{id}",
            get(get_task).patch(update_task).delete(delete_task),
        )
        .route("/api/tasks/{id}/completed", put(set_completed))
}

#[derive(Debug, Default, Deserialize)]
pub struct TaskQuery {
    #[serde(default)]
    pub show_completed: bool,
}

async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Extension(scope): Extension<OwnerScope>,
    Query(query): Query<TaskQuery>,
) -> Result<Json<Vec<Task>>> {
    let filter = TaskListFilter {
        show_completed: query.show_completed,
        status: None,
    };
    Ok(Json(state.services.tasks.list(&scope, &filter).await?))
}

async fn create_task(
    State(state): State<Arc<AppState>>,
    Extension(scope): Extension<OwnerScope>,
    Json(new): Json<NewTask>,
) -> Result<(StatusCode, Json<Task>)> {
    let task = state.services.tasks.create(&scope, new).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

async fn task_events(
    State(state): State<Arc<AppState>>,
    Extension(scope): Extension<OwnerScope>,
) -> Result<impl IntoResponse> {
    let subscription = state.services.tasks.subscribe(&scope).await?;
    Ok(snapshot_events(subscription))
}

async fn get_task(
    State(state): State<Arc<AppState>>,
    Extension(scope): Extension<OwnerScope>,
    Path(id): Path<String>,
) -> Result<Json<Task>> {
    let task = state
        .services
        .tasks
        .get(&scope, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Task {}", id)))?;
    Ok(Json(task))
}

async fn update_task(
    State(state): State<Arc<AppState>>,
    Extension(scope): Extension<OwnerScope>,
    Path(id): Path<String>,
    Json(update): Json<TaskUpdate>,
) -> Result<Json<Task>> {
    Ok(Json(state.services.tasks.update(&scope, &id, update).await?))
}

async fn delete_task(
    State(state): State<Arc<AppState>>,
    Extension(scope): Extension<OwnerScope>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.services.tasks.delete(&scope, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct CompletedRequest {
    pub completed: bool,
}

async fn set_completed(
    State(state): State<Arc<AppState>>,
    Extension(scope): Extension<OwnerScope>,
    Path(id): Path<String>,
    Json(request): Json<CompletedRequest>,
) -> Result<Json<Task>> {
    Ok(Json(
        state
            .services
            .tasks
            .set_completed(&scope, &id, request.completed)
            .await?,
    ))
}
