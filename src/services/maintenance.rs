// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Maintenance task data access for one vehicle at a time.

use crate::db::{to_document_data, CollectionPath, DocumentPath, DocumentStore};
use crate::error::AppError;
use crate::models::{
    CompletionInput, MaintenanceTask, MaintenanceTaskUpdate, NewMaintenanceTask,
};
use crate::services::profile::{Counter, ProfileService};
use crate::services::scope::OwnerScope;
use crate::services::status::{self, ClassifiedTask, StatusSummary, TaskListFilter};
use crate::services::subscription::Subscription;
use crate::services::vehicles::VehicleService;
use crate::time_utils::now_rfc3339;
use chrono::{DateTime, Utc};
use futures_util::stream::{self, StreamExt};
use std::sync::Arc;
use validator::Validate;

/// Maximum concurrent deletes when clearing a collection.
const MAX_CONCURRENT_DB_OPS: usize = 50;

/// Delete every document in `collection` and return how many there were.
///
/// Deletes run concurrently. All of them are attempted; if any fails the
/// first error is returned and the successful ones are not undone.
pub(crate) async fn delete_collection(
    store: &dyn DocumentStore,
    collection: &CollectionPath,
) -> Result<usize, AppError> {
    let docs = store.list(collection, None).await?;
    let count = docs.len();

    stream::iter(docs)
        .map(|doc| {
            let path = collection.doc(doc.id);
            async move { store.delete(&path).await }
        })
        .buffer_unordered(MAX_CONCURRENT_DB_OPS)
        .collect::<Vec<Result<(), AppError>>>()
        .await
        .into_iter()
        .collect::<Result<Vec<()>, AppError>>()?;

    tracing::debug!(collection = %collection, count, "Deleted collection documents");
    Ok(count)
}

#[derive(Clone)]
pub struct MaintenanceService {
    store: Arc<dyn DocumentStore>,
    vehicles: VehicleService,
    profiles: ProfileService,
}

impl MaintenanceService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        vehicles: VehicleService,
        profiles: ProfileService,
    ) -> Self {
        Self {
            store,
            vehicles,
            profiles,
        }
    }

    fn task_doc(scope: &OwnerScope, vehicle_id: &str, task_id: &str) -> DocumentPath {
        scope.maintenance_tasks(vehicle_id).doc(task_id)
    }

    /// Create a task under an existing vehicle.
    pub async fn create(
        &self,
        scope: &OwnerScope,
        vehicle_id: &str,
        new: NewMaintenanceTask,
    ) -> Result<MaintenanceTask, AppError> {
        let mut task = new.into_task(vehicle_id, &now_rfc3339())?;

        if self.vehicles.get(scope, vehicle_id).await?.is_none() {
            return Err(AppError::NotFound(format!("Vehicle {}", vehicle_id)));
        }

        task.id = self
            .store
            .create(&scope.maintenance_tasks(vehicle_id), to_document_data(&task)?)
            .await?;

        tracing::info!(
            uid = %scope,
            vehicle_id,
            task_id = %task.id,
            category = %task.category,
            "Maintenance task created"
        );

        self.profiles
            .increment_counter(scope, Counter::MaintenanceTasks, 1)
            .await;
        Ok(task)
    }

    pub async fn get(
        &self,
        scope: &OwnerScope,
        vehicle_id: &str,
        task_id: &str,
    ) -> Result<Option<MaintenanceTask>, AppError> {
        self.store
            .get(&Self::task_doc(scope, vehicle_id, task_id))
            .await?
            .map(|doc| doc.into_model())
            .transpose()
    }

    /// Raw task list filtered on the stored completed flag, oldest first.
    pub async fn list(
        &self,
        scope: &OwnerScope,
        vehicle_id: &str,
        filter: &TaskListFilter,
    ) -> Result<Vec<MaintenanceTask>, AppError> {
        let mut tasks = self
            .store
            .list(&scope.maintenance_tasks(vehicle_id), None)
            .await?
            .into_iter()
            .map(|doc| doc.into_model::<MaintenanceTask>())
            .collect::<Result<Vec<_>, _>>()?;

        tasks.retain(|task| filter.includes_completed_flag(task.completed));
        tasks.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(tasks)
    }

    /// Tasks of a vehicle classified at `now`, filtered and in display order.
    ///
    /// `None` if the vehicle does not exist.
    pub async fn list_classified(
        &self,
        scope: &OwnerScope,
        vehicle_id: &str,
        filter: &TaskListFilter,
        now: DateTime<Utc>,
    ) -> Result<Option<Vec<ClassifiedTask>>, AppError> {
        let Some(vehicle) = self.vehicles.get(scope, vehicle_id).await? else {
            return Ok(None);
        };
        let tasks = self
            .list(scope, vehicle_id, &TaskListFilter::show_completed())
            .await?;
        Ok(Some(status::classify_all(tasks, &vehicle, now, filter)))
    }

    /// Per-status counts for a vehicle. `None` if the vehicle does not exist.
    pub async fn summary(
        &self,
        scope: &OwnerScope,
        vehicle_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<StatusSummary>, AppError> {
        let Some(vehicle) = self.vehicles.get(scope, vehicle_id).await? else {
            return Ok(None);
        };
        let tasks = self
            .list(scope, vehicle_id, &TaskListFilter::show_completed())
            .await?;
        Ok(Some(StatusSummary::from_statuses(
            tasks.iter().map(|task| status::classify(task, &vehicle, now)),
        )))
    }

    pub async fn update(
        &self,
        scope: &OwnerScope,
        vehicle_id: &str,
        task_id: &str,
        mut update: MaintenanceTaskUpdate,
    ) -> Result<MaintenanceTask, AppError> {
        update.validate()?;
        update.updated_at = Some(now_rfc3339());

        let doc = Self::task_doc(scope, vehicle_id, task_id);
        self.store.update(&doc, to_document_data(&update)?).await?;
        tracing::debug!(uid = %scope, vehicle_id, task_id, "Maintenance task updated");

        self.get(scope, vehicle_id, task_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Maintenance task {}", task_id)))
    }

    /// Mark a task completed. One-way; completing twice is rejected.
    pub async fn complete(
        &self,
        scope: &OwnerScope,
        vehicle_id: &str,
        task_id: &str,
        input: CompletionInput,
    ) -> Result<MaintenanceTask, AppError> {
        input.validate()?;

        let mut task = self
            .get(scope, vehicle_id, task_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Maintenance task {}", task_id)))?;

        let record = task.complete(input, &now_rfc3339())?;
        self.store
            .update(
                &Self::task_doc(scope, vehicle_id, task_id),
                to_document_data(&record)?,
            )
            .await?;

        tracing::info!(
            uid = %scope,
            vehicle_id,
            task_id,
            completed_mileage = record.completed_mileage,
            "Maintenance task completed"
        );
        Ok(task)
    }

    pub async fn delete(
        &self,
        scope: &OwnerScope,
        vehicle_id: &str,
        task_id: &str,
    ) -> Result<(), AppError> {
        let doc = Self::task_doc(scope, vehicle_id, task_id);
        if self.store.get(&doc).await?.is_none() {
            return Err(AppError::NotFound(format!("Maintenance task {}", task_id)));
        }

        self.store.delete(&doc).await?;
        tracing::info!(uid = %scope, vehicle_id, task_id, "Maintenance task deleted");

        self.profiles
            .increment_counter(scope, Counter::MaintenanceTasks, -1)
            .await;
        Ok(())
    }

    /// Remove every task of a vehicle, returning how many were deleted.
    pub async fn delete_all_for_vehicle(
        &self,
        scope: &OwnerScope,
        vehicle_id: &str,
    ) -> Result<usize, AppError> {
        let count =
            delete_collection(self.store.as_ref(), &scope.maintenance_tasks(vehicle_id)).await?;
        self.profiles
            .increment_counter(scope, Counter::MaintenanceTasks, -(count as i64))
            .await;
        Ok(count)
    }

    /// Live task list for one vehicle, all tasks including completed ones.
    pub async fn subscribe(
        &self,
        scope: &OwnerScope,
        vehicle_id: &str,
    ) -> Result<Subscription<MaintenanceTask>, AppError> {
        let feed = self
            .store
            .watch(&scope.maintenance_tasks(vehicle_id), None)
            .await?;

        let service = self.clone();
        let owner = scope.clone();
        let vehicle = vehicle_id.to_string();
        Ok(Subscription::spawn(
            format!("maintenance:{}:{}", scope, vehicle_id),
            feed,
            move || {
                let service = service.clone();
                let owner = owner.clone();
                let vehicle = vehicle.clone();
                async move {
                    service
                        .list(&owner, &vehicle, &TaskListFilter::show_completed())
                        .await
                }
            },
        ))
    }
}
