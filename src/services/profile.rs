// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User profile documents and their denormalized counters.

use crate::db::{to_document_data, DocumentData, DocumentStore};
use crate::error::AppError;
use crate::models::{ProfileUpdate, UserProfile, Vehicle};
use crate::services::scope::OwnerScope;
use crate::time_utils::now_rfc3339;
use serde_json::Value;
use std::sync::Arc;
use validator::Validate;

/// A denormalized counter on the profile document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    Vehicles,
    MaintenanceTasks,
}

impl Counter {
    pub fn field(self) -> &'static str {
        match self {
            Counter::Vehicles => "vehicleCount",
            Counter::MaintenanceTasks => "maintenanceTaskCount",
        }
    }
}

/// Profile reads and writes for the owner of a scope.
#[derive(Clone)]
pub struct ProfileService {
    store: Arc<dyn DocumentStore>,
}

impl ProfileService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn get(&self, scope: &OwnerScope) -> Result<Option<UserProfile>, AppError> {
        let Some(mut doc) = self.store.get(&scope.profile_doc()).await? else {
            return Ok(None);
        };
        // Older profiles were written without the uid field
        doc.data
            .entry("uid")
            .or_insert_with(|| Value::String(scope.uid().to_string()));
        doc.into_model().map(Some)
    }

    /// Return the profile, creating it first if the owner has none.
    pub async fn ensure_profile(
        &self,
        scope: &OwnerScope,
        email: &str,
        display_name: Option<&str>,
    ) -> Result<UserProfile, AppError> {
        if let Some(existing) = self.get(scope).await? {
            return Ok(existing);
        }

        let profile = UserProfile::new(scope.uid(), email, display_name, &now_rfc3339());
        self.store
            .set(&scope.profile_doc(), to_document_data(&profile)?)
            .await?;
        tracing::info!(uid = %scope, "Provisioned user profile");
        Ok(profile)
    }

    /// Apply a partial profile edit. Fails with `NotFound` if there is no profile.
    pub async fn update(
        &self,
        scope: &OwnerScope,
        update: &ProfileUpdate,
    ) -> Result<UserProfile, AppError> {
        update.validate()?;
        let data = to_document_data(update)?;
        if !data.is_empty() {
            self.store.update(&scope.profile_doc(), data).await?;
        }

        self.get(scope)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Profile {}", scope.uid())))
    }

    /// Adjust a counter by `delta`, clamping at zero.
    ///
    /// Best-effort: the read-modify-write is not transactional and failures
    /// are logged rather than returned, so counters can drift. See [`recount`].
    ///
    /// [`recount`]: ProfileService::recount
    pub async fn increment_counter(&self, scope: &OwnerScope, counter: Counter, delta: i64) {
        if delta == 0 {
            return;
        }
        if let Err(e) = self.try_increment(scope, counter, delta).await {
            tracing::warn!(
                uid = %scope,
                counter = counter.field(),
                delta,
                error = %e,
                "Failed to update profile counter"
            );
        }
    }

    async fn try_increment(
        &self,
        scope: &OwnerScope,
        counter: Counter,
        delta: i64,
    ) -> Result<(), AppError> {
        let doc_path = scope.profile_doc();
        let Some(doc) = self.store.get(&doc_path).await? else {
            tracing::debug!(uid = %scope, "No profile document, skipping counter update");
            return Ok(());
        };

        let current = doc
            .data
            .get(counter.field())
            .and_then(Value::as_i64)
            .unwrap_or(0);
        let next = current.saturating_add(delta).max(0);

        let mut data = DocumentData::new();
        data.insert(counter.field().to_string(), Value::from(next));
        self.store.update(&doc_path, data).await
    }

    /// Re-derive both counters from the owner's live collections and persist them.
    pub async fn recount(
        &self,
        scope: &OwnerScope,
        vehicles: &[Vehicle],
    ) -> Result<UserProfile, AppError> {
        let mut task_count: u64 = 0;
        for vehicle in vehicles {
            let tasks = self
                .store
                .list(&scope.maintenance_tasks(&vehicle.id), None)
                .await?;
            task_count += tasks.len() as u64;
        }

        let mut data = DocumentData::new();
        data.insert(
            Counter::Vehicles.field().to_string(),
            Value::from(vehicles.len() as u64),
        );
        data.insert(
            Counter::MaintenanceTasks.field().to_string(),
            Value::from(task_count),
        );
        self.store.update(&scope.profile_doc(), data).await?;

        tracing::info!(
            uid = %scope,
            vehicles = vehicles.len(),
            maintenance_tasks = task_count,
            "Recounted profile counters"
        );

        self.get(scope)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Profile {}", scope.uid())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    fn service() -> (MemoryStore, ProfileService) {
        let store = MemoryStore::new();
        let service = ProfileService::new(Arc::new(store.clone()));
        (store, service)
    }

    #[tokio::test]
    async fn test_ensure_profile_is_idempotent() {
        let (_store, profiles) = service();
        let scope = OwnerScope::new("u1").unwrap();

        let created = profiles
            .ensure_profile(&scope, "ann@example.com", Some("Ann"))
            .await
            .unwrap();
        assert_eq!(created.display_name, "Ann");

        let again = profiles
            .ensure_profile(&scope, "other@example.com", None)
            .await
            .unwrap();
        assert_eq!(again.email, "ann@example.com");
        assert_eq!(again.created_at, created.created_at);
    }

    #[tokio::test]
    async fn test_counter_clamps_at_zero() {
        let (_store, profiles) = service();
        let scope = OwnerScope::new("u1").unwrap();
        profiles
            .ensure_profile(&scope, "ann@example.com", None)
            .await
            .unwrap();

        profiles
            .increment_counter(&scope, Counter::Vehicles, 2)
            .await;
        profiles
            .increment_counter(&scope, Counter::Vehicles, -5)
            .await;

        let profile = profiles.get(&scope).await.unwrap().unwrap();
        assert_eq!(profile.vehicle_count, 0);
    }

    #[tokio::test]
    async fn test_counter_failure_is_swallowed() {
        let (store, profiles) = service();
        let scope = OwnerScope::new("u1").unwrap();
        store.set_available(false);

        // Must not panic or propagate
        profiles
            .increment_counter(&scope, Counter::MaintenanceTasks, 1)
            .await;
    }

    #[tokio::test]
    async fn test_update_without_profile_is_not_found() {
        let (_store, profiles) = service();
        let scope = OwnerScope::new("u1").unwrap();
        let update = ProfileUpdate {
            display_name: Some("Ann".to_string()),
            ..Default::default()
        };

        let err = profiles.update(&scope, &update).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_keeps_unset_fields() {
        let (_store, profiles) = service();
        let scope = OwnerScope::new("u1").unwrap();
        profiles
            .ensure_profile(&scope, "ann@example.com", Some("Ann"))
            .await
            .unwrap();

        let updated = profiles
            .update(
                &scope,
                &ProfileUpdate {
                    phone_number: Some("555-0100".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.display_name, "Ann");
        assert_eq!(updated.phone_number.as_deref(), Some("555-0100"));
    }
}
