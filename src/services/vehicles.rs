// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Vehicle data access.
//!
//! Vehicles normally live under `users/{uid}/vehicles`. Accounts created by
//! older clients may still keep them in the root `vehicles` collection with a
//! `userId` field, so reads fall back to that layout when the nested
//! collection is empty and writes go wherever the document was found.

use crate::db::{self, to_document_data, DocumentPath, DocumentStore, FieldFilter};
use crate::error::AppError;
use crate::models::{NewVehicle, Vehicle, VehicleUpdate};
use crate::services::maintenance::delete_collection;
use crate::services::profile::{Counter, ProfileService};
use crate::services::scope::OwnerScope;
use crate::services::subscription::Subscription;
use crate::time_utils::now_rfc3339;
use futures_util::StreamExt;
use std::sync::Arc;
use validator::Validate;

/// Where an owner's vehicles were read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleSource {
    /// `users/{uid}/vehicles`
    Nested,
    /// Root `vehicles` collection filtered by `userId`
    LegacyFlat,
}

struct LocatedVehicle {
    path: DocumentPath,
    source: VehicleSource,
    vehicle: Vehicle,
}

/// Reject a mileage reading that is zero or lower than the stored one.
///
/// An unchanged reading is accepted. The stored value may be stale, so this
/// is a best-effort guard rather than a transactional one.
pub fn check_mileage(current: u64, requested: u64) -> Result<(), AppError> {
    check_mileage_positive(requested)?;
    if requested < current {
        return Err(AppError::Validation(format!(
            "Mileage cannot decrease (current {}, requested {})",
            current, requested
        )));
    }
    Ok(())
}

fn check_mileage_positive(requested: u64) -> Result<(), AppError> {
    if requested == 0 {
        return Err(AppError::Validation(
            "Mileage must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

#[derive(Clone)]
pub struct VehicleService {
    store: Arc<dyn DocumentStore>,
    profiles: ProfileService,
}

impl VehicleService {
    pub fn new(store: Arc<dyn DocumentStore>, profiles: ProfileService) -> Self {
        Self { store, profiles }
    }

    pub async fn create(&self, scope: &OwnerScope, new: NewVehicle) -> Result<Vehicle, AppError> {
        new.validate()?;
        let mut vehicle = new.into_vehicle(&now_rfc3339());

        vehicle.id = self
            .store
            .create(&scope.vehicles(), to_document_data(&vehicle)?)
            .await?;

        tracing::info!(
            uid = %scope,
            vehicle_id = %vehicle.id,
            make = %vehicle.make,
            model = %vehicle.model,
            "Vehicle created"
        );

        self.profiles
            .increment_counter(scope, Counter::Vehicles, 1)
            .await;
        Ok(vehicle)
    }

    pub async fn get(&self, scope: &OwnerScope, id: &str) -> Result<Option<Vehicle>, AppError> {
        Ok(self.locate(scope, id).await?.map(|found| found.vehicle))
    }

    pub async fn list(&self, scope: &OwnerScope) -> Result<Vec<Vehicle>, AppError> {
        Ok(self.list_with_source(scope).await?.1)
    }

    /// List vehicles and report which layout they came from.
    pub async fn list_with_source(
        &self,
        scope: &OwnerScope,
    ) -> Result<(VehicleSource, Vec<Vehicle>), AppError> {
        let nested = self.store.list(&scope.vehicles(), None).await?;
        let (source, docs) = if nested.is_empty() {
            let filter = FieldFilter::eq("userId", scope.uid());
            let legacy = self
                .store
                .list(&db::legacy_vehicles_col(), Some(&filter))
                .await?;
            if !legacy.is_empty() {
                tracing::debug!(
                    uid = %scope,
                    count = legacy.len(),
                    "Read vehicles from legacy collection"
                );
            }
            (VehicleSource::LegacyFlat, legacy)
        } else {
            (VehicleSource::Nested, nested)
        };

        let mut vehicles = docs
            .into_iter()
            .map(|doc| doc.into_model::<Vehicle>())
            .collect::<Result<Vec<_>, _>>()?;
        vehicles.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });

        Ok((source, vehicles))
    }

    /// Apply a partial edit. A mileage change goes through the same guard as
    /// [`update_mileage`](VehicleService::update_mileage).
    pub async fn update(
        &self,
        scope: &OwnerScope,
        id: &str,
        mut update: VehicleUpdate,
    ) -> Result<Vehicle, AppError> {
        update.validate()?;
        if let Some(mileage) = update.mileage {
            check_mileage_positive(mileage)?;
        }

        let found = self
            .locate(scope, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Vehicle {}", id)))?;

        if let Some(mileage) = update.mileage {
            check_mileage(found.vehicle.mileage, mileage)?;
        }

        update.updated_at = Some(now_rfc3339());
        self.store
            .update(&found.path, to_document_data(&update)?)
            .await?;

        tracing::info!(
            uid = %scope,
            vehicle_id = %id,
            source = ?found.source,
            "Vehicle updated"
        );

        self.store
            .get(&found.path)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Vehicle {}", id)))?
            .into_model()
    }

    /// Record a new odometer reading.
    pub async fn update_mileage(
        &self,
        scope: &OwnerScope,
        id: &str,
        mileage: u64,
    ) -> Result<Vehicle, AppError> {
        self.update(scope, id, VehicleUpdate::mileage(mileage)).await
    }

    /// Delete a vehicle and its maintenance tasks.
    ///
    /// Tasks are removed first. If any task delete fails the vehicle is kept
    /// and the error returned; tasks already removed stay removed, so the
    /// call can simply be retried.
    pub async fn delete(&self, scope: &OwnerScope, id: &str) -> Result<(), AppError> {
        let found = self
            .locate(scope, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Vehicle {}", id)))?;

        let removed_tasks =
            delete_collection(self.store.as_ref(), &scope.maintenance_tasks(id)).await?;
        self.store.delete(&found.path).await?;

        tracing::info!(
            uid = %scope,
            vehicle_id = %id,
            removed_tasks,
            "Vehicle deleted"
        );

        self.profiles
            .increment_counter(scope, Counter::Vehicles, -1)
            .await;
        self.profiles
            .increment_counter(scope, Counter::MaintenanceTasks, -(removed_tasks as i64))
            .await;
        Ok(())
    }

    /// Live vehicle list.
    ///
    /// The nested collection is always watched. Owners whose vehicles are
    /// read from the legacy collection also get a watch on it, restricted to
    /// their own `userId`.
    pub async fn subscribe(&self, scope: &OwnerScope) -> Result<Subscription<Vehicle>, AppError> {
        let (source, _) = self.list_with_source(scope).await?;
        let nested = self.store.watch(&scope.vehicles(), None).await?;
        let feed = match source {
            VehicleSource::Nested => nested,
            VehicleSource::LegacyFlat => {
                let filter = FieldFilter::eq("userId", scope.uid());
                let legacy = self
                    .store
                    .watch(&db::legacy_vehicles_col(), Some(&filter))
                    .await?;
                futures_util::stream::select(nested, legacy).boxed()
            }
        };

        let service = self.clone();
        let owner = scope.clone();
        Ok(Subscription::spawn(
            format!("vehicles:{}", scope),
            feed,
            move || {
                let service = service.clone();
                let owner = owner.clone();
                async move { service.list(&owner).await }
            },
        ))
    }

    /// Find a vehicle's document: nested layout first, then the owner-checked
    /// legacy collection.
    async fn locate(
        &self,
        scope: &OwnerScope,
        id: &str,
    ) -> Result<Option<LocatedVehicle>, AppError> {
        if id.trim().is_empty() {
            return Err(AppError::Validation("Vehicle id is required".to_string()));
        }

        let nested = scope.vehicles().doc(id);
        if let Some(doc) = self.store.get(&nested).await? {
            return Ok(Some(LocatedVehicle {
                path: nested,
                source: VehicleSource::Nested,
                vehicle: doc.into_model()?,
            }));
        }

        let legacy = db::legacy_vehicles_col().doc(id);
        let Some(doc) = self.store.get(&legacy).await? else {
            return Ok(None);
        };
        let vehicle: Vehicle = doc.into_model()?;
        if vehicle.user_id.as_deref() != Some(scope.uid()) {
            tracing::debug!(
                uid = %scope,
                vehicle_id = %id,
                "Legacy vehicle belongs to another owner"
            );
            return Ok(None);
        }

        Ok(Some(LocatedVehicle {
            path: legacy,
            source: VehicleSource::LegacyFlat,
            vehicle,
        }))
    }
}
