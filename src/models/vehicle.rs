// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Vehicle model for storage and API.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// Vehicle stored at `users/{uid}/vehicles/{id}`.
///
/// Legacy documents live in the root `vehicles` collection and carry the
/// owner in `user_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Vehicle {
    /// Document ID
    #[serde(default)]
    pub id: String,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub vin: Option<String>,
    pub license_plate: Option<String>,
    /// Odometer reading; never decreases through the service API
    #[serde(default)]
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub mileage: u64,
    #[serde(default)]
    pub fuel_type: String,
    #[serde(default)]
    pub engine_type: String,
    pub image_url: Option<String>,
    /// Owner uid, only present on legacy flat-collection documents
    pub user_id: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

/// Payload for creating a vehicle.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewVehicle {
    #[validate(length(min = 1, max = 100))]
    pub make: String,
    #[validate(length(min = 1, max = 100))]
    pub model: String,
    #[validate(range(min = 1886, max = 2100))]
    pub year: i32,
    #[validate(length(max = 17))]
    pub vin: Option<String>,
    #[validate(length(max = 20))]
    pub license_plate: Option<String>,
    #[serde(default)]
    pub mileage: u64,
    #[validate(length(min = 1, max = 50))]
    pub fuel_type: String,
    #[validate(length(min = 1, max = 50))]
    pub engine_type: String,
    #[validate(length(max = 2048))]
    pub image_url: Option<String>,
}

impl NewVehicle {
    /// Build the stored record; the id is assigned by the store.
    pub fn into_vehicle(self, now: &str) -> Vehicle {
        Vehicle {
            id: String::new(),
            make: self.make.trim().to_string(),
            model: self.model.trim().to_string(),
            year: self.year,
            vin: self.vin.map(|v| v.trim().to_uppercase()),
            license_plate: self.license_plate.map(|p| p.trim().to_string()),
            mileage: self.mileage,
            fuel_type: self.fuel_type,
            engine_type: self.engine_type,
            image_url: self.image_url,
            user_id: None,
            created_at: now.to_string(),
            updated_at: now.to_string(),
        }
    }
}

/// Partial vehicle edit. Unset fields are stripped before the write, so they
/// keep their stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VehicleUpdate {
    #[validate(length(min = 1, max = 100))]
    pub make: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub model: Option<String>,
    #[validate(range(min = 1886, max = 2100))]
    pub year: Option<i32>,
    #[validate(length(max = 17))]
    pub vin: Option<String>,
    #[validate(length(max = 20))]
    pub license_plate: Option<String>,
    pub mileage: Option<u64>,
    #[validate(length(min = 1, max = 50))]
    pub fuel_type: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub engine_type: Option<String>,
    #[validate(length(max = 2048))]
    pub image_url: Option<String>,
    /// Set by the service, not by callers
    #[serde(skip_deserializing)]
    pub updated_at: Option<String>,
}

impl VehicleUpdate {
    /// Mileage-only update.
    pub fn mileage(mileage: u64) -> Self {
        Self {
            mileage: Some(mileage),
            ..Default::default()
        }
    }
}
