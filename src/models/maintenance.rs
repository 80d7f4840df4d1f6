// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Maintenance task model and its one-way completion transition.

use crate::error::AppError;
use crate::time_utils::deserialize_optional_date;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// Kind of maintenance work. Stored by display name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum MaintenanceCategory {
    #[serde(rename = "Oil Change")]
    OilChange,
    #[serde(rename = "Tire Rotation")]
    TireRotation,
    #[serde(rename = "Brake Service")]
    BrakeService,
    #[serde(rename = "Filter Replacement")]
    FilterReplacement,
    #[serde(rename = "Fluid Check")]
    FluidCheck,
    #[serde(rename = "Battery Service")]
    BatteryService,
    #[serde(rename = "Engine Service")]
    EngineService,
    #[serde(rename = "Transmission")]
    Transmission,
    #[serde(rename = "Inspection")]
    Inspection,
    #[serde(rename = "Other")]
    Other,
}

impl MaintenanceCategory {
    pub const ALL: [MaintenanceCategory; 10] = [
        MaintenanceCategory::OilChange,
        MaintenanceCategory::TireRotation,
        MaintenanceCategory::BrakeService,
        MaintenanceCategory::FilterReplacement,
        MaintenanceCategory::FluidCheck,
        MaintenanceCategory::BatteryService,
        MaintenanceCategory::EngineService,
        MaintenanceCategory::Transmission,
        MaintenanceCategory::Inspection,
        MaintenanceCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MaintenanceCategory::OilChange => "Oil Change",
            MaintenanceCategory::TireRotation => "Tire Rotation",
            MaintenanceCategory::BrakeService => "Brake Service",
            MaintenanceCategory::FilterReplacement => "Filter Replacement",
            MaintenanceCategory::FluidCheck => "Fluid Check",
            MaintenanceCategory::BatteryService => "Battery Service",
            MaintenanceCategory::EngineService => "Engine Service",
            MaintenanceCategory::Transmission => "Transmission",
            MaintenanceCategory::Inspection => "Inspection",
            MaintenanceCategory::Other => "Other",
        }
    }
}

impl fmt::Display for MaintenanceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// Maintenance task stored at
/// `users/{uid}/vehicles/{vehicle_id}/maintenanceTasks/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MaintenanceTask {
    /// Document ID
    #[serde(default)]
    pub id: String,
    pub vehicle_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: MaintenanceCategory,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub due_date: Option<NaiveDate>,
    #[cfg_attr(feature = "binding-generation", ts(type = "number | null"))]
    pub due_mileage: Option<u64>,
    pub difficulty: Option<Difficulty>,
    #[serde(default)]
    pub completed: bool,
    /// Completion timestamp (ISO 8601)
    pub completed_at: Option<String>,
    #[cfg_attr(feature = "binding-generation", ts(type = "number | null"))]
    pub completed_mileage: Option<u64>,
    pub cost: Option<f64>,
    pub notes: Option<String>,
    #[serde(default)]
    pub parts_used: Vec<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

/// Fields written by the completion transition.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRecord {
    pub completed: bool,
    pub completed_at: String,
    pub completed_mileage: u64,
    pub cost: Option<f64>,
    pub notes: Option<String>,
    pub parts_used: Vec<String>,
    pub updated_at: String,
}

/// Input for marking a task completed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CompletionInput {
    #[validate(range(min = 1))]
    pub completed_mileage: u64,
    #[validate(range(min = 0.0))]
    pub cost: Option<f64>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    #[serde(default)]
    pub parts_used: Vec<String>,
}

impl MaintenanceTask {
    /// Apply the completion transition.
    ///
    /// Incomplete → completed only; there is no way back. Returns the fields
    /// to persist.
    pub fn complete(
        &mut self,
        input: CompletionInput,
        now: &str,
    ) -> Result<CompletionRecord, AppError> {
        if self.completed {
            return Err(AppError::Validation(format!(
                "Maintenance task {} is already completed",
                self.id
            )));
        }
        if input.cost.is_some_and(|cost| !cost.is_finite()) {
            return Err(AppError::Validation("cost must be a finite number".into()));
        }
        input.validate()?;

        let parts_used: Vec<String> = input
            .parts_used
            .into_iter()
            .map(|part| part.trim().to_string())
            .filter(|part| !part.is_empty())
            .collect();

        let record = CompletionRecord {
            completed: true,
            completed_at: now.to_string(),
            completed_mileage: input.completed_mileage,
            cost: input.cost,
            notes: input.notes.filter(|n| !n.trim().is_empty()),
            parts_used,
            updated_at: now.to_string(),
        };

        self.completed = true;
        self.completed_at = Some(record.completed_at.clone());
        self.completed_mileage = Some(record.completed_mileage);
        self.cost = record.cost;
        // Unset notes are stripped from the write, so the stored note survives.
        if record.notes.is_some() {
            self.notes = record.notes.clone();
        }
        self.parts_used = record.parts_used.clone();
        self.updated_at = record.updated_at.clone();

        Ok(record)
    }
}

/// Payload for creating a maintenance task.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewMaintenanceTask {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub description: String,
    pub category: MaintenanceCategory,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub due_date: Option<NaiveDate>,
    #[validate(range(min = 1))]
    pub due_mileage: Option<u64>,
    pub difficulty: Option<Difficulty>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

impl NewMaintenanceTask {
    /// Validate and build the stored record for `vehicle_id`.
    pub fn into_task(self, vehicle_id: &str, now: &str) -> Result<MaintenanceTask, AppError> {
        self.validate()?;
        if self.due_date.is_none() && self.due_mileage.is_none() {
            return Err(AppError::Validation(
                "A maintenance task needs a due date or a due mileage".to_string(),
            ));
        }

        Ok(MaintenanceTask {
            id: String::new(),
            vehicle_id: vehicle_id.to_string(),
            title: self.title.trim().to_string(),
            description: self.description,
            category: self.category,
            due_date: self.due_date,
            due_mileage: self.due_mileage,
            difficulty: self.difficulty,
            completed: false,
            completed_at: None,
            completed_mileage: None,
            cost: None,
            notes: self.notes,
            parts_used: Vec::new(),
            created_at: now.to_string(),
            updated_at: now.to_string(),
        })
    }
}

/// Partial edit of a maintenance task. Completion fields are not editable
/// here; use the completion transition.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceTaskUpdate {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub category: Option<MaintenanceCategory>,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub due_date: Option<NaiveDate>,
    #[validate(range(min = 1))]
    pub due_mileage: Option<u64>,
    pub difficulty: Option<Difficulty>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    /// Set by the service, not by callers
    #[serde(skip_deserializing)]
    pub updated_at: Option<String>,
}
