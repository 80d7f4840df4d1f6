//! Generic to-do task model (`users/{uid}/tasks/{id}`).

use crate::error::AppError;
use crate::time_utils::deserialize_optional_date;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// A simple reminder, optionally tied to a vehicle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Task {
    #[serde(default)]
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub due_date: Option<NaiveDate>,
    pub vehicle_id: Option<String>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub due_date: Option<NaiveDate>,
    pub vehicle_id: Option<String>,
}

impl NewTask {
    pub fn into_task(self, now: &str) -> Result<Task, AppError> {
        self.validate()?;
        Ok(Task {
            id: String::new(),
            title: self.title.trim().to_string(),
            description: self.description,
            due_date: self.due_date,
            vehicle_id: self.vehicle_id.filter(|id| !id.is_empty()),
            completed: false,
            created_at: now.to_string(),
            updated_at: now.to_string(),
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdate {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub due_date: Option<NaiveDate>,
    pub vehicle_id: Option<String>,
    pub completed: Option<bool>,
    #[serde(skip_deserializing)]
    pub updated_at: Option<String>,
}
