// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Maintenance status classification.
//!
//! Pure functions: a task's status is derived from the task, the owning
//! vehicle's current mileage and the evaluation instant. Nothing here writes
//! to the store, so a classification only changes when time passes a due
//! date, the vehicle's mileage changes, or the task is completed.

use crate::models::{MaintenanceTask, Vehicle};
use crate::time_utils::start_of_day_utc;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Display status of a maintenance task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum MaintenanceStatus {
    Scheduled,
    Overdue,
    Completed,
}

impl MaintenanceStatus {
    /// Whether the list view should draw attention to the task.
    pub fn is_highlighted(self) -> bool {
        self == MaintenanceStatus::Overdue
    }

    /// Group order in task lists: overdue first, completed last.
    pub fn display_rank(self) -> u8 {
        match self {
            MaintenanceStatus::Overdue => 0,
            MaintenanceStatus::Scheduled => 1,
            MaintenanceStatus::Completed => 2,
        }
    }
}

impl fmt::Display for MaintenanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MaintenanceStatus::Scheduled => "scheduled",
            MaintenanceStatus::Overdue => "overdue",
            MaintenanceStatus::Completed => "completed",
        };
        f.write_str(name)
    }
}

/// Classify a task against its vehicle at `now`.
pub fn classify(task: &MaintenanceTask, vehicle: &Vehicle, now: DateTime<Utc>) -> MaintenanceStatus {
    classify_at_mileage(task, vehicle.mileage, now)
}

/// Classify a task given the vehicle's current odometer reading.
///
/// Completion is checked first: a completed task never becomes overdue again.
/// Otherwise either threshold alone makes the task overdue. A due date counts
/// from the start of that day (UTC).
pub fn classify_at_mileage(
    task: &MaintenanceTask,
    current_mileage: u64,
    now: DateTime<Utc>,
) -> MaintenanceStatus {
    if task.completed {
        return MaintenanceStatus::Completed;
    }

    let past_due_date = task
        .due_date
        .is_some_and(|date| start_of_day_utc(date) < now);
    let past_due_mileage = task
        .due_mileage
        .is_some_and(|due| current_mileage >= due);

    if past_due_date || past_due_mileage {
        MaintenanceStatus::Overdue
    } else {
        MaintenanceStatus::Scheduled
    }
}

/// A task together with its derived status.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedTask {
    #[serde(flatten)]
    pub task: MaintenanceTask,
    pub status: MaintenanceStatus,
    pub highlighted: bool,
}

impl ClassifiedTask {
    pub fn new(task: MaintenanceTask, status: MaintenanceStatus) -> Self {
        Self {
            highlighted: status.is_highlighted(),
            task,
            status,
        }
    }
}

/// Which tasks a list view shows.
///
/// By default completed tasks are hidden; `show_completed` brings them back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct TaskListFilter {
    #[serde(default)]
    pub show_completed: bool,
    /// Narrow to a single status
    #[serde(default)]
    pub status: Option<MaintenanceStatus>,
}

impl TaskListFilter {
    pub fn show_completed() -> Self {
        Self {
            show_completed: true,
            status: None,
        }
    }

    /// Filter on the stored completed flag only.
    pub fn includes_completed_flag(&self, completed: bool) -> bool {
        !completed || self.show_completed || self.status == Some(MaintenanceStatus::Completed)
    }

    /// Filter on a derived status.
    pub fn includes(&self, status: MaintenanceStatus) -> bool {
        if let Some(wanted) = self.status {
            return status == wanted;
        }
        status != MaintenanceStatus::Completed || self.show_completed
    }

    pub fn apply(&self, tasks: Vec<ClassifiedTask>) -> Vec<ClassifiedTask> {
        tasks
            .into_iter()
            .filter(|t| self.includes(t.status))
            .collect()
    }
}

fn cmp_none_last<T: Ord>(a: &Option<T>, b: &Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Display order: status group, then the most urgent threshold.
///
/// Open tasks sort by earliest due date, then lowest due mileage, then title.
/// Completed tasks sort most recent first. The sort is stable.
pub fn display_order(a: &ClassifiedTask, b: &ClassifiedTask) -> Ordering {
    a.status
        .display_rank()
        .cmp(&b.status.display_rank())
        .then_with(|| {
            if a.status == MaintenanceStatus::Completed {
                b.task.completed_at.cmp(&a.task.completed_at)
            } else {
                cmp_none_last(&a.task.due_date, &b.task.due_date)
                    .then_with(|| cmp_none_last(&a.task.due_mileage, &b.task.due_mileage))
            }
        })
        .then_with(|| a.task.title.cmp(&b.task.title))
}

pub fn sort_for_display(mut tasks: Vec<ClassifiedTask>) -> Vec<ClassifiedTask> {
    tasks.sort_by(display_order);
    tasks
}

/// Classify, filter and order a vehicle's tasks for a list view.
pub fn classify_all(
    tasks: Vec<MaintenanceTask>,
    vehicle: &Vehicle,
    now: DateTime<Utc>,
    filter: &TaskListFilter,
) -> Vec<ClassifiedTask> {
    let classified = tasks
        .into_iter()
        .map(|task| {
            let status = classify(&task, vehicle, now);
            ClassifiedTask::new(task, status)
        })
        .collect();
    sort_for_display(filter.apply(classified))
}

/// Per-status counts for a vehicle overview.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct StatusSummary {
    pub scheduled: u32,
    pub overdue: u32,
    pub completed: u32,
}

impl StatusSummary {
    pub fn from_statuses(statuses: impl IntoIterator<Item = MaintenanceStatus>) -> Self {
        let mut summary = Self::default();
        for status in statuses {
            match status {
                MaintenanceStatus::Scheduled => summary.scheduled += 1,
                MaintenanceStatus::Overdue => summary.overdue += 1,
                MaintenanceStatus::Completed => summary.completed += 1,
            }
        }
        summary
    }

    pub fn open(&self) -> u32 {
        self.scheduled + self.overdue
    }
}
