// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod maintenance;
pub mod task;
pub mod user;
pub mod vehicle;

pub use maintenance::{
    CompletionInput, Difficulty, MaintenanceCategory, MaintenanceTask, MaintenanceTaskUpdate,
    NewMaintenanceTask,
};
pub use task::{NewTask, Task, TaskUpdate};
pub use user::{ProfileUpdate, UserProfile};
pub use vehicle::{NewVehicle, Vehicle, VehicleUpdate};
