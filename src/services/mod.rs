// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod identity;
pub mod maintenance;
pub mod profile;
pub mod scope;
pub mod session;
pub mod status;
pub mod subscription;
pub mod tasks;
pub mod vehicles;

pub use identity::{
    AuthSession, FirebaseAuthClient, Identity, IdentityProvider, IdentityUpdate,
    MemoryIdentityProvider,
};
pub use maintenance::MaintenanceService;
pub use profile::{Counter, ProfileService};
pub use scope::OwnerScope;
pub use session::{SessionManager, SessionState};
pub use status::{ClassifiedTask, MaintenanceStatus, StatusSummary, TaskListFilter};
pub use subscription::{Subscription, SubscriptionHandle, SubscriptionStream};
pub use tasks::TaskService;
pub use vehicles::{VehicleService, VehicleSource};

use crate::db::DocumentStore;
use std::sync::Arc;

/// The data services, all sharing one store.
#[derive(Clone)]
pub struct Services {
    pub profiles: ProfileService,
    pub vehicles: VehicleService,
    pub maintenance: MaintenanceService,
    pub tasks: TaskService,
}

impl Services {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        let profiles = ProfileService::new(store.clone());
        let vehicles = VehicleService::new(store.clone(), profiles.clone());
        let maintenance = MaintenanceService::new(store.clone(), vehicles.clone(), profiles.clone());
        let tasks = TaskService::new(store);
        Self {
            profiles,
            vehicles,
            maintenance,
            tasks,
        }
    }
}
