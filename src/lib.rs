// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Maintenance Tracker: vehicles, their maintenance schedule and status.
//!
//! This crate provides the backend for a vehicle maintenance app: per-user
//! vehicle and task records in a hierarchical document store, the
//! scheduled/overdue/completed status engine, live collection subscriptions
//! and sign-in through an external identity provider.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::DocumentStore;
use services::{IdentityProvider, Services};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub identity: Arc<dyn IdentityProvider>,
    pub services: Services,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn DocumentStore>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            config,
            identity,
            services: Services::new(store),
        }
    }
}
