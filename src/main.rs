// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Maintenance Tracker API Server
//!
//! Serves per-user vehicles, maintenance tasks and their derived status on
//! top of Firestore and Firebase Authentication (or in-memory stand-ins).

use maintenance_tracker::{
    config::{Backend, Config},
    db::{DocumentStore, FirestoreDb, MemoryStore},
    services::{FirebaseAuthClient, IdentityProvider, MemoryIdentityProvider},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        backend = ?config.backend,
        "Starting Maintenance Tracker API"
    );

    let (store, identity) = match config.backend {
        Backend::Firestore => {
            let db: Arc<dyn DocumentStore> =
                Arc::new(FirestoreDb::new(&config.gcp_project_id).await?);
            let api_key = config.firebase_api_key.clone();
            let auth: Arc<dyn IdentityProvider> = match &config.auth_emulator_host {
                Some(host) => Arc::new(FirebaseAuthClient::emulator(host, api_key)),
                None => Arc::new(FirebaseAuthClient::new(api_key)),
            };
            (db, auth)
        }
        Backend::Memory => {
            tracing::warn!("Using in-memory store and identity provider; data is not persisted");
            let db: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
            let auth: Arc<dyn IdentityProvider> = Arc::new(MemoryIdentityProvider::new());
            (db, auth)
        }
    };

    // Build shared state
    let state = Arc::new(AppState::new(config.clone(), store, identity));

    // Build router
    let app = maintenance_tracker::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("maintenance_tracker=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
