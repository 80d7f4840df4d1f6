// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Request, Response};
use maintenance_tracker::config::Config;
use maintenance_tracker::db::{DocumentStore, FirestoreDb, MemoryStore};
use maintenance_tracker::middleware::auth::create_jwt;
use maintenance_tracker::models::{NewMaintenanceTask, NewVehicle};
use maintenance_tracker::routes::create_router;
use maintenance_tracker::services::{IdentityProvider, MemoryIdentityProvider};
use maintenance_tracker::AppState;
use std::sync::Arc;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Generate a unique uid for test isolation.
#[allow(dead_code)]
pub fn unique_uid() -> String {
    format!("test-{}", uuid::Uuid::new_v4().simple())
}

/// Everything a test needs to drive the app and peek behind it.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub store: MemoryStore,
    pub identity: Arc<MemoryIdentityProvider>,
}

/// Create a test app backed by the in-memory store and identity provider.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    let config = Config::test_default();
    let store = MemoryStore::new();
    let identity = Arc::new(MemoryIdentityProvider::new());

    let shared_store: Arc<dyn DocumentStore> = Arc::new(store.clone());
    let shared_identity: Arc<dyn IdentityProvider> = identity.clone();
    let state = Arc::new(AppState::new(config, shared_store, shared_identity));

    TestApp {
        router: create_router(state.clone()),
        state,
        store,
        identity,
    }
}

/// Create a session JWT signed with the test key.
#[allow(dead_code)]
pub fn create_test_jwt(uid: &str) -> String {
    let config = Config::test_default();
    create_jwt(uid, "driver@example.com", &config.jwt_signing_key, 1).unwrap()
}

/// Build a request with a bearer token and optional JSON body.
#[allow(dead_code)]
pub fn authed_request(
    method: &str,
    uri: &str,
    token: &str,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token));

    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Collect a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[allow(dead_code)]
pub fn test_vehicle(mileage: u64) -> NewVehicle {
    NewVehicle {
        make: "Honda".to_string(),
        model: "Civic".to_string(),
        year: 2018,
        vin: None,
        license_plate: Some("7ABC123".to_string()),
        mileage,
        fuel_type: "Gasoline".to_string(),
        engine_type: "I4".to_string(),
        image_url: None,
    }
}

#[allow(dead_code)]
pub fn test_task(title: &str, due_date: Option<&str>, due_mileage: Option<u64>) -> NewMaintenanceTask {
    NewMaintenanceTask {
        title: title.to_string(),
        description: String::new(),
        category: maintenance_tracker::models::MaintenanceCategory::OilChange,
        due_date: due_date.map(|d| d.parse().unwrap()),
        due_mileage,
        difficulty: None,
        notes: None,
    }
}
