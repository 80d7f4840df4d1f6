// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Vehicle API tests: CRUD, the mileage guard, cascading delete and the
//! legacy collection fallback.

use axum::http::StatusCode;
use maintenance_tracker::db::{self, to_document_data, DocumentStore};
use serde_json::{json, Value};
use tower::ServiceExt;

mod common;
use common::{authed_request, body_json, create_test_app, create_test_jwt, unique_uid, TestApp};

fn vehicle_body(mileage: u64) -> Value {
    json!({
        "make": "Mazda",
        "model": "3",
        "year": 2019,
        "mileage": mileage,
        "fuelType": "Gasoline",
        "engineType": "I4"
    })
}

async fn create_vehicle(app: &TestApp, token: &str, mileage: u64) -> Value {
    let response = app
        .router
        .clone()
        .oneshot(authed_request(
            "POST",
            "/api/vehicles",
            token,
            Some(vehicle_body(mileage)),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await
}

async fn put_mileage(app: &TestApp, token: &str, id: &str, mileage: u64) -> StatusCode {
    app.router
        .clone()
        .oneshot(authed_request(
            "PUT",
            &format!("/api/vehicles/{}/mileage", id),
            token,
            Some(json!({ "mileage": mileage })),
        ))
        .await
        .unwrap()
        .status()
}

#[tokio::test]
async fn test_create_and_get_vehicle() {
    let app = create_test_app();
    let token = create_test_jwt(&unique_uid());

    let created = create_vehicle(&app, &token, 12_000).await;
    let id = created["id"].as_str().unwrap();
    assert!(!id.is_empty());
    assert_eq!(created["mileage"], 12_000);
    assert!(created.get("vin").is_none() || created["vin"].is_null());

    let response = app
        .router
        .clone()
        .oneshot(authed_request(
            "GET",
            &format!("/api/vehicles/{}", id),
            &token,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let fetched = body_json(response).await;
    assert_eq!(fetched["make"], "Mazda");
    assert_eq!(fetched["id"], id);

    let response = app
        .router
        .oneshot(authed_request("GET", "/api/vehicles", &token, None))
        .await
        .unwrap();
    let list = body_json(response).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_missing_vehicle_is_404() {
    let app = create_test_app();
    let token = create_test_jwt(&unique_uid());

    let response = app
        .router
        .oneshot(authed_request("GET", "/api/vehicles/nope", &token, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_vehicles_are_owner_scoped() {
    let app = create_test_app();
    let alice = create_test_jwt(&unique_uid());
    let bob = create_test_jwt(&unique_uid());

    let created = create_vehicle(&app, &alice, 1_000).await;
    let id = created["id"].as_str().unwrap();

    let response = app
        .router
        .clone()
        .oneshot(authed_request(
            "GET",
            &format!("/api/vehicles/{}", id),
            &bob,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .router
        .oneshot(authed_request("GET", "/api/vehicles", &bob, None))
        .await
        .unwrap();
    assert_eq!(body_json(response).await, json!([]));
}

#[tokio::test]
async fn test_create_vehicle_validation() {
    let app = create_test_app();
    let token = create_test_jwt(&unique_uid());

    let mut body = vehicle_body(1_000);
    body["make"] = json!("");

    let response = app
        .router
        .oneshot(authed_request("POST", "/api/vehicles", &token, Some(body)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "bad_request");
}

#[tokio::test]
async fn test_mileage_guard_over_api() {
    let app = create_test_app();
    let token = create_test_jwt(&unique_uid());
    let created = create_vehicle(&app, &token, 50_000).await;
    let id = created["id"].as_str().unwrap();

    assert_eq!(
        put_mileage(&app, &token, id, 49_000).await,
        StatusCode::BAD_REQUEST
    );
    assert_eq!(put_mileage(&app, &token, id, 0).await, StatusCode::BAD_REQUEST);
    assert_eq!(put_mileage(&app, &token, id, 50_000).await, StatusCode::OK);
    assert_eq!(put_mileage(&app, &token, id, 55_000).await, StatusCode::OK);

    let response = app
        .router
        .oneshot(authed_request(
            "GET",
            &format!("/api/vehicles/{}", id),
            &token,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["mileage"], 55_000);
}

#[tokio::test]
async fn test_patch_cannot_roll_back_mileage() {
    let app = create_test_app();
    let token = create_test_jwt(&unique_uid());
    let created = create_vehicle(&app, &token, 30_000).await;
    let id = created["id"].as_str().unwrap();

    let response = app
        .router
        .clone()
        .oneshot(authed_request(
            "PATCH",
            &format!("/api/vehicles/{}", id),
            &token,
            Some(json!({ "mileage": 29_999, "licensePlate": "NEW1" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .router
        .oneshot(authed_request(
            "PATCH",
            &format!("/api/vehicles/{}", id),
            &token,
            Some(json!({ "licensePlate": "NEW1" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let updated = body_json(response).await;
    assert_eq!(updated["licensePlate"], "NEW1");
    assert_eq!(updated["mileage"], 30_000);
    assert_eq!(updated["make"], "Mazda");
}

#[tokio::test]
async fn test_delete_vehicle_cascades_to_tasks() {
    let app = create_test_app();
    let uid = unique_uid();
    let token = create_test_jwt(&uid);
    let created = create_vehicle(&app, &token, 10_000).await;
    let id = created["id"].as_str().unwrap().to_string();

    for title in ["Oil", "Brakes", "Tires"] {
        let response = app
            .router
            .clone()
            .oneshot(authed_request(
                "POST",
                &format!("/api/vehicles/{}/maintenance", id),
                &token,
                Some(json!({
                    "title": title,
                    "category": "Other",
                    "dueMileage": 20_000
                })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }
    assert_eq!(app.store.count(&db::maintenance_col(&uid, &id)), 3);

    let response = app
        .router
        .clone()
        .oneshot(authed_request(
            "DELETE",
            &format!("/api/vehicles/{}", id),
            &token,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    assert_eq!(app.store.count(&db::maintenance_col(&uid, &id)), 0);
    assert_eq!(app.store.count(&db::vehicles_col(&uid)), 0);

    // Deleting again is a 404, not a silent success
    let response = app
        .router
        .oneshot(authed_request(
            "DELETE",
            &format!("/api/vehicles/{}", id),
            &token,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_counters_follow_creates_and_deletes() {
    let app = create_test_app();
    let uid = unique_uid();
    let token = create_test_jwt(&uid);

    let scope = maintenance_tracker::services::OwnerScope::new(uid.clone()).unwrap();
    app.state
        .services
        .profiles
        .ensure_profile(&scope, "driver@example.com", None)
        .await
        .unwrap();

    let first = create_vehicle(&app, &token, 1_000).await;
    create_vehicle(&app, &token, 2_000).await;

    let response = app
        .router
        .clone()
        .oneshot(authed_request("GET", "/api/me", &token, None))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["vehicleCount"], 2);

    let response = app
        .router
        .clone()
        .oneshot(authed_request(
            "DELETE",
            &format!("/api/vehicles/{}", first["id"].as_str().unwrap()),
            &token,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .router
        .oneshot(authed_request("POST", "/api/me/recount", &token, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["vehicleCount"], 1);
}

#[tokio::test]
async fn test_legacy_collection_fallback() {
    let app = create_test_app();
    let uid = unique_uid();
    let token = create_test_jwt(&uid);

    let legacy = |owner: &str, make: &str| {
        to_document_data(&json!({
            "make": make,
            "model": "Model T",
            "year": 1925,
            "mileage": 80_000,
            "fuelType": "Gasoline",
            "engineType": "I4",
            "userId": owner,
            "createdAt": "2020-01-01T00:00:00Z",
            "updatedAt": "2020-01-01T00:00:00Z"
        }))
        .unwrap()
    };
    let mine = app
        .store
        .create(&db::legacy_vehicles_col(), legacy(&uid, "Ford"))
        .await
        .unwrap();
    let theirs = app
        .store
        .create(&db::legacy_vehicles_col(), legacy("someone-else", "Buick"))
        .await
        .unwrap();

    // Nested collection is empty, so the list comes from the legacy layout
    let response = app
        .router
        .clone()
        .oneshot(authed_request("GET", "/api/vehicles", &token, None))
        .await
        .unwrap();
    let list = body_json(response).await;
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["id"], mine.as_str());
    assert_eq!(list[0]["make"], "Ford");

    // Another owner's legacy document is invisible
    let response = app
        .router
        .clone()
        .oneshot(authed_request(
            "GET",
            &format!("/api/vehicles/{}", theirs),
            &token,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Writes land on the legacy document
    assert_eq!(put_mileage(&app, &token, &mine, 81_000).await, StatusCode::OK);
    let stored = app
        .store
        .get(&db::legacy_vehicles_col().doc(mine.clone()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.data["mileage"], 81_000);

    // Once a nested vehicle exists, the nested layout wins
    create_vehicle(&app, &token, 5_000).await;
    let response = app
        .router
        .oneshot(authed_request("GET", "/api/vehicles", &token, None))
        .await
        .unwrap();
    let list = body_json(response).await;
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["make"], "Mazda");
}

#[tokio::test]
async fn test_store_outage_surfaces_as_500() {
    let app = create_test_app();
    let token = create_test_jwt(&unique_uid());
    app.store.set_available(false);

    let response = app
        .router
        .oneshot(authed_request("GET", "/api/vehicles", &token, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["error"], "database_error");
}
