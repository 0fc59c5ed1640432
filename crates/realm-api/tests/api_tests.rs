//! Integration tests for the province API endpoints.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server, backed by the in-memory store.

#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{TimeDelta, Utc};
use realm_api::{AppState, build_router};
use realm_core::{EngineConfig, MemoryProvinceStore, ProvinceStore};
use realm_types::{ProvinceId, ProvinceSnapshot};
use serde_json::{Value, json};
use tower::ServiceExt;

fn make_app() -> (Router, Arc<MemoryProvinceStore>) {
    let config = EngineConfig::default();
    let store = Arc::new(MemoryProvinceStore::new());
    let state = AppState::new(
        Arc::clone(&store),
        Arc::new(config.economy.clone()),
        &config,
    )
    .unwrap();
    (build_router(Arc::new(state)), store)
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn create_province(app: &Router) -> ProvinceSnapshot {
    let body = json!({
        "owner_id": uuid::Uuid::now_v7(),
        "name": "Greywater",
        "traits": { "faction": "Human", "class": "Explorer", "alignment": "Good" },
    });
    let response = app
        .clone()
        .oneshot(post_json("/api/provinces", &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    serde_json::from_value(body_to_json(response.into_body()).await).unwrap()
}

fn construct(building: &str, quantity: u64) -> Value {
    json!({
        "action_type": "construct",
        "parameters": { "building": building, "quantity": quantity },
    })
}

#[tokio::test]
async fn test_health() {
    let (app, _) = make_app();
    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_to_json(response.into_body()).await["status"], "ok");
}

#[tokio::test]
async fn test_catalog_lists_buildings() {
    let (app, _) = make_app();
    let response = app
        .oneshot(Request::get("/api/catalog").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert!(json["buildings"]["Farm"]["gold_cost"].is_u64());
}

#[tokio::test]
async fn test_create_province_uses_defaults() {
    let (app, store) = make_app();
    let created = create_province(&app).await;
    let config = EngineConfig::default();
    assert_eq!(created.resources, config.starting_resources());
    assert_eq!(created.version, 0);
    assert_eq!(store.get(created.id).await.unwrap(), created);
}

#[tokio::test]
async fn test_create_province_rejects_blank_name() {
    let (app, store) = make_app();
    let body = json!({
        "owner_id": uuid::Uuid::now_v7(),
        "name": "  ",
        "traits": { "faction": "Orc", "class": "Warlord", "alignment": "Evil" },
    });
    let response = app.oneshot(post_json("/api/provinces", &body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_get_province() {
    let (app, _) = make_app();
    let created = create_province(&app).await;
    let response = app
        .oneshot(
            Request::get(format!("/api/provinces/{}", created.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["version"], 0);
    assert_eq!(json["name"], "Greywater");
}

#[tokio::test]
async fn test_get_province_accrues_elapsed_turns() {
    let (app, store) = make_app();
    let created = create_province(&app).await;
    let mut overdue = created.clone();
    overdue.next_turn_at = Utc::now() - TimeDelta::seconds(1);
    store.conditional_update(0, overdue).await.unwrap();

    let response = app
        .oneshot(
            Request::get(format!("/api/provinces/{}", created.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let snapshot: ProvinceSnapshot =
        serde_json::from_value(body_to_json(response.into_body()).await).unwrap();
    assert_eq!(snapshot.version, 2);
    assert_eq!(snapshot.resources.turns, created.resources.turns + 1);
    assert!(snapshot.next_turn_at > Utc::now());
}

#[tokio::test]
async fn test_get_province_not_found() {
    let (app, _) = make_app();
    let response = app
        .oneshot(
            Request::get(format!("/api/provinces/{}", ProvinceId::new()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_to_json(response.into_body()).await["status"], 404);
}

#[tokio::test]
async fn test_get_province_invalid_uuid() {
    let (app, _) = make_app();
    let response = app
        .oneshot(
            Request::get("/api/provinces/not-a-uuid")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_action_applied() {
    let (app, store) = make_app();
    let created = create_province(&app).await;
    let response = app
        .oneshot(post_json(
            &format!("/api/provinces/{}/actions", created.id),
            &construct("Farm", 5),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["snapshot"]["version"], 1);
    assert_eq!(json["deltas"]["buildings"]["Farm"], 5);

    let stored = store.get(created.id).await.unwrap();
    assert_eq!(stored.buildings.get(&realm_types::BuildingType::Farm), Some(&5));
}

#[tokio::test]
async fn test_action_rejected_is_ok_without_write() {
    let (app, store) = make_app();
    let created = create_province(&app).await;
    let response = app
        .oneshot(post_json(
            &format!("/api/provinces/{}/actions", created.id),
            &construct("Fortress", 10_000),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["success"], false);
    assert!(json["message"].as_str().unwrap().to_lowercase().contains("gold"));
    assert_eq!(store.get(created.id).await.unwrap(), created);
}

#[tokio::test]
async fn test_action_zero_quantity_is_unprocessable() {
    let (app, _) = make_app();
    let created = create_province(&app).await;
    let response = app
        .oneshot(post_json(
            &format!("/api/provinces/{}/actions", created.id),
            &construct("Farm", 0),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_action_type_must_match_parameters() {
    let (app, store) = make_app();
    let created = create_province(&app).await;
    let body = json!({
        "action_type": "explore",
        "parameters": { "building": "Farm", "quantity": 1 },
    });
    let response = app
        .oneshot(post_json(
            &format!("/api/provinces/{}/actions", created.id),
            &body,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(store.get(created.id).await.unwrap().version, 0);
}

#[tokio::test]
async fn test_store_outage_is_service_unavailable() {
    let (app, store) = make_app();
    let created = create_province(&app).await;
    store.set_offline(true);
    let response = app
        .oneshot(
            Request::get(format!("/api/provinces/{}", created.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_reset_restores_defaults() {
    let (app, _) = make_app();
    let created = create_province(&app).await;
    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/api/provinces/{}/actions", created.id),
            &construct("Farm", 5),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(
            Request::post(format!("/api/provinces/{}/reset", created.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let reset: ProvinceSnapshot =
        serde_json::from_value(body_to_json(response.into_body()).await).unwrap();
    assert_eq!(reset.version, 2);
    assert!(reset.buildings.is_empty());
    assert_eq!(reset.resources, created.resources);
    assert_eq!(reset.traits, created.traits);
}

#[tokio::test]
async fn test_committed_action_is_pushed_to_subscribers() {
    let (app, store) = make_app();
    let created = create_province(&app).await;
    let mut subscription = store.subscribe(created.id);

    let response = app
        .oneshot(post_json(
            &format!("/api/provinces/{}/actions", created.id),
            &json!({ "action_type": "explore", "parameters": { "turns": 2 } }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let change = tokio::time::timeout(Duration::from_secs(1), subscription.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(change.version, 1);
    assert!(change.snapshot.resources.land > created.resources.land);
}

#[tokio::test]
async fn test_nonexistent_route_returns_404() {
    let (app, _) = make_app();
    let response = app
        .oneshot(Request::get("/api/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
