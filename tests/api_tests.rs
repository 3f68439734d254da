#![cfg(feature = "server")]

//! End-to-end checks of the HTTP surface over temporary data directories.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use region_satisfaction::server::{create_router, AppState};
use region_satisfaction::{Config, FixedRandom, RegionRegistry, ResponseAssembler, VariationInjector};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

// ============================================================================
// FIXTURES
// ============================================================================

fn entry(id: &str, state: &str, rating: f64, date: &str, verified: bool) -> Value {
    json!({
        "id": id,
        "customerName": "Test C.",
        "location": "Somewhere",
        "state": state,
        "county": "Test County",
        "city": "Testville",
        "rating": rating,
        "score": 0,
        "review": "Fine.",
        "date": date,
        "category": "Coverage",
        "verified": verified
    })
}

fn comprehensive_data() -> Value {
    json!({
        "Texas": {
            "averageRating": 3.0,
            "score": 60,
            "stars": 3,
            "districts": [{"name": "Harris", "averageRating": 4.1}],
            "entries": [
                entry("tx-1", "Texas", 5.0, "2025-03-01", true),
                entry("tx-2", "Texas", 4.0, "2025-03-03", true),
                entry("tx-3", "Texas", 3.5, "2025-03-02", false)
            ]
        },
        "New York": {
            "averageRating": 3.0,
            "districts": [],
            "entries": [
                entry("ny-1", "New York", 4.0, "2025-02-01", true),
                entry("ny-2", "New York", 2.0, "2025-02-02", true)
            ]
        }
    })
}

fn basic_data() -> Value {
    json!({
        "Texas": {"averageRating": 4.2, "score": 84, "stars": 4, "districts": []},
        "Ohio": {"averageRating": 3.6, "score": 72, "stars": 4, "districts": []}
    })
}

fn write_json(path: &Path, value: &Value) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, serde_json::to_string_pretty(value).unwrap()).unwrap();
}

fn app_for(dir: &Path) -> Router {
    let config = Config::for_dir(dir);
    let registry = RegionRegistry::open(config.registry_source());
    let assembler = ResponseAssembler::new(
        Arc::new(registry),
        config.snapshot_store(),
        VariationInjector::new(Arc::new(FixedRandom(0.5))),
    );
    create_router(AppState::new(assembler))
}

fn comprehensive_app() -> (TempDir, Router) {
    let dir = TempDir::new().unwrap();
    write_json(&dir.path().join("state-entries-data.json"), &comprehensive_data());
    let app = app_for(dir.path());
    (dir, app)
}

async fn send(app: &Router, method: Method, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().method(method).uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::GET, uri).await
}

// ============================================================================
// COMPREHENSIVE TIER
// ============================================================================

#[tokio::test]
async fn generated_instants_load_and_sort_by_time() {
    let dir = TempDir::new().unwrap();
    write_json(
        &dir.path().join("state-entries-data.json"),
        &json!({
            "Utah": {
                "averageRating": 4.0,
                "districts": [],
                "entries": [
                    entry("ut-1", "Utah", 4.0, "2025-09-14T08:00:00.000Z", true),
                    entry("ut-2", "Utah", 5.0, "2025-09-14T19:45:12.250Z", true),
                    entry("ut-3", "Utah", 3.0, "2025-09-13", true)
                ]
            }
        }),
    );
    let app = app_for(dir.path());

    let (status, body) = get(&app, "/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["statesLoaded"], 1);

    let (status, body) = get(&app, "/api/state/Utah/entries").await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = body["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["ut-2", "ut-1", "ut-3"]);
    assert_eq!(body["entries"][0]["date"], "2025-09-14T19:45:12.250Z");
    assert_eq!(body["entries"][2]["date"], "2025-09-13");
}

#[tokio::test]
async fn health_reports_loaded_regions() {
    let (_dir, app) = comprehensive_app();
    let (status, body) = get(&app, "/api/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["statesLoaded"], 2);
    assert!(body["dataLoadError"].is_null());
    assert!(body["uptime"].as_f64().unwrap() >= 0.0);
}

#[tokio::test]
async fn overall_is_entry_weighted() {
    let (_dir, app) = comprehensive_app();
    let (status, body) = get(&app, "/api/satisfaction/overall").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["totalReviews"], 5);
    assert_eq!(body["totalStates"], 2);
    // (5 + 4 + 3.5 + 4 + 2) / 5
    assert_eq!(body["averageRating"], 3.7);
    assert_eq!(body["stars"], 4);
    assert_eq!(body["score"], 74);
    assert_eq!(body["recommendRate"], 85);
}

#[tokio::test]
async fn region_detail_resolves_loose_names() {
    let (_dir, app) = comprehensive_app();

    let (status, body) = get(&app, "/api/satisfaction/state/texas").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stateName"], "Texas");
    // Rating re-derived from entries at load: 12.5 / 3
    assert_eq!(body["averageRating"], 4.17);
    assert_eq!(body["districts"][0]["name"], "Harris");

    let (status, body) = get(&app, "/api/satisfaction/state/new%20york").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stateName"], "New York");
}

#[tokio::test]
async fn unknown_region_is_404_with_hints() {
    let (_dir, app) = comprehensive_app();
    let (status, body) = get(&app, "/api/satisfaction/state/Atlantis").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "State not found");
    assert_eq!(body["requestedState"], "Atlantis");
    assert_eq!(body["availableStates"], json!(["New York", "Texas"]));
}

#[tokio::test]
async fn region_entries_paginate_newest_first() {
    let (_dir, app) = comprehensive_app();
    let (status, body) = get(&app, "/api/state/Texas/entries?limit=2").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stateName"], "Texas");
    assert_eq!(body["entries"].as_array().unwrap().len(), 2);
    assert_eq!(body["entries"][0]["id"], "tx-2");
    assert_eq!(body["entries"][1]["id"], "tx-3");
    assert_eq!(body["pagination"], json!({"total": 3, "limit": 2, "offset": 0, "hasMore": true}));
    assert_eq!(body["filters"], json!({"minRating": 0.0, "maxRating": 5.0}));

    // Scores are re-derived from ratings at load
    assert_eq!(body["entries"][0]["score"], 80);
}

#[tokio::test]
async fn region_entries_rating_filter() {
    let (_dir, app) = comprehensive_app();
    let (status, body) = get(&app, "/api/state/Texas/entries?minRating=4").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], 2);
    assert_eq!(body["pagination"]["hasMore"], false);
}

#[tokio::test]
async fn region_entries_verified_filter() {
    let (_dir, app) = comprehensive_app();
    let (status, body) = get(&app, "/api/state/Texas/entries?verified=false").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["entries"][0]["id"], "tx-3");
    assert_eq!(body["filters"]["verified"], false);
}

#[tokio::test]
async fn malformed_query_is_400() {
    let (_dir, app) = comprehensive_app();

    let (status, body) = get(&app, "/api/state/Texas/entries?limit=lots").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, _) = get(&app, "/api/entries/all?minRating=4&maxRating=2").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(&app, "/api/reviews?limit=-3").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn region_statistics_histogram() {
    let (_dir, app) = comprehensive_app();
    let (status, body) = get(&app, "/api/state/TEXAS/statistics").await;

    assert_eq!(status, StatusCode::OK);
    let stats = &body["statistics"];
    assert_eq!(stats["totalEntries"], 3);
    assert_eq!(stats["ratingDistribution"], json!({"5": 1, "4": 1, "3": 0, "2": 0, "1": 0}));
    assert_eq!(stats["verifiedEntries"], 2);
    assert_eq!(stats["verifiedPercentage"], 67);
    assert_eq!(stats["categoryDistribution"]["Coverage"], 3);
}

#[tokio::test]
async fn all_entries_with_state_filter() {
    let (_dir, app) = comprehensive_app();

    let (status, body) = get(&app, "/api/entries/all").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], 5);
    assert_eq!(body["filters"]["state"], "all");
    assert_eq!(body["entries"][0]["id"], "tx-2");

    let (_, body) = get(&app, "/api/entries/all?state=new%20york").await;
    assert_eq!(body["pagination"]["total"], 2);
    assert!(body["entries"]
        .as_array()
        .unwrap()
        .iter()
        .all(|e| e["state"] == "New York"));
}

#[tokio::test]
async fn states_list_is_sorted() {
    let (_dir, app) = comprehensive_app();
    let (status, body) = get(&app, "/api/states/list").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["states"], json!(["New York", "Texas"]));
    assert_eq!(body["count"], 2);
}

#[tokio::test]
async fn reviews_respect_limit() {
    let (_dir, app) = comprehensive_app();
    let (status, body) = get(&app, "/api/reviews?limit=3").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reviews"].as_array().unwrap().len(), 3);
    assert_eq!(body["total"], 3);
    assert_eq!(body["available"], 12);
}

#[tokio::test]
async fn unknown_api_route_lists_endpoints() {
    let (_dir, app) = comprehensive_app();
    let (status, body) = get(&app, "/api/nope").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Not found");
    assert!(body["message"].as_str().unwrap().contains("GET /api/nope"));
    assert!(body["availableEndpoints"]
        .as_array()
        .unwrap()
        .contains(&json!("GET /api/health")));
}

// ============================================================================
// SNAPSHOTS
// ============================================================================

#[tokio::test]
async fn snapshot_served_verbatim_until_filtered() {
    let (dir, app) = comprehensive_app();
    write_json(
        &dir.path().join("api").join("satisfaction-overall.json"),
        &json!({"success": true, "averageRating": 4.15, "precomputed": true}),
    );
    write_json(
        &dir.path().join("api").join("entries-all.json"),
        &json!({
            "success": true,
            "entries": [{"id": "s1"}, {"id": "s2"}, {"id": "s3"}],
            "pagination": {"total": 3, "limit": 50, "offset": 0, "hasMore": false}
        }),
    );

    let (_, body) = get(&app, "/api/satisfaction/overall").await;
    assert_eq!(body, json!({"success": true, "averageRating": 4.15, "precomputed": true}));

    let (_, body) = get(&app, "/api/entries/all?limit=2").await;
    assert_eq!(body["entries"], json!([{"id": "s1"}, {"id": "s2"}]));
    assert_eq!(body["pagination"]["hasMore"], true);

    // Filters bypass the snapshot
    let (_, body) = get(&app, "/api/entries/all?minRating=4").await;
    assert_eq!(body["pagination"]["total"], 3);
    assert_eq!(body["entries"][0]["id"], "tx-2");
}

// ============================================================================
// BASIC TIER / UNLOADED / RELOAD
// ============================================================================

#[tokio::test]
async fn basic_tier_serves_aggregates_only() {
    let dir = TempDir::new().unwrap();
    write_json(&dir.path().join("state-data.json"), &basic_data());
    let app = app_for(dir.path());

    let (status, body) = get(&app, "/api/satisfaction/overall").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["averageRating"], 3.9);
    // Synthetic 500..1500 per region; u = 0.5 gives 1000 each
    assert_eq!(body["totalReviews"], 2000);

    let (status, body) = get(&app, "/api/state/Texas/entries").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Entries not available");

    let (status, _) = get(&app, "/api/state/Ohio/statistics").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = get(&app, "/api/entries/all").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], 0);
}

#[tokio::test]
async fn unloaded_registry_degrades() {
    let dir = TempDir::new().unwrap();
    let app = app_for(dir.path());

    let (status, body) = get(&app, "/api/health").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "unhealthy");
    assert!(body["dataLoadError"].as_str().unwrap().len() > 0);

    let (status, body) = get(&app, "/api/satisfaction/overall").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["success"], false);

    let (status, body) = get(&app, "/api/states/list").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);

    let (status, _) = get(&app, "/api/reviews").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn failed_reload_keeps_serving() {
    let (dir, app) = comprehensive_app();
    fs::write(dir.path().join("state-entries-data.json"), "{ not json").unwrap();

    let (status, body) = send(&app, Method::POST, "/api/admin/reload").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Failed to reload data");
    assert_eq!(body["statesLoaded"], 2);
    assert!(!body["error"].as_str().unwrap().is_empty());

    let (status, _) = get(&app, "/api/satisfaction/state/Texas").await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = get(&app, "/api/health").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn reload_picks_up_new_data() {
    let dir = TempDir::new().unwrap();
    let app = app_for(dir.path());

    let (status, _) = get(&app, "/api/satisfaction/overall").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    write_json(&dir.path().join("state-data.json"), &basic_data());
    let (_, body) = send(&app, Method::POST, "/api/admin/reload").await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Data reloaded successfully");
    assert_eq!(body["statesLoaded"], 2);
    assert!(body["error"].is_null());

    let (status, _) = get(&app, "/api/health").await;
    assert_eq!(status, StatusCode::OK);
}
