use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;
use ward_engine::{EngineConfig, WardEngine};
use ward_server::{AppConfig, AppState, build_app};

fn app() -> Router {
    let engine = Arc::new(WardEngine::new(
        ward_db_memory::create_store(),
        EngineConfig::default(),
    ));
    build_app(AppState::new(engine, AppConfig::default()))
}

async fn call(
    app: &Router,
    method: &str,
    uri: &str,
    actor: Option<(&str, &str)>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some((id, role)) = actor {
        req = req.header("x-actor-id", id).header("x-actor-role", role);
    }
    let req = match body {
        Some(body) => req
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

const CLERK: Option<(&str, &str)> = Some(("clerk-1", "ward_clerk"));
const DOCTOR: Option<(&str, &str)> = Some(("dr-1", "doctor"));
const NURSE: Option<(&str, &str)> = Some(("rn-1", "staff_nurse"));

async fn create_bed(app: &Router, room: &str) -> String {
    let (status, bed) = call(
        app,
        "POST",
        "/api/beds",
        CLERK,
        Some(json!({"ward": "ward-a", "room": room, "position": "A"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    bed["id"].as_str().unwrap().to_string()
}

async fn admit(app: &Router, patient: &str, bed: &str) -> (StatusCode, Value) {
    call(
        app,
        "POST",
        "/api/admissions",
        DOCTOR,
        Some(json!({
            "patient": patient,
            "bed": bed,
            "attending": "dr-1",
            "admission_type": "emergency",
        })),
    )
    .await
}

#[tokio::test]
async fn test_healthz() {
    let (status, body) = call(&app(), "GET", "/healthz", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_missing_actor_is_unauthorized() {
    let (status, body) = call(
        &app(),
        "POST",
        "/api/beds",
        None,
        Some(json!({"ward": "ward-a", "room": "101", "position": "A"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn test_system_role_refused() {
    let (status, _) = call(
        &app(),
        "POST",
        "/api/beds",
        Some(("sweeper", "system")),
        Some(json!({"ward": "ward-a", "room": "101", "position": "A"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admit_occupies_bed() {
    let app = app();
    let bed = create_bed(&app, "101").await;

    let (status, admission) = admit(&app, "p-1", &bed).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(admission["status"], "active");
    assert_eq!(admission["bed"], bed.as_str());

    let (status, stored) = call(&app, "GET", &format!("/api/beds/{bed}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stored["status"], "occupied");
    assert_eq!(stored["current_admission"], admission["id"]);

    let (status, violations) = call(&app, "GET", "/api/occupancy/invariant", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(violations, json!([]));
}

#[tokio::test]
async fn test_admit_into_occupied_bed_is_rejected() {
    let app = app();
    let bed = create_bed(&app, "101").await;
    assert_eq!(admit(&app, "p-1", &bed).await.0, StatusCode::CREATED);

    let (status, body) = admit(&app, "p-2", &bed).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "bed_unavailable");
}

#[tokio::test]
async fn test_nurse_cannot_admit() {
    let app = app();
    let bed = create_bed(&app, "101").await;
    let (status, body) = call(
        &app,
        "POST",
        "/api/admissions",
        NURSE,
        Some(json!({
            "patient": "p-1",
            "bed": bed,
            "attending": "dr-1",
            "admission_type": "scheduled",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");
}

#[tokio::test]
async fn test_unknown_ids_are_not_found() {
    let app = app();
    let (status, body) = call(&app, "GET", "/api/beds/nope", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, _) = call(&app, "GET", "/api/emergencies/nope", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let (status, body) = call(
        &app(),
        "POST",
        "/api/beds",
        CLERK,
        Some(json!({"ward": "ward-a"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn test_emergency_flow_over_http() {
    let app = app();
    let bed = create_bed(&app, "101").await;
    let (_, admission) = admit(&app, "p-1", &bed).await;

    let (status, event) = call(
        &app,
        "POST",
        "/api/emergencies",
        NURSE,
        Some(json!({
            "admission": admission["id"],
            "type": "cardiac_arrest",
            "severity": "critical",
            "description": "no pulse",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(event["status"], "reported");
    let id = event["id"].as_str().unwrap();

    let (status, open) = call(&app, "GET", "/api/emergencies", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(open.as_array().unwrap().len(), 1);

    let (status, _) = call(
        &app,
        "POST",
        &format!("/api/emergencies/{id}/resolve"),
        NURSE,
        Some(json!({"outcome": "stable"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, resolved) = call(
        &app,
        "POST",
        &format!("/api/emergencies/{id}/resolve"),
        DOCTOR,
        Some(json!({"outcome": "stable"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resolved["status"], "resolved");
}

#[tokio::test]
async fn test_change_feed_reports_writes() {
    let app = app();
    let (_, empty) = call(&app, "GET", "/changes", None, None).await;
    assert_eq!(empty["changes"], json!([]));

    let bed = create_bed(&app, "101").await;
    let (status, feed) = call(&app, "GET", "/changes?since=0", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let changes = feed["changes"].as_array().unwrap();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0]["entity"], "bed");
    assert_eq!(changes[0]["id"], bed.as_str());

    let watermark = feed["watermark"].as_u64().unwrap();
    let (_, later) = call(&app, "GET", &format!("/changes?since={watermark}"), None, None).await;
    assert_eq!(later["changes"], json!([]));
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let req = Request::builder()
        .uri("/healthz")
        .header("x-request-id", "req-42")
        .body(Body::empty())
        .unwrap();
    let res = app().oneshot(req).await.unwrap();
    assert_eq!(res.headers()["x-request-id"], "req-42");
}
