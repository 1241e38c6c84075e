// Integration tests for the simulation endpoints driven through the full router

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use cubefleet::api::create_app;
use cubefleet::config::CoordinatorConfig;
use cubefleet::coordinator::CoordinationService;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

// ── Helpers ───────────────────────────────────────────────────────────────────

fn create_test_app() -> (Router, Arc<CoordinationService>) {
    let service = Arc::new(CoordinationService::new(CoordinatorConfig::default()));
    (create_app(service.clone()), service)
}

fn agent(id: &str, x: f64, z: f64, has_cube: bool) -> Value {
    json!({
        "id": id,
        "state": {
            "position": {"x": x, "y": 0.0, "z": z},
            "has_cube": has_cube
        }
    })
}

async fn post_json(app: &Router, uri: &str, body: &Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("Content-Type", "application/json")
                .body(Body::from(serde_json::to_vec(body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

/// Client wire format: string ids, per-agent cube lists
#[tokio::test]
async fn test_get_decisions_client_format() {
    let (app, _) = create_test_app();

    let mut first = agent("0", 0.0, 0.0, false);
    first["state"]["available_cubes"] = json!([
        {"id": "5", "position": {"x": 3.0, "y": 0.0, "z": 0.0}, "is_carried": false},
        {"id": "6", "position": {"x": 9.0, "y": 0.0, "z": 0.0}, "is_carried": false}
    ]);
    let body = json!({"agentStates": [first, agent("1", 29.5, 0.0, true)]});

    let (status, json) = post_json(&app, "/get_decisions", &body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(json["batchId"].is_string());

    let decisions = json["decisions"].as_array().unwrap();
    assert_eq!(decisions.len(), 2);
    assert_eq!(decisions[0]["agentId"], 0);
    assert_eq!(decisions[0]["decision"], "go-to-object");
    assert_eq!(decisions[0]["target"]["objectId"], 5);
    assert_eq!(decisions[1]["agentId"], 1);
    assert_eq!(decisions[1]["decision"], "deposit-cube");
}

/// One bad entry yields an error decision in place; the rest still run
#[tokio::test]
async fn test_malformed_entry_gives_partial_status() {
    let (app, _) = create_test_app();
    let body = json!({
        "agentStates": [
            agent("0", 0.0, 0.0, false),
            {"id": "1", "state": {"position": {"x": "far"}, "has_cube": false}}
        ]
    });

    let (status, json) = post_json(&app, "/get_decisions", &body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "partial");
    assert_eq!(json["decisions"][0]["decision"], "explore");
    assert_eq!(json["decisions"][1]["decision"], "error");
    assert_eq!(json["decisions"][1]["agentId"], 1);
    assert!(json["decisions"][1]["message"].is_string());
}

#[tokio::test]
async fn test_non_json_body_returns_400() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/get_decisions")
                .header("Content-Type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(json["error"].is_string());
}

/// A broken cube in the shared list is skipped; the batch still runs
#[tokio::test]
async fn test_malformed_shared_cube_is_skipped() {
    let (app, _) = create_test_app();
    let body = json!({
        "agentStates": [agent("0", 0.0, 0.0, false)],
        "availableCubes": [
            {"id": 1, "position": {"x": 1.0}},
            {"id": 2, "position": {"x": 6.0, "y": 0.0, "z": 0.0}}
        ]
    });

    let (status, json) = post_json(&app, "/get_decisions", &body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["decisions"][0]["decision"], "go-to-object");
    assert_eq!(json["decisions"][0]["target"]["objectId"], 2);
}

/// Two agents see one cube; only the first entry gets it
#[tokio::test]
async fn test_single_cube_assigned_once() {
    let (app, service) = create_test_app();
    let body = json!({
        "agentStates": [agent("3", 0.0, 0.0, false), agent("4", 0.5, 0.0, false)],
        "availableCubes": [{"id": 11, "position": {"x": 2.0, "y": 0.0, "z": 0.0}}]
    });

    let (_, json) = post_json(&app, "/get_decisions", &body).await;
    assert_eq!(json["decisions"][0]["decision"], "go-to-object");
    assert_eq!(json["decisions"][1]["decision"], "explore");

    let claims = service.claims().await;
    assert_eq!(claims.len(), 1);
    assert_eq!(claims[0].owner_agent_id, 3);
}

/// Pick up, carry, drop in the zone, then ask for metrics
#[tokio::test]
async fn test_delivery_then_metrics() {
    let (app, _) = create_test_app();
    let cube = json!([{"id": 1, "position": {"x": 20.0, "y": 0.0, "z": 0.0}}]);

    let timed = |x: f64, has_cube: bool, time: f64| {
        json!({
            "id": "0",
            "state": {
                "position": {"x": x, "y": 0.0, "z": 0.0},
                "has_cube": has_cube,
                "time": time
            }
        })
    };

    let steps = [
        json!({"agentStates": [timed(0.0, false, 0.0)], "availableCubes": cube}),
        json!({"agentStates": [timed(20.0, true, 60.0)]}),
        json!({"agentStates": [timed(29.0, true, 90.0)]}),
        json!({"agentStates": [timed(29.0, false, 120.0)]}),
    ];
    let expected = ["go-to-object", "go-to-delivery-zone", "deposit-cube", "explore"];

    for (body, decision) in steps.iter().zip(expected) {
        let (status, json) = post_json(&app, "/get_decisions", body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["decisions"][0]["decision"], decision);
    }

    let (status, json) = post_json(
        &app,
        "/get_metrics",
        &json!({"agentStates": [timed(29.0, false, 120.0)]}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    let metrics = &json["metrics"][0];
    assert_eq!(metrics["agentId"], 0);
    assert_eq!(metrics["cubesDelivered"], 1);
    assert_eq!(metrics["totalDistance"], 29.0);
    assert_eq!(metrics["elapsedMinutes"], 2.0);
    assert_eq!(metrics["deliveryRate"], 0.5);
    assert_eq!(metrics["efficiencyRatio"], 344.83);
}

#[tokio::test]
async fn test_cors_headers_present() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/get_metrics")
                .header("Origin", "http://localhost:8080")
                .header("Content-Type", "application/json")
                .body(Body::from(r#"{"agentStates":[]}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );
}
