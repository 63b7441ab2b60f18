// HTTP surface tests, driven through the router without binding a socket.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use duel_server::app::AppState;
use duel_server::config::Config;
use duel_server::game::{CyclicPolicy, MatchSetup};
use duel_server::http::build_router;
use duel_server::store::NullSink;

fn state() -> AppState {
    AppState::with_sink(Config::default(), Arc::new(NullSink))
}

async fn get_json(state: &AppState, uri: &str) -> (StatusCode, Value) {
    let response = build_router(state.clone())
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_health_reports_active_matches() {
    let state = state();
    let (status, body) = get_json(&state, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["active_matches"], 0);

    state
        .match_registry
        .create(MatchSetup::vs_cpu(Uuid::new_v4(), Arc::new(CyclicPolicy::default())));
    let (_, body) = get_json(&state, "/health").await;
    assert_eq!(body["active_matches"], 1);
}

#[tokio::test]
async fn test_unknown_match_is_not_found() {
    let state = state();
    let (status, body) = get_json(&state, &format!("/matches/{}", Uuid::new_v4())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().starts_with("match "));
}

#[tokio::test]
async fn test_match_snapshot_over_http() {
    let state = state();
    let (match_id, _rx) = state
        .match_registry
        .create(MatchSetup::vs_human(Uuid::new_v4()));

    let (status, body) = get_json(&state, &format!("/matches/{}", match_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["match_id"], match_id.to_string());
    assert_eq!(body["status"], "running");
    assert_eq!(body["turn_index"], 0);
    assert_eq!(body["seats"]["p1"], "human");
    assert_eq!(body["seats"]["p2"], "open");
    assert_eq!(body["vitals"]["p1"]["health"], 100);
}
