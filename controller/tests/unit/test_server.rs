//! HTTP API unit tests

mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use common::{release, running, Harness, MockInventory, MockProbe, MockReleases};
use vllm_controller::identity::deployment_id;
use vllm_controller::server::serve::router;
use vllm_controller::server::state::ServerState;

const MODEL_POD: &str = "demo-deployment-vllm-7d9f-0";
const ROUTER_POD: &str = "demo-deployment-router-5c4b-x";

fn app() -> (Harness, Router) {
    let h = Harness::new(
        MockInventory::new(vec![running(MODEL_POD), running(ROUTER_POD)]),
        MockProbe::unreachable(),
        MockReleases::new(vec![
            release("ns1", "demo", "vllm-stack-0.1.1"),
            release("ns2", "llm-chat", "custom-1.0"),
        ]),
    );
    let state = Arc::new(ServerState::new(h.service.clone()));
    (h, router(state))
}

async fn call(app: &Router, method: Method, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    call(app, Method::GET, uri).await
}

#[tokio::test]
async fn test_health() {
    let (_h, app) = app();

    let (status, body) = get(&app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "vllm-controller");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_version() {
    let (_h, app) = app();

    let (status, body) = get(&app, "/version").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["git_hash"].is_string());
    assert!(body["build_time"].is_string());
}

#[tokio::test]
async fn test_list_discovers_and_filters() {
    let (_h, app) = app();

    let (status, body) = get(&app, "/deployments?namespace=ns1").await;

    assert_eq!(status, StatusCode::OK);
    let items = body.as_array().unwrap();
    assert_eq!(items.len(), 1);
    let item = &items[0];
    assert_eq!(item["id"], deployment_id("ns1", "demo"));
    assert_eq!(item["namespace"], "ns1");
    assert_eq!(item["release_name"], "demo");
    assert_eq!(item["pod_rollup"], "running");
    assert_eq!(item["llm_readiness"], "ready");
    assert_eq!(item["ui_status"], "active");
    assert_eq!(item["lifecycle"], "active");
    assert_eq!(item["pods"].as_array().unwrap().len(), 2);

    let (_, body) = get(&app, "/deployments").await;
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_list_survives_discovery_failure() {
    let (h, app) = app();
    h.service.warm_start().await.unwrap();
    h.releases.set_list_error("helm list failed");

    let (status, body) = get(&app, "/deployments").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_get_deployment() {
    let (_h, app) = app();
    let id = deployment_id("ns1", "demo");

    let (status, body) = get(&app, &format!("/deployments/{}", id)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["release_name"], "demo");
    assert_eq!(body["service_url"], "demo-router-service.ns1.svc.cluster.local");
}

#[tokio::test]
async fn test_unknown_deployment_is_404() {
    let (_h, app) = app();

    let (status, body) = get(&app, "/deployments/00000000-0000-0000-0000-000000000000").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("Not found"));
}

#[tokio::test]
async fn test_refresh() {
    let (_h, app) = app();
    let id = deployment_id("ns1", "demo");

    let (status, body) = call(&app, Method::POST, &format!("/deployments/{}/refresh", id)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["deployment_id"], id);
    assert_eq!(body["pod_rollup"], "running");
    assert_eq!(body["llm_readiness"], "ready");
    assert_eq!(body["ui_status"], "active");
    assert_eq!(body["ready"], true);
}

#[tokio::test]
async fn test_delete_starts_in_background() {
    let (h, app) = app();
    let id = deployment_id("ns1", "demo");

    let (status, body) = call(&app, Method::DELETE, &format!("/deployments/{}", id)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["deployment_id"], id);
    assert_eq!(body["message"], "Deletion of deployment demo started");
    assert!(h.registry.get(&id).is_some());
}

#[tokio::test]
async fn test_pods_and_logs() {
    let (h, app) = app();
    h.inventory.set_logs("INFO a\nINFO b\n");
    let id = deployment_id("ns1", "demo");

    let (status, body) = get(&app, &format!("/deployments/{}/pods", id)).await;
    assert_eq!(status, StatusCode::OK);
    let pods = body.as_array().unwrap();
    assert_eq!(pods.len(), 2);
    assert_eq!(pods[0]["name"], MODEL_POD);
    assert_eq!(pods[0]["role"], "model");
    assert_eq!(pods[1]["role"], "router");

    let (status, body) = get(&app, &format!("/deployments/{}/logs?tail=10", id)).await;
    assert_eq!(status, StatusCode::OK);
    let lines = body.as_array().unwrap();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0]["pod_name"], MODEL_POD);
    assert_eq!(lines[0]["log"], "INFO a");
    assert_eq!(*h.inventory.log_tails.lock().unwrap(), vec![10, 10]);
}

#[tokio::test]
async fn test_logs_without_pods_is_404() {
    let (h, app) = app();
    h.inventory.set_pods(vec![]);

    let (status, _) = get(&app, &format!("/deployments/{}/logs", deployment_id("ns1", "demo"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_by_name() {
    let (_h, app) = app();

    let (status, body) = get(&app, "/deployments/by-name/ns1/demo").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], deployment_id("ns1", "demo"));

    let (status, _) = get(&app, "/deployments/by-name/ns1/ghost").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = get(&app, "/deployments/by-name/ns1/bad%20name").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_summary() {
    let (h, app) = app();
    h.service.warm_start().await.unwrap();

    let (status, body) = get(&app, "/telemetry/summary").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["active"], 1);
    assert_eq!(body["pending"], 1);
    assert_eq!(body["failed"], 0);
    assert_eq!(body["by_namespace"]["ns1"], 1);
    assert_eq!(body["by_namespace"]["ns2"], 1);
}
