//! Integration tests for the API layer.
//!
//! Each test spins up a real HTTP server on a random port and talks to it
//! with reqwest.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use synapse_api::{create_router, AppState};
use synapse_common::Result;
use synapse_coordinator::{LlmPlanner, Orchestrator, SynapseConfig};
use synapse_llm::{LlmClient, LlmRequest, LlmResponse};
use synapse_specialists::{InMemoryBackend, SpecialistRegistry};

/// Spin up a test server on a random port and return the base URL.
async fn start_server(state: AppState) -> String {
    let router = create_router(Arc::new(state));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    format!("http://{}", addr)
}

async fn start_default_server() -> String {
    start_server(AppState::new(&SynapseConfig::default()).unwrap()).await
}

/// Helper to GET a URL and return (status, body).
async fn get(base: &str, path: &str) -> (u16, Value) {
    let resp = reqwest::Client::new()
        .get(format!("{}{}", base, path))
        .send()
        .await
        .unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

/// Helper to POST a raw JSON body and return (status, body text).
async fn post_json(base: &str, path: &str, json: &str) -> (u16, String) {
    let resp = reqwest::Client::new()
        .post(format!("{}{}", base, path))
        .header("content-type", "application/json")
        .body(json.to_string())
        .send()
        .await
        .unwrap();
    let status = resp.status().as_u16();
    (status, resp.text().await.unwrap())
}

struct FixedReplyClient(&'static str);

#[async_trait]
impl LlmClient for FixedReplyClient {
    async fn complete(&self, _request: LlmRequest) -> Result<LlmResponse> {
        Ok(LlmResponse {
            content: self.0.to_string(),
            model: "fixed".to_string(),
            usage: None,
            finish_reason: None,
        })
    }

    fn model_name(&self) -> &str {
        "fixed"
    }
}

fn llm_state(reply: &'static str) -> AppState {
    let registry = Arc::new(SpecialistRegistry::with_defaults(Arc::new(
        InMemoryBackend::seeded(),
    )));
    let planner = LlmPlanner::new(Arc::new(FixedReplyClient(reply)), &registry);
    AppState::with_orchestrator(Arc::new(Orchestrator::new(Arc::new(planner), registry)))
}

// ============================================================================
// Health endpoint
// ============================================================================

#[tokio::test]
async fn health_reports_planner_and_specialists() {
    let base = start_default_server().await;
    let (status, body) = get(&base, "/health").await;

    assert_eq!(status, 200);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["planner"], "keyword");
    assert_eq!(
        body["specialists"],
        serde_json::json!([
            "merchant-finder",
            "merchant-status-checker",
            "notification-sender",
            "route-finder"
        ])
    );
}

// ============================================================================
// Resolve endpoint
// ============================================================================

#[tokio::test]
async fn resolve_traffic_jam() {
    let base = start_default_server().await;
    let (status, body) = post_json(
        &base,
        "/resolve",
        r#"{"scenario_text": "Major traffic jam", "merchant": {"status": null}}"#,
    )
    .await;

    assert_eq!(status, 200, "body: {body}");
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["status"], "resolved");
    let narrative = body["resolution"].as_str().unwrap();
    assert!(narrative.contains("route-finder: Alternative route found"));
    assert!(narrative.contains("notification-sender: Notification sent to customer"));
    assert_eq!(body["results"].as_array().unwrap().len(), 2);
    assert!(body.get("order_id").is_none());
}

#[tokio::test]
async fn resolve_overloaded_merchant() {
    let base = start_default_server().await;
    let (status, body) = post_json(
        &base,
        "/resolve",
        r#"{
            "order_id": "GF-555",
            "scenario_text": "The kitchen is overloaded and has a 40-minute prep time.",
            "customer": {"id": "CUST-456", "name": "Bob"},
            "merchant": {"id": "MERC-789", "name": "Pizza Palace", "status": "OVERLOADED"},
            "driver": {"id": "DRV-012"},
            "delivery_details": {"destination_address": "456 Oak Ave"}
        }"#,
    )
    .await;

    assert_eq!(status, 200, "body: {body}");
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["order_id"], "GF-555");
    assert!(body["resolution"]
        .as_str()
        .unwrap()
        .contains("merchant-status-checker: Status: OVERLOADED. Current prep time is 40 minutes."));
}

#[tokio::test]
async fn malformed_body_is_rejected() {
    let base = start_default_server().await;

    let (status, body) = post_json(&base, "/resolve", r#"{"order_id": "GF-1"}"#).await;
    assert_eq!(status, 422);
    assert!(body.contains("INVALID_REQUEST"));

    let (status, _) = post_json(&base, "/resolve", "not json").await;
    assert_eq!(status, 422);
}

#[tokio::test]
async fn blank_scenario_is_rejected() {
    let base = start_default_server().await;
    let (status, body) = post_json(&base, "/resolve", r#"{"scenario_text": "   "}"#).await;

    assert_eq!(status, 422);
    assert!(body.contains("scenario_text"));
}

#[tokio::test]
async fn unusable_reasoning_output_is_bad_gateway() {
    let base = start_server(llm_state("Sorry, I can't produce JSON today.")).await;
    let (status, body) = post_json(
        &base,
        "/resolve",
        r#"{"order_id": "GF-789", "scenario_text": "Major traffic jam"}"#,
    )
    .await;

    assert_eq!(status, 502);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["code"], "PLANNING_ERROR");
    assert!(body["resolution"]
        .as_str()
        .unwrap()
        .starts_with("Planning failed: malformed plan output"));
}

#[tokio::test]
async fn reasoning_plan_is_dispatched() {
    let base = start_server(llm_state(
        r#"{"thought": "tell the customer", "workflow_type": "parallel",
            "instructions": [{"target_specialist": "notification-sender",
                              "directive": "Tell CUST-123 their order is late"}]}"#,
    ))
    .await;
    let (status, body) = post_json(
        &base,
        "/resolve",
        r#"{"scenario_text": "Order is running late"}"#,
    )
    .await;

    assert_eq!(status, 200, "body: {body}");
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(
        body["resolution"],
        "notification-sender: Notification sent to CUST-123 (message id msg-0001)."
    );
}
