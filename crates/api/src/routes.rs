//! HTTP route handlers for the API.

use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use synapse_common::{Disruption, ResolutionStatus, SpecialistResult};
use tracing::{error, info, warn};

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub planner: String,
    pub specialists: Vec<String>,
}

/// Health check endpoint.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.uptime_seconds(),
        planner: state.orchestrator.planner_kind(),
        specialists: state
            .orchestrator
            .registry()
            .ids()
            .into_iter()
            .map(|id| id.to_string())
            .collect(),
    })
}

/// Resolve response body.
#[derive(Debug, Serialize)]
pub struct ResolveResponse {
    /// Newline-joined narrative
    pub resolution: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    pub status: ResolutionStatus,
    pub results: Vec<SpecialistResult>,
}

/// API error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    #[serde(skip)]
    pub status: StatusCode,
    pub error: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
}

impl ErrorResponse {
    fn invalid_request(error: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            error: error.into(),
            code: "INVALID_REQUEST",
            resolution: None,
        }
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// Resolve a disruption.
///
/// 200 for every dispatched plan, whatever its outcome; 502 when no plan
/// could be produced; 422 when the body is not a disruption.
pub async fn resolve(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Disruption>, JsonRejection>,
) -> Result<Json<ResolveResponse>, ErrorResponse> {
    let Json(disruption) = payload.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "Rejected resolve request");
        ErrorResponse::invalid_request(rejection.body_text())
    })?;

    if disruption.scenario_text.trim().is_empty() {
        return Err(ErrorResponse::invalid_request("scenario_text must not be empty"));
    }

    info!(
        order_id = disruption.order_id.as_deref().unwrap_or("-"),
        scenario_preview = %disruption.scenario_text.chars().take(50).collect::<String>(),
        "Received disruption"
    );

    let outcome = state.orchestrator.resolve(&disruption).await;
    let resolution = outcome.resolution;

    if resolution.status == ResolutionStatus::PlanningFailed {
        error!(order_id = ?resolution.order_id, narrative = %resolution.narrative, "Planning failed");
        return Err(ErrorResponse {
            status: StatusCode::BAD_GATEWAY,
            error: resolution.narrative.clone(),
            code: "PLANNING_ERROR",
            resolution: Some(resolution.narrative),
        });
    }

    Ok(Json(ResolveResponse {
        resolution: resolution.narrative,
        order_id: resolution.order_id,
        status: resolution.status,
        results: resolution.results,
    }))
}
