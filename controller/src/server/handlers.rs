//! HTTP request handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{error, warn};
use vllm_controller_api::{
    DeleteResponse, DeploymentLogLine, ErrorResponse, HealthResponse, ListDeploymentsQuery,
    LogsQuery, RefreshResponse, SummaryResponse, VersionResponse,
};

use crate::errors::ControllerError;
use crate::inventory::PodInfo;
use crate::reconcile::DeploymentStatus;
use crate::server::state::ServerState;
use crate::telemetry::DeploymentSummary;
use crate::utils::{version_info, SERVICE_NAME};

/// A [`ControllerError`] rendered as a JSON error response
#[derive(Debug)]
pub struct ApiError(pub ControllerError);

impl From<ControllerError> for ApiError {
    fn from(e: ControllerError) -> Self {
        Self(e)
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match &self.0 {
            ControllerError::NotFound(_) => StatusCode::NOT_FOUND,
            ControllerError::InvalidIdentity(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        }
        let body = Json(ErrorResponse {
            error: self.0.to_string(),
        });
        (status, body).into_response()
    }
}

/// Health check handler
pub async fn health_handler() -> impl IntoResponse {
    let version = version_info();
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: SERVICE_NAME.to_string(),
        version: version.version,
    })
}

/// Version handler
pub async fn version_handler() -> impl IntoResponse {
    let version = version_info();
    Json(VersionResponse {
        version: version.version,
        git_hash: version.git_hash,
        build_time: version.build_time,
    })
}

/// Tracked deployment counts
pub async fn summary_handler(State(state): State<Arc<ServerState>>) -> Json<SummaryResponse> {
    let statuses = state.deployments.list_statuses(None);
    Json(DeploymentSummary::collect(&statuses).into())
}

/// List deployments, tracking newly installed releases first
pub async fn deployments_handler(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<ListDeploymentsQuery>,
) -> Json<Vec<DeploymentStatus>> {
    let namespace = query.namespace.as_deref();
    if let Err(e) = state.deployments.discover(namespace).await {
        warn!("Release discovery failed, listing known deployments only: {}", e);
    }
    Json(state.deployments.list_statuses(namespace))
}

/// Last known status, refreshed when the deployment has not been seen yet
pub async fn deployment_handler(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> Result<Json<DeploymentStatus>, ApiError> {
    if let Some(status) = state.deployments.get_status(&id) {
        return Ok(Json(status));
    }
    Ok(Json(state.deployments.refresh(&id).await?))
}

pub async fn refresh_handler(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> Result<Json<RefreshResponse>, ApiError> {
    let status = state.deployments.refresh(&id).await?;
    Ok(Json(RefreshResponse {
        success: true,
        deployment_id: id,
        pod_rollup: status.pod_rollup.as_str().to_string(),
        llm_readiness: status.llm_readiness().as_str().to_string(),
        ui_status: status.ui_status().as_str().to_string(),
        ready: status.is_ready(),
    }))
}

pub async fn delete_deployment_handler(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let identity = state.deployments.delete(&id).await?;
    Ok(Json(DeleteResponse {
        success: true,
        message: format!("Deletion of deployment {} started", identity.release_name),
        deployment_id: identity.id,
    }))
}

pub async fn pods_handler(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<PodInfo>>, ApiError> {
    Ok(Json(state.deployments.pods(&id).await?))
}

pub async fn logs_handler(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
    Query(query): Query<LogsQuery>,
) -> Result<Json<Vec<DeploymentLogLine>>, ApiError> {
    Ok(Json(state.deployments.logs(&id, query.tail).await?))
}

pub async fn by_name_handler(
    State(state): State<Arc<ServerState>>,
    Path((namespace, name)): Path<(String, String)>,
) -> Result<Json<DeploymentStatus>, ApiError> {
    Ok(Json(state.deployments.get_by_name(&namespace, &name).await?))
}
