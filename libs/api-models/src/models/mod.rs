//! Controller API models

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Version response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionResponse {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

/// Error body returned with every non-2xx response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Query string for the deployment listing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListDeploymentsQuery {
    pub namespace: Option<String>,
}

/// Query string for the log endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogsQuery {
    pub tail: Option<u32>,
}

/// Result of a manual refresh
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub success: bool,
    pub deployment_id: String,
    pub pod_rollup: String,
    pub llm_readiness: String,
    pub ui_status: String,
    pub ready: bool,
}

/// Result of a delete request. Deletion itself continues in the background.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
    pub deployment_id: String,
}

/// One log line from one pod
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentLogLine {
    pub pod_name: String,
    pub log: String,
}

/// Tracked deployment counts
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub total: usize,
    pub active: usize,
    pub pending: usize,
    pub failed: usize,
    pub by_namespace: BTreeMap<String, usize>,
}
