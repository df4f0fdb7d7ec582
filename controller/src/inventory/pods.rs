//! Pod view parsed from `kubectl get pods -o json`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kubernetes pod phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PodPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

impl PodPhase {
    pub fn from_phase(phase: &str) -> Self {
        match phase {
            "Pending" => PodPhase::Pending,
            "Running" => PodPhase::Running,
            "Succeeded" => PodPhase::Succeeded,
            "Failed" => PodPhase::Failed,
            _ => PodPhase::Unknown,
        }
    }
}

/// What a pod does inside a serving stack, guessed from its name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PodRole {
    Model,
    Router,
    Unclassified,
}

/// Name fragments that mark a model-serving pod
pub const MODEL_POD_MARKERS: [&str; 2] = ["vllm", "deployment"];

/// Classify a pod by name.
///
/// This is a naming heuristic, not a source of truth: a pod is a router when its
/// name contains "router", a model pod when it contains one of
/// [`MODEL_POD_MARKERS`], and unclassified otherwise. "router" is matched as
/// written and wins, so `demo-deployment-router-x` is a router; the model
/// markers are matched case-insensitively.
pub fn classify_pod_role(pod_name: &str) -> PodRole {
    if pod_name.contains("router") {
        PodRole::Router
    } else if MODEL_POD_MARKERS
        .iter()
        .any(|marker| pod_name.to_lowercase().contains(marker))
    {
        PodRole::Model
    } else {
        PodRole::Unclassified
    }
}

/// Uniform view of one pod
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodInfo {
    pub name: String,
    pub phase: PodPhase,
    /// Every container reports ready. False when no container status is known.
    pub ready: bool,
    pub restart_count: u32,
    pub created_at: Option<DateTime<Utc>>,
    pub role: PodRole,
    /// Waiting reason of the first container, e.g. `CrashLoopBackOff`
    pub waiting_reason: Option<String>,
    /// Image of the first container
    pub image: Option<String>,
}

impl PodInfo {
    pub fn new(name: impl Into<String>, phase: PodPhase, ready: bool) -> Self {
        let name = name.into();
        let role = classify_pod_role(&name);
        Self {
            name,
            phase,
            ready,
            restart_count: 0,
            created_at: None,
            role,
            waiting_reason: None,
            image: None,
        }
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn with_waiting_reason(mut self, reason: impl Into<String>) -> Self {
        self.waiting_reason = Some(reason.into());
        self
    }

    pub fn is_running(&self) -> bool {
        self.phase == PodPhase::Running
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawPodList {
    items: Vec<RawPod>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawPod {
    metadata: RawMetadata,
    spec: RawPodSpec,
    status: RawPodStatus,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawMetadata {
    name: String,
    creation_timestamp: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawPodSpec {
    containers: Vec<RawContainer>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawContainer {
    image: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawPodStatus {
    phase: Option<String>,
    container_statuses: Vec<RawContainerStatus>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawContainerStatus {
    ready: bool,
    restart_count: u32,
    state: RawContainerState,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawContainerState {
    waiting: Option<RawWaiting>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawWaiting {
    reason: Option<String>,
}

impl From<RawPod> for PodInfo {
    fn from(raw: RawPod) -> Self {
        let statuses = &raw.status.container_statuses;
        let ready = !statuses.is_empty() && statuses.iter().all(|c| c.ready);
        let first = statuses.first();

        PodInfo {
            role: classify_pod_role(&raw.metadata.name),
            phase: raw
                .status
                .phase
                .as_deref()
                .map(PodPhase::from_phase)
                .unwrap_or(PodPhase::Unknown),
            ready,
            restart_count: first.map(|c| c.restart_count).unwrap_or(0),
            created_at: raw
                .metadata
                .creation_timestamp
                .as_deref()
                .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
                .map(|ts| ts.with_timezone(&Utc)),
            waiting_reason: first
                .and_then(|c| c.state.waiting.as_ref())
                .and_then(|w| w.reason.clone()),
            image: raw.spec.containers.first().and_then(|c| c.image.clone()),
            name: raw.metadata.name,
        }
    }
}

/// Parse the JSON document printed by `kubectl get pods -o json`
pub fn parse_pod_list(json: &str) -> Result<Vec<PodInfo>, serde_json::Error> {
    let list: RawPodList = serde_json::from_str(json)?;
    Ok(list
        .items
        .into_iter()
        .filter(|pod| !pod.metadata.name.is_empty())
        .map(PodInfo::from)
        .collect())
}
