//! Pod rollup: one coarse state for the pods of a deployment

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::inventory::{PodInfo, PodRole};

/// Combined state of a deployment's model and router pods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PodRollup {
    /// No pod name contains the release name
    NoPodsFound,

    /// Neither group is fully running
    Pending,

    /// Every model pod runs; the router pods do not, or there are none
    ModelReadyRouterPending,

    /// Every router pod runs; the model pods do not, or there are none
    RouterReadyModelPending,

    /// Both groups exist and every pod in them runs
    Running,
}

impl PodRollup {
    /// Wire name, as serialized
    pub fn as_str(&self) -> &'static str {
        match self {
            PodRollup::NoPodsFound => "no_pods_found",
            PodRollup::Pending => "pending",
            PodRollup::ModelReadyRouterPending => "model_ready_router_pending",
            PodRollup::RouterReadyModelPending => "router_ready_model_pending",
            PodRollup::Running => "running",
        }
    }

    /// Human-readable form
    pub fn label(&self) -> &'static str {
        match self {
            PodRollup::NoPodsFound => "No Pods Found",
            PodRollup::Pending => "Pending",
            PodRollup::ModelReadyRouterPending => "Model Ready (Router Pending)",
            PodRollup::RouterReadyModelPending => "Router Ready (Model Pending)",
            PodRollup::Running => "Running",
        }
    }

    /// Roll up an already filtered pod set
    pub fn compute(pods: &[PodInfo]) -> Self {
        if pods.is_empty() {
            return PodRollup::NoPodsFound;
        }
        match (
            group_running(pods, PodRole::Model),
            group_running(pods, PodRole::Router),
        ) {
            (true, true) => PodRollup::Running,
            (true, false) => PodRollup::ModelReadyRouterPending,
            (false, true) => PodRollup::RouterReadyModelPending,
            (false, false) => PodRollup::Pending,
        }
    }
}

impl fmt::Display for PodRollup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A role group counts as running when it has pods and all of them run
fn group_running(pods: &[PodInfo], role: PodRole) -> bool {
    let mut group = pods.iter().filter(|p| p.role == role).peekable();
    group.peek().is_some() && group.all(PodInfo::is_running)
}

/// Deployment membership: the pod name contains the release name.
///
/// This is a raw substring test, so release `demo` also claims the pods of
/// release `demo-v2`.
pub fn belongs_to_release(pod: &PodInfo, release_name: &str) -> bool {
    pod.name.contains(release_name)
}

pub fn filter_release_pods(pods: Vec<PodInfo>, release_name: &str) -> Vec<PodInfo> {
    pods.into_iter()
        .filter(|p| belongs_to_release(p, release_name))
        .collect()
}

/// Every pod runs and every container reports ready
pub fn all_pods_ready(pods: &[PodInfo]) -> bool {
    !pods.is_empty() && pods.iter().all(|p| p.is_running() && p.ready)
}

pub fn earliest_creation(pods: &[PodInfo]) -> Option<DateTime<Utc>> {
    pods.iter().filter_map(|p| p.created_at).min()
}

/// Whether a rollup or a piece of error text signals a hard failure
pub fn signals_failure(text: &str) -> bool {
    let text = text.to_lowercase();
    text.contains("error") || text.contains("failed")
}
