//! The reconciled view of one deployment

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::DeploymentIdentity;
use crate::inventory::PodInfo;
use crate::reconcile::readiness::{LlmReadiness, UiStatus};
use crate::reconcile::rollup::PodRollup;

/// Where a tracked deployment is in its own lifecycle, independent of readiness
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    #[default]
    Active,
    /// An uninstall is running
    Deleting,
    /// The uninstall finished; the record is about to be dropped
    Deleted,
    /// The uninstall failed; see `error`
    DeleteFailed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentStatus {
    #[serde(flatten)]
    pub identity: DeploymentIdentity,

    pub pod_rollup: PodRollup,

    llm_readiness: LlmReadiness,

    /// Always the projection of `llm_readiness`
    ui_status: UiStatus,

    /// Human-readable readiness text
    pub detail: String,

    pub external_address: Option<String>,
    pub public_url: Option<String>,

    /// Cluster-internal address of the router service
    pub service_url: String,

    /// Model ids listed by the router, when it answered
    pub available_models: Vec<String>,

    /// Pods counted as members of the deployment
    pub pods: Vec<PodInfo>,

    /// First error text seen while reconciling or deleting
    pub error: Option<String>,

    /// Earliest creation time among the member pods
    pub created_at: Option<DateTime<Utc>>,

    pub last_refreshed_at: DateTime<Utc>,

    #[serde(default)]
    pub lifecycle: Lifecycle,
}

impl DeploymentStatus {
    pub fn new(identity: DeploymentIdentity) -> Self {
        Self {
            service_url: identity.service_url(),
            identity,
            pod_rollup: PodRollup::NoPodsFound,
            llm_readiness: LlmReadiness::Initializing,
            ui_status: UiStatus::Pending,
            detail: LlmReadiness::Initializing.detail().to_string(),
            external_address: None,
            public_url: None,
            available_models: Vec::new(),
            pods: Vec::new(),
            error: None,
            created_at: None,
            last_refreshed_at: Utc::now(),
            lifecycle: Lifecycle::Active,
        }
    }

    pub fn id(&self) -> &str {
        &self.identity.id
    }

    pub fn llm_readiness(&self) -> LlmReadiness {
        self.llm_readiness
    }

    pub fn ui_status(&self) -> UiStatus {
        self.ui_status
    }

    pub fn is_ready(&self) -> bool {
        self.llm_readiness == LlmReadiness::Ready
    }

    /// Set readiness with its default detail text
    pub fn set_readiness(&mut self, readiness: LlmReadiness) {
        self.set_readiness_with_detail(readiness, readiness.detail());
    }

    /// Set readiness and detail; the display status follows
    pub fn set_readiness_with_detail(&mut self, readiness: LlmReadiness, detail: impl Into<String>) {
        self.llm_readiness = readiness;
        self.ui_status = UiStatus::from(readiness);
        self.detail = detail.into();
    }
}
