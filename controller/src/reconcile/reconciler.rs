//! Deployment state reconciler
//!
//! Turns pod listings, the router service, a model-listing probe and, as a last
//! resort, recent model-server logs into one [`DeploymentStatus`]. Every external
//! failure degrades the result instead of aborting the refresh.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::identity::DeploymentIdentity;
use crate::inventory::{
    ClusterInventory, ExecTarget, LogTarget, ModelProbe, PodInfo, PodRole, ProbeOutcome,
    ProbeRequest,
};
use crate::reconcile::readiness::{classify_logs, LlmReadiness};
use crate::reconcile::rollup::{
    all_pods_ready, earliest_creation, filter_release_pods, signals_failure, PodRollup,
};
use crate::reconcile::status::DeploymentStatus;
use crate::registry::DeploymentRegistry;

/// Default number of log lines read by the log fallback
pub const DEFAULT_LOG_TAIL_LINES: u32 = 50;

pub struct Reconciler {
    inventory: Arc<dyn ClusterInventory>,
    probe: Arc<dyn ModelProbe>,
    registry: Arc<DeploymentRegistry>,
    log_tail_lines: u32,
    /// One async lock per deployment id so refreshes of one deployment never overlap
    in_flight: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl Reconciler {
    pub fn new(
        inventory: Arc<dyn ClusterInventory>,
        probe: Arc<dyn ModelProbe>,
        registry: Arc<DeploymentRegistry>,
    ) -> Self {
        Self {
            inventory,
            probe,
            registry,
            log_tail_lines: DEFAULT_LOG_TAIL_LINES,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_log_tail_lines(mut self, lines: u32) -> Self {
        self.log_tail_lines = lines;
        self
    }

    pub fn registry(&self) -> &Arc<DeploymentRegistry> {
        &self.registry
    }

    pub fn inventory(&self) -> &Arc<dyn ClusterInventory> {
        &self.inventory
    }

    /// Recompute the status of a deployment and store it in the registry.
    ///
    /// Concurrent calls for the same id are serialized. Dropping the returned
    /// future before it completes leaves the registry untouched.
    pub async fn refresh(&self, identity: &DeploymentIdentity) -> DeploymentStatus {
        let flight = self.flight_lock(&identity.id);
        let _guard = flight.lock().await;

        let previous = self.registry.get(&identity.id).map(|s| s.llm_readiness());
        let status = self.observe(identity).await;
        let status = self.registry.commit_refresh(status);

        if previous != Some(status.llm_readiness()) {
            info!(
                namespace = %identity.namespace,
                release = %identity.release_name,
                rollup = %status.pod_rollup,
                ui_status = %status.ui_status(),
                "Deployment readiness is now {}",
                status.llm_readiness()
            );
        }
        status
    }

    /// Compute a status without touching the registry
    pub async fn observe(&self, identity: &DeploymentIdentity) -> DeploymentStatus {
        let mut status = DeploymentStatus::new(identity.clone());
        let mut known_errors: Vec<String> = Vec::new();

        let service_name = identity.router_service_name();
        let (pods, service) = tokio::join!(
            self.inventory.list_pods(&identity.namespace),
            self.inventory.get_service(&identity.namespace, &service_name),
        );

        match service {
            Ok(Some(service)) => {
                status.external_address = service.external_address;
                status.public_url = service.public_url;
            }
            Ok(None) => debug!(service = %service_name, "Router service not found"),
            Err(e) => warn!(service = %service_name, "Failed to read router service: {}", e),
        }

        let pods = match pods {
            Ok(pods) => filter_release_pods(pods, &identity.release_name),
            Err(e) => {
                warn!(namespace = %identity.namespace, "Pod listing failed: {}", e);
                known_errors.push(e.to_string());
                Vec::new()
            }
        };
        known_errors.extend(pods.iter().filter_map(|p| p.waiting_reason.clone()));

        status.pod_rollup = PodRollup::compute(&pods);
        status.created_at = earliest_creation(&pods);
        status.error = known_errors.iter().find(|t| signals_failure(t)).cloned();
        status.pods = pods;

        self.resolve_readiness(identity, &mut status, &known_errors).await;

        status.last_refreshed_at = Utc::now();
        status
    }

    async fn resolve_readiness(
        &self,
        identity: &DeploymentIdentity,
        status: &mut DeploymentStatus,
        known_errors: &[String],
    ) {
        if all_pods_ready(&status.pods) {
            status.set_readiness(LlmReadiness::Ready);
            return;
        }

        if status.pod_rollup != PodRollup::Running {
            let failed = signals_failure(status.pod_rollup.label())
                || known_errors.iter().any(|t| signals_failure(t));
            status.set_readiness(if failed {
                LlmReadiness::Failed
            } else {
                LlmReadiness::Starting
            });
            return;
        }

        let request = ProbeRequest {
            namespace: identity.namespace.clone(),
            release_name: identity.release_name.clone(),
            target: router_exec_target(&status.pods, &identity.release_name),
        };
        match self.probe.list_models(&request).await {
            ProbeOutcome::Listed(models) if !models.is_empty() => {
                status.available_models = models;
                status.set_readiness(LlmReadiness::Ready);
                return;
            }
            ProbeOutcome::Listed(_) => {
                status.set_readiness(LlmReadiness::LoadingModel);
                return;
            }
            ProbeOutcome::Unparseable => {
                status.set_readiness(LlmReadiness::ApiError);
                return;
            }
            ProbeOutcome::Unreachable(reason) => {
                debug!(target_ref = %request.target.as_arg(), "Model probe failed: {}", reason);
            }
        }

        let target = model_log_target(&status.pods, &identity.release_name);
        match self
            .inventory
            .recent_logs(&identity.namespace, &target, self.log_tail_lines)
            .await
        {
            Ok(logs) => {
                let (readiness, detail) = classify_logs(&logs);
                status.set_readiness_with_detail(readiness, detail);
            }
            Err(e) => debug!("Log fallback failed, readiness stays unknown: {}", e),
        }
    }

    fn flight_lock(&self, id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        in_flight.entry(id.to_string()).or_default().clone()
    }

    /// Drop the refresh lock of a deployment that is no longer tracked
    pub fn forget(&self, id: &str) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        in_flight.remove(id);
    }
}

/// First running router pod, else the conventional router deployment
fn router_exec_target(pods: &[PodInfo], release_name: &str) -> ExecTarget {
    pods.iter()
        .find(|p| p.role == PodRole::Router && p.is_running())
        .map(|p| ExecTarget::Pod(p.name.clone()))
        .unwrap_or_else(|| ExecTarget::Resource(format!("deploy/{}-deployment-router", release_name)))
}

/// First running model pod, else every pod of the release instance
fn model_log_target(pods: &[PodInfo], release_name: &str) -> LogTarget {
    pods.iter()
        .find(|p| p.role == PodRole::Model && p.is_running())
        .map(|p| LogTarget::Pod(p.name.clone()))
        .unwrap_or_else(|| {
            LogTarget::Selector(format!("app.kubernetes.io/instance={}", release_name))
        })
}
