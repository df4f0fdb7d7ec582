//! Deployment service: the operations the API and workers call
//!
//! Wraps the reconciler with identity lookup, release discovery, per-pod views
//! and the uninstall workflow.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{error, info, warn};
use vllm_controller_api::DeploymentLogLine;

use crate::errors::ControllerError;
use crate::identity::{DeploymentIdentity, IdentityRegistry};
use crate::inventory::{is_tracked_release, LogTarget, PodInfo, ReleaseInventory};
use crate::reconcile::rollup::filter_release_pods;
use crate::reconcile::{DeploymentStatus, Lifecycle, PodRollup, Reconciler};
use crate::registry::DeploymentRegistry;

/// Log lines returned when the caller does not ask for a count
pub const DEFAULT_LOG_TAIL: u32 = 100;

#[derive(Debug, Clone)]
pub struct DeploymentServiceOptions {
    /// How long a deleted record stays visible before it is dropped
    pub delete_grace: Duration,
}

impl Default for DeploymentServiceOptions {
    fn default() -> Self {
        Self {
            delete_grace: Duration::from_secs(5),
        }
    }
}

pub struct DeploymentService {
    identities: Arc<IdentityRegistry>,
    reconciler: Arc<Reconciler>,
    releases: Arc<dyn ReleaseInventory>,
    options: DeploymentServiceOptions,
}

impl DeploymentService {
    pub fn new(
        identities: Arc<IdentityRegistry>,
        reconciler: Arc<Reconciler>,
        releases: Arc<dyn ReleaseInventory>,
        options: DeploymentServiceOptions,
    ) -> Self {
        Self {
            identities,
            reconciler,
            releases,
            options,
        }
    }

    fn registry(&self) -> &Arc<DeploymentRegistry> {
        self.reconciler.registry()
    }

    /// Refresh a tracked deployment by id
    pub async fn refresh(&self, id: &str) -> Result<DeploymentStatus, ControllerError> {
        let identity = self.identity_for(id).await?;
        Ok(self.refresh_identity(&identity).await)
    }

    pub async fn refresh_identity(&self, identity: &DeploymentIdentity) -> DeploymentStatus {
        self.reconciler.refresh(identity).await
    }

    pub fn get_status(&self, id: &str) -> Option<DeploymentStatus> {
        self.registry().get(id)
    }

    pub fn list_statuses(&self, namespace: Option<&str>) -> Vec<DeploymentStatus> {
        self.registry().list_all(namespace)
    }

    /// Identities the poller should keep fresh
    pub fn tracked_identities(&self) -> Vec<DeploymentIdentity> {
        self.identities.all()
    }

    /// Start tracking serving releases that are installed but not yet known.
    /// Returns the statuses of the newly tracked deployments.
    pub async fn discover(
        &self,
        namespace: Option<&str>,
    ) -> Result<Vec<DeploymentStatus>, ControllerError> {
        let releases = self.releases.list_releases(namespace).await?;

        let mut fresh = Vec::new();
        for release in releases.iter().filter(|r| is_tracked_release(r)) {
            match self.identities.resolve(&release.namespace, &release.name) {
                Ok(identity) if !self.registry().contains(&identity.id) => {
                    self.registry().reinstate(&identity.id);
                    fresh.push(identity)
                }
                Ok(_) => {}
                Err(e) => warn!("Ignoring release {}: {}", release.name, e),
            }
        }

        if !fresh.is_empty() {
            info!("Discovered {} untracked deployments", fresh.len());
        }
        Ok(join_all(fresh.iter().map(|identity| self.reconciler.refresh(identity))).await)
    }

    /// Status of a release by name, tracking it on first sight.
    ///
    /// A name is only tracked when a release of that name is installed or pods
    /// matching it exist; anything else is `NotFound` and leaves no trace.
    pub async fn get_by_name(
        &self,
        namespace: &str,
        release_name: &str,
    ) -> Result<DeploymentStatus, ControllerError> {
        if let Some(status) = self.registry().find_by_name(namespace, release_name) {
            return Ok(status);
        }
        let identity = DeploymentIdentity::resolve(namespace, release_name)?;

        if !self.release_installed(&identity).await {
            let observed = self.reconciler.observe(&identity).await;
            if observed.pod_rollup == PodRollup::NoPodsFound {
                return Err(ControllerError::NotFound(format!(
                    "no release or pods named {} in namespace {}",
                    release_name, namespace
                )));
            }
        }

        self.identities.insert(identity.clone());
        self.registry().reinstate(&identity.id);
        Ok(self.refresh_identity(&identity).await)
    }

    async fn release_installed(&self, identity: &DeploymentIdentity) -> bool {
        match self.releases.list_releases(Some(&identity.namespace)).await {
            Ok(releases) => releases.iter().any(|r| r.name == identity.release_name),
            Err(e) => {
                warn!(namespace = %identity.namespace, "Release listing failed: {}", e);
                false
            }
        }
    }

    /// Rebuild the identity map from every installed release and refresh each
    /// tracked deployment. Returns how many deployments are tracked.
    pub async fn warm_start(&self) -> Result<usize, ControllerError> {
        let releases = self.releases.list_releases(None).await?;
        let identities = self.identities.warm_start(&releases);
        for identity in &identities {
            self.registry().reinstate(&identity.id);
        }

        join_all(identities.iter().map(|identity| self.reconciler.refresh(identity))).await;
        info!("Warm start tracked {} deployments", identities.len());
        Ok(identities.len())
    }

    /// Current member pods of a deployment
    pub async fn pods(&self, id: &str) -> Result<Vec<PodInfo>, ControllerError> {
        let identity = self.identity_for(id).await?;
        self.member_pods(&identity).await
    }

    async fn member_pods(
        &self,
        identity: &DeploymentIdentity,
    ) -> Result<Vec<PodInfo>, ControllerError> {
        let pods = self
            .reconciler
            .inventory()
            .list_pods(&identity.namespace)
            .await?;
        Ok(filter_release_pods(pods, &identity.release_name))
    }

    /// Recent log lines of every member pod, tagged with the pod name.
    /// Pods whose logs cannot be read are skipped.
    pub async fn logs(
        &self,
        id: &str,
        tail: Option<u32>,
    ) -> Result<Vec<DeploymentLogLine>, ControllerError> {
        let identity = self.identity_for(id).await?;
        let pods = self.member_pods(&identity).await?;
        if pods.is_empty() {
            return Err(ControllerError::NotFound(format!(
                "no pods found for {}",
                identity.release_name
            )));
        }

        let tail = tail.unwrap_or(DEFAULT_LOG_TAIL);
        let inventory = self.reconciler.inventory();
        let fetches = pods.iter().map(|pod| {
            let target = LogTarget::Pod(pod.name.clone());
            let namespace = identity.namespace.as_str();
            async move { (pod, inventory.recent_logs(namespace, &target, tail).await) }
        });

        let mut lines = Vec::new();
        for (pod, result) in join_all(fetches).await {
            match result {
                Ok(text) => lines.extend(text.lines().filter(|l| !l.is_empty()).map(|l| {
                    DeploymentLogLine {
                        pod_name: pod.name.clone(),
                        log: l.to_string(),
                    }
                })),
                Err(e) => warn!(pod = %pod.name, "Skipping pod logs: {}", e),
            }
        }
        Ok(lines)
    }

    /// Start uninstalling a deployment and return at once.
    ///
    /// The record moves to `deleting`, then `deleted` followed by removal after
    /// the grace delay, or `delete_failed` with the error text.
    pub async fn delete(&self, id: &str) -> Result<DeploymentIdentity, ControllerError> {
        let identity = self.identity_for(id).await?;
        let registry = self.registry().clone();

        if !registry.begin_delete(&identity) {
            info!(release = %identity.release_name, "Delete already in progress");
            return Ok(identity);
        }

        let releases = self.releases.clone();
        let identities = self.identities.clone();
        let reconciler = self.reconciler.clone();
        let grace = self.options.delete_grace;
        let target = identity.clone();

        tokio::spawn(async move {
            match releases.uninstall(&target.namespace, &target.release_name).await {
                Ok(()) => {
                    registry.set_lifecycle(&target.id, Lifecycle::Deleted, None);
                    tokio::time::sleep(grace).await;
                    info!(release = %target.release_name, "Removing deleted deployment");
                    registry.retire(&target.id);
                    identities.forget(&target.id);
                    reconciler.forget(&target.id);
                }
                Err(e) => {
                    error!(release = %target.release_name, "Deletion failed: {}", e);
                    registry.set_lifecycle(&target.id, Lifecycle::DeleteFailed, Some(e.to_string()));
                }
            }
        });

        Ok(identity)
    }

    /// Identity of a tracked id, rebuilding the identity map once on a miss
    async fn identity_for(&self, id: &str) -> Result<DeploymentIdentity, ControllerError> {
        if let Some(identity) = self.identities.lookup(id) {
            return Ok(identity);
        }

        match self.releases.list_releases(None).await {
            Ok(releases) => {
                for identity in self.identities.warm_start(&releases) {
                    self.registry().reinstate(&identity.id);
                }
            }
            Err(e) => warn!("Release listing failed while resolving {}: {}", id, e),
        }

        self.identities
            .lookup(id)
            .ok_or_else(|| ControllerError::NotFound(format!("deployment {}", id)))
    }
}
