//! Application state management

use std::sync::Arc;

use tracing::info;

use crate::app::options::{AppOptions, ClusterOptions};
use crate::errors::ControllerError;
use crate::exec::{CommandRunner, ProcessRunner};
use crate::identity::IdentityRegistry;
use crate::inventory::{
    ClusterInventory, ExecProbe, Helm, HttpProbe, Kubectl, ModelProbe, ReleaseInventory,
};
use crate::reconcile::Reconciler;
use crate::registry::DeploymentRegistry;
use crate::services::DeploymentService;
use crate::storage::settings::ProbeMode;

/// Main application state
pub struct AppState {
    /// Known deployment identities
    pub identities: Arc<IdentityRegistry>,

    /// Last observed status per deployment
    pub registry: Arc<DeploymentRegistry>,

    pub reconciler: Arc<Reconciler>,

    /// Operations shared by the API and the workers
    pub deployments: Arc<DeploymentService>,
}

impl AppState {
    /// Initialize application state against the real cluster tools
    pub fn init(options: &AppOptions) -> Result<Self, ControllerError> {
        info!("Initializing application state...");

        let runner: Arc<dyn CommandRunner> = Arc::new(ProcessRunner::new());
        let cluster = &options.cluster;

        let inventory: Arc<dyn ClusterInventory> = Arc::new(Kubectl::new(
            runner.clone(),
            cluster.kubectl_bin.clone(),
            cluster.query_timeout,
        ));
        let releases: Arc<dyn ReleaseInventory> = Arc::new(Helm::new(
            runner.clone(),
            cluster.helm_bin.clone(),
            cluster.query_timeout,
            cluster.bulk_timeout,
        ));
        let probe = build_probe(cluster, runner)?;

        Ok(Self::with_backends(options, inventory, probe, releases))
    }

    /// Assemble the state around already-built backends
    pub fn with_backends(
        options: &AppOptions,
        inventory: Arc<dyn ClusterInventory>,
        probe: Arc<dyn ModelProbe>,
        releases: Arc<dyn ReleaseInventory>,
    ) -> Self {
        let identities = Arc::new(IdentityRegistry::new());
        let registry = Arc::new(DeploymentRegistry::new());
        let reconciler = Arc::new(
            Reconciler::new(inventory, probe, registry.clone())
                .with_log_tail_lines(options.log_tail_lines),
        );
        let deployments = Arc::new(DeploymentService::new(
            identities.clone(),
            reconciler.clone(),
            releases,
            options.deployments.clone(),
        ));

        Self {
            identities,
            registry,
            reconciler,
            deployments,
        }
    }
}

fn build_probe(
    cluster: &ClusterOptions,
    runner: Arc<dyn CommandRunner>,
) -> Result<Arc<dyn ModelProbe>, ControllerError> {
    match cluster.probe_mode {
        ProbeMode::Exec => {
            info!("Model probe: kubectl exec into the router");
            Ok(Arc::new(ExecProbe::new(
                runner,
                cluster.kubectl_bin.clone(),
                cluster.router_port,
                cluster.probe_timeout,
            )))
        }
        ProbeMode::Http => {
            info!("Model probe: direct HTTP to the router service");
            Ok(Arc::new(HttpProbe::new(
                cluster.router_port,
                cluster.probe_timeout,
            )?))
        }
    }
}
