//! Cluster inventory: pods, services, logs, model probes and Helm releases
//!
//! Each external signal sits behind its own trait so the reconciler can be driven
//! by in-memory fakes. The production implementations shell out through a
//! [`CommandRunner`](crate::exec::CommandRunner).

pub mod helm;
pub mod kubectl;
pub mod pods;
pub mod probe;
pub mod releases;
pub mod service;

use async_trait::async_trait;

use crate::errors::ControllerError;

pub use helm::Helm;
pub use kubectl::Kubectl;
pub use pods::{classify_pod_role, PodInfo, PodPhase, PodRole};
pub use probe::{ExecProbe, HttpProbe, ProbeOutcome, ProbeRequest};
pub use releases::{is_tracked_release, ReleaseInfo};
pub use service::{ServiceInfo, ServiceType};

/// Something `kubectl exec` can enter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecTarget {
    /// A pod by name
    Pod(String),
    /// A workload reference such as `deploy/demo-deployment-router`
    Resource(String),
}

impl ExecTarget {
    pub fn as_arg(&self) -> &str {
        match self {
            ExecTarget::Pod(name) | ExecTarget::Resource(name) => name,
        }
    }
}

/// Where `kubectl logs` reads from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Pod(String),
    /// A label selector such as `app.kubernetes.io/instance=demo`
    Selector(String),
}

impl LogTarget {
    pub fn to_args(&self) -> Vec<String> {
        match self {
            LogTarget::Pod(name) => vec![name.clone()],
            LogTarget::Selector(selector) => vec!["-l".to_string(), selector.clone()],
        }
    }
}

/// Pod, service and log queries for one cluster
#[async_trait]
pub trait ClusterInventory: Send + Sync {
    /// All pods in a namespace
    async fn list_pods(&self, namespace: &str) -> Result<Vec<PodInfo>, ControllerError>;

    /// A service by name. `Ok(None)` when it does not exist or cannot be read.
    async fn get_service(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ServiceInfo>, ControllerError>;

    /// The last `tail_lines` log lines of a pod or selector
    async fn recent_logs(
        &self,
        namespace: &str,
        target: &LogTarget,
        tail_lines: u32,
    ) -> Result<String, ControllerError>;
}

/// Asks a running router which models it serves
#[async_trait]
pub trait ModelProbe: Send + Sync {
    async fn list_models(&self, request: &ProbeRequest) -> ProbeOutcome;
}

/// Installed releases, used to rebuild identities after a restart
#[async_trait]
pub trait ReleaseInventory: Send + Sync {
    /// Releases in one namespace, or in all namespaces when `None`
    async fn list_releases(
        &self,
        namespace: Option<&str>,
    ) -> Result<Vec<ReleaseInfo>, ControllerError>;

    /// Uninstall a release and wait for the command to finish
    async fn uninstall(&self, namespace: &str, release_name: &str) -> Result<(), ControllerError>;
}
