//! kubectl-backed cluster inventory

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::errors::ControllerError;
use crate::exec::{CommandRunner, CommandSpec};
use crate::inventory::pods::parse_pod_list;
use crate::inventory::service::parse_service;
use crate::inventory::{ClusterInventory, LogTarget, PodInfo, ServiceInfo};

/// Inventory client that shells out to `kubectl`
pub struct Kubectl {
    runner: Arc<dyn CommandRunner>,
    bin: String,
    timeout: Duration,
}

impl Kubectl {
    pub fn new(runner: Arc<dyn CommandRunner>, bin: impl Into<String>, timeout: Duration) -> Self {
        Self {
            runner,
            bin: bin.into(),
            timeout,
        }
    }

    fn command(&self) -> CommandSpec {
        CommandSpec::new(&self.bin)
    }
}

#[async_trait]
impl ClusterInventory for Kubectl {
    async fn list_pods(&self, namespace: &str) -> Result<Vec<PodInfo>, ControllerError> {
        let cmd = self
            .command()
            .args(["get", "pods", "-n", namespace, "-o", "json"]);
        let out = self.runner.execute(&cmd, self.timeout).await;

        if !out.success() {
            return Err(ControllerError::InventoryError(format!(
                "kubectl get pods failed in namespace {}: {}",
                namespace,
                out.failure_summary()
            )));
        }

        parse_pod_list(&out.stdout).map_err(|e| {
            ControllerError::InventoryError(format!(
                "unparseable pod listing for namespace {}: {}",
                namespace, e
            ))
        })
    }

    async fn get_service(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ServiceInfo>, ControllerError> {
        let cmd = self
            .command()
            .args(["get", "service", name, "-n", namespace, "-o", "json"]);
        let out = self.runner.execute(&cmd, self.timeout).await;

        if !out.success() {
            debug!(namespace, service = name, "Service not readable: {}", out.failure_summary());
            return Ok(None);
        }

        Ok(Some(parse_service(&out.stdout)?))
    }

    async fn recent_logs(
        &self,
        namespace: &str,
        target: &LogTarget,
        tail_lines: u32,
    ) -> Result<String, ControllerError> {
        let cmd = self
            .command()
            .args(["logs", "-n", namespace])
            .args(target.to_args())
            .arg(format!("--tail={}", tail_lines));
        let out = self.runner.execute(&cmd, self.timeout).await;

        if !out.success() {
            return Err(ControllerError::CommandError(format!(
                "kubectl logs failed: {}",
                out.failure_summary()
            )));
        }
        Ok(out.stdout)
    }
}
