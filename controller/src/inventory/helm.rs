//! helm-backed release inventory

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use crate::errors::ControllerError;
use crate::exec::{CommandRunner, CommandSpec};
use crate::inventory::releases::parse_release_list;
use crate::inventory::{ReleaseInfo, ReleaseInventory};

pub struct Helm {
    runner: Arc<dyn CommandRunner>,
    bin: String,
    query_timeout: Duration,
    /// Uninstalls wait for resources to be torn down
    bulk_timeout: Duration,
}

impl Helm {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        bin: impl Into<String>,
        query_timeout: Duration,
        bulk_timeout: Duration,
    ) -> Self {
        Self {
            runner,
            bin: bin.into(),
            query_timeout,
            bulk_timeout,
        }
    }
}

#[async_trait]
impl ReleaseInventory for Helm {
    async fn list_releases(
        &self,
        namespace: Option<&str>,
    ) -> Result<Vec<ReleaseInfo>, ControllerError> {
        let cmd = match namespace {
            Some(ns) => CommandSpec::new(&self.bin).args(["list", "-n", ns, "-o", "json"]),
            None => CommandSpec::new(&self.bin).args(["list", "--all-namespaces", "-o", "json"]),
        };
        let out = self.runner.execute(&cmd, self.query_timeout).await;

        if !out.success() {
            return Err(ControllerError::InventoryError(format!(
                "helm list failed: {}",
                out.failure_summary()
            )));
        }

        parse_release_list(&out.stdout, namespace).map_err(|e| {
            ControllerError::InventoryError(format!("unparseable helm release listing: {}", e))
        })
    }

    async fn uninstall(&self, namespace: &str, release_name: &str) -> Result<(), ControllerError> {
        let cmd = CommandSpec::new(&self.bin).args(["uninstall", release_name, "-n", namespace]);
        let out = self.runner.execute(&cmd, self.bulk_timeout).await;

        if !out.success() {
            return Err(ControllerError::CommandError(format!(
                "helm uninstall {} failed: {}",
                release_name,
                out.failure_summary()
            )));
        }

        info!(namespace, release = release_name, "Release uninstalled");
        Ok(())
    }
}
