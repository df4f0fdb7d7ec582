//! Server state

use std::sync::Arc;

use crate::services::DeploymentService;

/// Server state shared across handlers
pub struct ServerState {
    pub deployments: Arc<DeploymentService>,
}

impl ServerState {
    pub fn new(deployments: Arc<DeploymentService>) -> Self {
        Self { deployments }
    }
}
