//! Deployment counts for the telemetry endpoint

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use vllm_controller_api::SummaryResponse;

use crate::reconcile::{DeploymentStatus, UiStatus};

/// Tracked deployments counted by display status and namespace
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentSummary {
    pub total: usize,
    pub active: usize,
    pub pending: usize,
    pub failed: usize,
    pub by_namespace: BTreeMap<String, usize>,
}

impl DeploymentSummary {
    pub fn collect<'a>(statuses: impl IntoIterator<Item = &'a DeploymentStatus>) -> Self {
        let mut summary = Self::default();
        for status in statuses {
            summary.total += 1;
            match status.ui_status() {
                UiStatus::Active => summary.active += 1,
                UiStatus::Pending => summary.pending += 1,
                UiStatus::Failed => summary.failed += 1,
            }
            *summary
                .by_namespace
                .entry(status.identity.namespace.clone())
                .or_default() += 1;
        }
        summary
    }
}

impl From<DeploymentSummary> for SummaryResponse {
    fn from(summary: DeploymentSummary) -> Self {
        SummaryResponse {
            total: summary.total,
            active: summary.active,
            pending: summary.pending,
            failed: summary.failed,
            by_namespace: summary.by_namespace,
        }
    }
}
