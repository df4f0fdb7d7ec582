//! Deployment readiness reconciliation

pub mod readiness;
pub mod reconciler;
pub mod rollup;
pub mod status;

pub use readiness::{classify_logs, LlmReadiness, UiStatus};
pub use reconciler::Reconciler;
pub use rollup::PodRollup;
pub use status::{DeploymentStatus, Lifecycle};
