//! Deployment operations shared by the HTTP API and the workers

pub mod deployments;

pub use deployments::{DeploymentService, DeploymentServiceOptions};
