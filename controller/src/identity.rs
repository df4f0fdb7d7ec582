//! Stable deployment identities
//!
//! A deployment id is a UUIDv5 over the DNS namespace and `"{namespace}:{release}"`,
//! so a restarted controller derives the same ids from the installed releases
//! without any persisted state.

use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::errors::ControllerError;
use crate::inventory::{is_tracked_release, ReleaseInfo};

/// Deterministic id for a release
pub fn deployment_id(namespace: &str, release_name: &str) -> String {
    let key = format!("{}:{}", namespace, release_name);
    Uuid::new_v5(&Uuid::NAMESPACE_DNS, key.as_bytes()).to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeploymentIdentity {
    pub namespace: String,
    pub release_name: String,
    pub id: String,
}

impl DeploymentIdentity {
    /// Build the identity of a release. Rejects coordinates that cannot name a
    /// Kubernetes object, since the id would otherwise collide or be meaningless.
    pub fn resolve(namespace: &str, release_name: &str) -> Result<Self, ControllerError> {
        validate_coordinate("namespace", namespace)?;
        validate_coordinate("release name", release_name)?;
        Ok(Self {
            namespace: namespace.to_string(),
            release_name: release_name.to_string(),
            id: deployment_id(namespace, release_name),
        })
    }

    /// Cluster-internal DNS name of the router service
    pub fn service_url(&self) -> String {
        format!(
            "{}-router-service.{}.svc.cluster.local",
            self.release_name, self.namespace
        )
    }

    pub fn router_service_name(&self) -> String {
        format!("{}-router-service", self.release_name)
    }
}

impl fmt::Display for DeploymentIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ({})", self.namespace, self.release_name, self.id)
    }
}

fn validate_coordinate(what: &str, value: &str) -> Result<(), ControllerError> {
    if value.is_empty() {
        return Err(ControllerError::InvalidIdentity(format!("{} is empty", what)));
    }
    if value
        .chars()
        .any(|c| c.is_whitespace() || c == ':' || c == '/')
    {
        return Err(ControllerError::InvalidIdentity(format!(
            "{} '{}' contains whitespace, ':' or '/'",
            what, value
        )));
    }
    Ok(())
}

/// Id → identity map, rebuilt from the release inventory on startup
#[derive(Debug, Default)]
pub struct IdentityRegistry {
    identities: RwLock<HashMap<String, DeploymentIdentity>>,
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve and remember an identity
    pub fn resolve(
        &self,
        namespace: &str,
        release_name: &str,
    ) -> Result<DeploymentIdentity, ControllerError> {
        let identity = DeploymentIdentity::resolve(namespace, release_name)?;
        self.insert(identity.clone());
        Ok(identity)
    }

    pub fn insert(&self, identity: DeploymentIdentity) {
        let mut identities = self.identities.write().unwrap_or_else(|e| e.into_inner());
        identities.insert(identity.id.clone(), identity);
    }

    pub fn lookup(&self, id: &str) -> Option<DeploymentIdentity> {
        let identities = self.identities.read().unwrap_or_else(|e| e.into_inner());
        identities.get(id).cloned()
    }

    pub fn forget(&self, id: &str) -> Option<DeploymentIdentity> {
        let mut identities = self.identities.write().unwrap_or_else(|e| e.into_inner());
        identities.remove(id)
    }

    /// Remember every tracked release and return their identities.
    /// Releases with unusable coordinates are skipped.
    pub fn warm_start(&self, releases: &[ReleaseInfo]) -> Vec<DeploymentIdentity> {
        releases
            .iter()
            .filter(|release| is_tracked_release(release))
            .filter_map(|release| match self.resolve(&release.namespace, &release.name) {
                Ok(identity) => Some(identity),
                Err(e) => {
                    debug!("Skipping release {}: {}", release.name, e);
                    None
                }
            })
            .collect()
    }

    /// All known identities, ordered by namespace then release
    pub fn all(&self) -> Vec<DeploymentIdentity> {
        let identities = self.identities.read().unwrap_or_else(|e| e.into_inner());
        let mut all: Vec<DeploymentIdentity> = identities.values().cloned().collect();
        all.sort_by(|a, b| {
            (a.namespace.as_str(), a.release_name.as_str())
                .cmp(&(b.namespace.as_str(), b.release_name.as_str()))
        });
        all
    }

    pub fn len(&self) -> usize {
        self.identities.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
