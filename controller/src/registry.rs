//! Deployment registry: last known status per deployment id

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use crate::identity::DeploymentIdentity;
use crate::reconcile::{DeploymentStatus, Lifecycle};

/// In-memory map from deployment id to its last reconciled status
#[derive(Debug, Default)]
pub struct DeploymentRegistry {
    entries: RwLock<HashMap<String, DeploymentStatus>>,
    /// Ids removed after a completed delete. Always locked after `entries`.
    retired: RwLock<HashSet<String>>,
}

impl DeploymentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<DeploymentStatus> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(id).cloned()
    }

    /// Insert or overwrite a status
    pub fn put(&self, id: &str, status: DeploymentStatus) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(id.to_string(), status);
    }

    pub fn remove(&self, id: &str) -> Option<DeploymentStatus> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(id)
    }

    /// Drop a deleted record and refuse later refresh commits for its id
    /// until [`DeploymentRegistry::reinstate`] is called.
    pub fn retire(&self, id: &str) -> Option<DeploymentStatus> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let mut retired = self.retired.write().unwrap_or_else(|e| e.into_inner());
        retired.insert(id.to_string());
        entries.remove(id)
    }

    /// Accept refresh commits for a retired id again, e.g. once its release is reinstalled
    pub fn reinstate(&self, id: &str) -> bool {
        let mut retired = self.retired.write().unwrap_or_else(|e| e.into_inner());
        retired.remove(id)
    }

    pub fn is_retired(&self, id: &str) -> bool {
        let retired = self.retired.read().unwrap_or_else(|e| e.into_inner());
        retired.contains(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.contains_key(id)
    }

    /// Store a freshly reconciled status.
    ///
    /// The lifecycle of an existing record carries over, and so does its error
    /// text while a delete failure is on record. A record already marked
    /// [`Lifecycle::Deleted`] is left untouched and returned instead. A retired
    /// id is not stored at all; the status comes back marked deleted.
    pub fn commit_refresh(&self, mut status: DeploymentStatus) -> DeploymentStatus {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());

        if self
            .retired
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains(status.id())
        {
            status.lifecycle = Lifecycle::Deleted;
            return status;
        }

        if let Some(existing) = entries.get(status.id()) {
            if existing.lifecycle == Lifecycle::Deleted {
                return existing.clone();
            }
            status.lifecycle = existing.lifecycle;
            if existing.lifecycle == Lifecycle::DeleteFailed && status.error.is_none() {
                status.error = existing.error.clone();
            }
        }

        entries.insert(status.id().to_string(), status.clone());
        status
    }

    /// Change the lifecycle of a record, recording `error` when given.
    /// Returns the updated record, or `None` when the id is unknown.
    pub fn set_lifecycle(
        &self,
        id: &str,
        lifecycle: Lifecycle,
        error: Option<String>,
    ) -> Option<DeploymentStatus> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let entry = entries.get_mut(id)?;
        entry.lifecycle = lifecycle;
        if error.is_some() {
            entry.error = error;
        }
        Some(entry.clone())
    }

    /// Mark a deployment as being deleted, creating its record when missing.
    /// Returns false when a delete is already running or finished.
    pub fn begin_delete(&self, identity: &DeploymentIdentity) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let entry = entries
            .entry(identity.id.clone())
            .or_insert_with(|| DeploymentStatus::new(identity.clone()));
        if matches!(entry.lifecycle, Lifecycle::Deleting | Lifecycle::Deleted) {
            return false;
        }
        entry.lifecycle = Lifecycle::Deleting;
        true
    }

    /// Every status, optionally limited to one namespace, ordered by namespace then release
    pub fn list_all(&self, namespace: Option<&str>) -> Vec<DeploymentStatus> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let mut statuses: Vec<DeploymentStatus> = entries
            .values()
            .filter(|s| namespace.map_or(true, |ns| s.identity.namespace == ns))
            .cloned()
            .collect();
        statuses.sort_by(|a, b| {
            (a.identity.namespace.as_str(), a.identity.release_name.as_str())
                .cmp(&(b.identity.namespace.as_str(), b.identity.release_name.as_str()))
        });
        statuses
    }

    pub fn find_by_name(&self, namespace: &str, release_name: &str) -> Option<DeploymentStatus> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries
            .values()
            .find(|s| s.identity.namespace == namespace && s.identity.release_name == release_name)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
