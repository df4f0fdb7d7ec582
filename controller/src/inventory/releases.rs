//! Helm release listing

use serde::{Deserialize, Serialize};

/// One installed release as printed by `helm list -o json`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReleaseInfo {
    pub name: String,
    pub namespace: String,
    pub chart: String,
    pub app_version: String,
    pub status: String,
    /// Helm's own timestamp text, e.g. `2025-03-01 10:00:00.123 +0000 UTC`
    pub updated: String,
}

/// Whether a release looks like a serving stack this controller should track:
/// its chart mentions "vllm" or its name mentions "llm".
pub fn is_tracked_release(release: &ReleaseInfo) -> bool {
    release.chart.to_lowercase().contains("vllm") || release.name.to_lowercase().contains("llm")
}

/// Parse `helm list -o json`. Releases listed without a namespace inherit
/// `default_namespace` when one is given.
pub fn parse_release_list(
    json: &str,
    default_namespace: Option<&str>,
) -> Result<Vec<ReleaseInfo>, serde_json::Error> {
    if json.trim().is_empty() {
        return Ok(Vec::new());
    }
    let mut releases: Vec<ReleaseInfo> = serde_json::from_str(json)?;
    releases.retain(|r| !r.name.is_empty());
    if let Some(namespace) = default_namespace {
        for release in releases.iter_mut().filter(|r| r.namespace.is_empty()) {
            release.namespace = namespace.to_string();
        }
    }
    Ok(releases)
}
