//! Model readiness and its display projection

use std::fmt;

use serde::{Deserialize, Serialize};

/// Whether the deployment can serve inference requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmReadiness {
    /// Nothing conclusive observed yet
    Initializing,

    /// Pods are coming up, or the model is loaded but the API is not answering
    Starting,

    /// The API answers but lists no model, or the logs show a download/load
    LoadingModel,

    /// The API lists at least one model, or every pod is running and ready
    Ready,

    /// A pod or the inventory reported an error
    Failed,

    /// The API answered with something other than JSON
    ApiError,
}

impl LlmReadiness {
    /// Wire name, as serialized
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmReadiness::Initializing => "initializing",
            LlmReadiness::Starting => "starting",
            LlmReadiness::LoadingModel => "loading_model",
            LlmReadiness::Ready => "ready",
            LlmReadiness::Failed => "failed",
            LlmReadiness::ApiError => "api_error",
        }
    }

    /// Default human-readable text for the state
    pub fn detail(&self) -> &'static str {
        match self {
            LlmReadiness::Initializing => "Initializing",
            LlmReadiness::Starting => "Starting",
            LlmReadiness::LoadingModel => "Loading Model",
            LlmReadiness::Ready => "Ready",
            LlmReadiness::Failed => "Failed",
            LlmReadiness::ApiError => "API Error",
        }
    }

    pub fn ui_status(&self) -> UiStatus {
        UiStatus::from(*self)
    }
}

impl fmt::Display for LlmReadiness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.detail())
    }
}

/// Coarse status shown to users
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UiStatus {
    Pending,
    Active,
    Failed,
}

impl UiStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UiStatus::Pending => "pending",
            UiStatus::Active => "active",
            UiStatus::Failed => "failed",
        }
    }
}

/// The only mapping from readiness to display status: `active` exactly when
/// ready, `failed` exactly when failed.
impl From<LlmReadiness> for UiStatus {
    fn from(readiness: LlmReadiness) -> Self {
        match readiness {
            LlmReadiness::Ready => UiStatus::Active,
            LlmReadiness::Failed => UiStatus::Failed,
            _ => UiStatus::Pending,
        }
    }
}

impl fmt::Display for UiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Guess readiness from recent model-server log lines.
///
/// An approximation for when the API cannot be reached, checked in order:
/// a finished load means the server is still starting, a download or load in
/// progress means the model is loading, anything else is plain starting.
pub fn classify_logs(logs: &str) -> (LlmReadiness, &'static str) {
    let logs = logs.to_lowercase();
    if logs.contains("model loaded successfully") {
        (LlmReadiness::Starting, "Model Loaded, Service Starting")
    } else if logs.contains("loading model") || logs.contains("downloading") {
        (LlmReadiness::LoadingModel, "Downloading/Loading Model")
    } else {
        (LlmReadiness::Starting, LlmReadiness::Starting.detail())
    }
}
