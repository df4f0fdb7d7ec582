//! Settings file management

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::ControllerError;
use crate::logs::LogLevel;

/// Controller settings, read from a JSON file. Every field has a default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Emit JSON log lines
    #[serde(default)]
    pub log_json: bool,

    /// Directory for daily log files; stdout only when absent
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// HTTP API listener
    #[serde(default)]
    pub server: ServerSettings,

    /// External command-line tools
    #[serde(default)]
    pub tools: ToolSettings,

    #[serde(default)]
    pub timeouts: TimeoutSettings,

    /// Model-listing probe
    #[serde(default)]
    pub probe: ProbeSettings,

    /// Log lines read when inferring readiness from logs
    #[serde(default = "default_log_tail_lines")]
    pub log_tail_lines: u32,

    /// Periodic refresh of tracked deployments
    #[serde(default)]
    pub poller: PollerSettings,

    /// Rebuild tracked deployments from installed releases on startup
    #[serde(default = "default_true")]
    pub warm_start: bool,

    /// Seconds a deleted deployment stays visible before removal
    #[serde(default = "default_delete_grace_secs")]
    pub delete_grace_secs: u64,

    /// Enable the HTTP API
    #[serde(default = "default_true")]
    pub enable_server: bool,
}

fn default_true() -> bool {
    true
}

fn default_log_tail_lines() -> u32 {
    50
}

fn default_delete_grace_secs() -> u64 {
    5
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_json: false,
            log_dir: None,
            server: ServerSettings::default(),
            tools: ToolSettings::default(),
            timeouts: TimeoutSettings::default(),
            probe: ProbeSettings::default(),
            log_tail_lines: default_log_tail_lines(),
            poller: PollerSettings::default(),
            warm_start: true,
            delete_grace_secs: default_delete_grace_secs(),
            enable_server: true,
        }
    }
}

impl Settings {
    /// Read settings from `path`. A missing file yields the defaults; an
    /// unreadable or malformed one is an error.
    pub async fn load(path: &Path) -> Result<Self, ControllerError> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("No settings file at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&content).map_err(|e| {
            ControllerError::ConfigError(format!("invalid settings file {}: {}", path.display(), e))
        })
    }
}

/// HTTP API listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Paths or names of the cluster tools
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSettings {
    #[serde(default = "default_kubectl_bin")]
    pub kubectl_bin: String,

    #[serde(default = "default_helm_bin")]
    pub helm_bin: String,
}

fn default_kubectl_bin() -> String {
    "kubectl".to_string()
}

fn default_helm_bin() -> String {
    "helm".to_string()
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            kubectl_bin: default_kubectl_bin(),
            helm_bin: default_helm_bin(),
        }
    }
}

/// Timeouts for external calls, in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutSettings {
    /// Inventory and release queries
    #[serde(default = "default_query_secs")]
    pub query_secs: u64,

    /// Model-listing probe
    #[serde(default = "default_probe_secs")]
    pub probe_secs: u64,

    /// Uninstalls
    #[serde(default = "default_bulk_secs")]
    pub bulk_secs: u64,
}

fn default_query_secs() -> u64 {
    10
}

fn default_probe_secs() -> u64 {
    5
}

fn default_bulk_secs() -> u64 {
    300
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            query_secs: default_query_secs(),
            probe_secs: default_probe_secs(),
            bulk_secs: default_bulk_secs(),
        }
    }
}

/// How the model-listing probe reaches the router
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeMode {
    /// `kubectl exec` into the router and curl localhost
    #[default]
    Exec,
    /// Direct HTTP to the router service; needs in-cluster networking
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeSettings {
    #[serde(default)]
    pub mode: ProbeMode,

    #[serde(default = "default_router_port")]
    pub router_port: u16,
}

fn default_router_port() -> u16 {
    8000
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            mode: ProbeMode::Exec,
            router_port: default_router_port(),
        }
    }
}

/// Poller worker settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollerSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_poll_interval_secs")]
    pub interval_secs: u64,

    #[serde(default = "default_initial_delay_secs")]
    pub initial_delay_secs: u64,
}

fn default_poll_interval_secs() -> u64 {
    30
}

fn default_initial_delay_secs() -> u64 {
    5
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_poll_interval_secs(),
            initial_delay_secs: default_initial_delay_secs(),
        }
    }
}
