//! Application configuration options

use std::time::Duration;

use crate::reconcile::reconciler::DEFAULT_LOG_TAIL_LINES;
use crate::services::DeploymentServiceOptions;
use crate::storage::settings::{ProbeMode, Settings};
use crate::workers::{poller, warm_start};

/// Main application options
#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Lifecycle configuration
    pub lifecycle: LifecycleOptions,

    /// Enable local HTTP server
    pub enable_server: bool,

    /// Enable polling worker
    pub enable_poller: bool,

    /// Rebuild tracked deployments from installed releases on startup
    pub enable_warm_start: bool,

    /// Server configuration
    pub server: ServerOptions,

    /// Cluster tool invocation
    pub cluster: ClusterOptions,

    /// Log lines read by the readiness log fallback
    pub log_tail_lines: u32,

    /// Deployment service options
    pub deployments: DeploymentServiceOptions,

    /// Poller worker options
    pub poller: poller::Options,

    /// Warm-start worker options
    pub warm_start: warm_start::Options,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            lifecycle: LifecycleOptions::default(),
            enable_server: true,
            enable_poller: true,
            enable_warm_start: true,
            server: ServerOptions::default(),
            cluster: ClusterOptions::default(),
            log_tail_lines: DEFAULT_LOG_TAIL_LINES,
            deployments: DeploymentServiceOptions::default(),
            poller: poller::Options::default(),
            warm_start: warm_start::Options::default(),
        }
    }
}

impl From<&Settings> for AppOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            lifecycle: LifecycleOptions::default(),
            enable_server: settings.enable_server,
            enable_poller: settings.poller.enabled,
            enable_warm_start: settings.warm_start,
            server: ServerOptions {
                host: settings.server.host.clone(),
                port: settings.server.port,
            },
            cluster: ClusterOptions {
                kubectl_bin: settings.tools.kubectl_bin.clone(),
                helm_bin: settings.tools.helm_bin.clone(),
                query_timeout: Duration::from_secs(settings.timeouts.query_secs),
                probe_timeout: Duration::from_secs(settings.timeouts.probe_secs),
                bulk_timeout: Duration::from_secs(settings.timeouts.bulk_secs),
                probe_mode: settings.probe.mode,
                router_port: settings.probe.router_port,
            },
            log_tail_lines: settings.log_tail_lines,
            deployments: DeploymentServiceOptions {
                delete_grace: Duration::from_secs(settings.delete_grace_secs),
            },
            poller: poller::Options {
                interval: Duration::from_secs(settings.poller.interval_secs),
                initial_delay: Duration::from_secs(settings.poller.initial_delay_secs),
            },
            warm_start: warm_start::Options::default(),
        }
    }
}

/// Lifecycle options for the controller
#[derive(Debug, Clone)]
pub struct LifecycleOptions {
    /// Maximum delay for graceful shutdown
    pub max_shutdown_delay: Duration,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            max_shutdown_delay: Duration::from_secs(30),
        }
    }
}

/// Local HTTP server options
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// How kubectl, helm and the model probe are invoked
#[derive(Debug, Clone)]
pub struct ClusterOptions {
    pub kubectl_bin: String,
    pub helm_bin: String,
    pub query_timeout: Duration,
    pub probe_timeout: Duration,
    /// Applies to uninstalls
    pub bulk_timeout: Duration,
    pub probe_mode: ProbeMode,
    pub router_port: u16,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            kubectl_bin: "kubectl".to_string(),
            helm_bin: "helm".to_string(),
            query_timeout: Duration::from_secs(10),
            probe_timeout: Duration::from_secs(5),
            bulk_timeout: Duration::from_secs(300),
            probe_mode: ProbeMode::Exec,
            router_port: 8000,
        }
    }
}
