//! Model-listing probes against a deployment's router
//!
//! The router speaks the OpenAI-compatible API, so `GET /v1/models` answers
//! `{"data": [{"id": "..."}]}` once a model is being served.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::errors::ControllerError;
use crate::exec::{CommandRunner, CommandSpec};
use crate::inventory::{ExecTarget, ModelProbe};

/// Path of the model listing endpoint on the router
pub const MODELS_PATH: &str = "/v1/models";

/// What to probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRequest {
    pub namespace: String,
    pub release_name: String,
    /// Where an exec-based probe runs its request from
    pub target: ExecTarget,
}

/// Result of one probe attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The endpoint answered with a model listing; the ids may be empty
    Listed(Vec<String>),
    /// The endpoint answered, but not with JSON
    Unparseable,
    /// No answer: connection refused, timeout, exec failure
    Unreachable(String),
}

/// Classify a response body from the model listing endpoint.
///
/// Valid JSON without a `data` array counts as an empty listing.
pub fn parse_model_listing(body: &str) -> ProbeOutcome {
    let value: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(_) => return ProbeOutcome::Unparseable,
    };

    let ids = value
        .get("data")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .map(|entry| {
                    entry
                        .get("id")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .unwrap_or_else(|| entry.to_string())
                })
                .collect()
        })
        .unwrap_or_default();

    ProbeOutcome::Listed(ids)
}

/// Probes by running curl inside the router pod through `kubectl exec`
pub struct ExecProbe {
    runner: Arc<dyn CommandRunner>,
    kubectl_bin: String,
    router_port: u16,
    timeout: Duration,
}

impl ExecProbe {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        kubectl_bin: impl Into<String>,
        router_port: u16,
        timeout: Duration,
    ) -> Self {
        Self {
            runner,
            kubectl_bin: kubectl_bin.into(),
            router_port,
            timeout,
        }
    }
}

#[async_trait]
impl ModelProbe for ExecProbe {
    async fn list_models(&self, request: &ProbeRequest) -> ProbeOutcome {
        let url = format!("http://localhost:{}{}", self.router_port, MODELS_PATH);
        let cmd = CommandSpec::new(&self.kubectl_bin)
            .args(["exec", "-n", request.namespace.as_str(), request.target.as_arg()])
            .args(["--", "curl", "-s", url.as_str()]);

        let out = self.runner.execute(&cmd, self.timeout).await;
        if !out.success() {
            return ProbeOutcome::Unreachable(out.failure_summary());
        }
        if out.stdout.trim().is_empty() {
            return ProbeOutcome::Unreachable("empty response".to_string());
        }
        parse_model_listing(&out.stdout)
    }
}

/// Probes the router service directly; only usable from inside the cluster
pub struct HttpProbe {
    client: Client,
    router_port: u16,
    base_url: Option<Url>,
}

impl HttpProbe {
    pub fn new(router_port: u16, timeout: Duration) -> Result<Self, ControllerError> {
        // cluster-local names must never go through an egress proxy
        let client = Client::builder().timeout(timeout).no_proxy().build()?;
        Ok(Self {
            client,
            router_port,
            base_url: None,
        })
    }

    /// Send every probe to `base_url` instead of the in-cluster service name
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    pub fn models_url(&self, request: &ProbeRequest) -> Result<Url, url::ParseError> {
        let base = match &self.base_url {
            Some(url) => url.clone(),
            None => Url::parse(&format!(
                "http://{}-router-service.{}.svc.cluster.local:{}/",
                request.release_name, request.namespace, self.router_port
            ))?,
        };
        base.join(MODELS_PATH)
    }
}

#[async_trait]
impl ModelProbe for HttpProbe {
    async fn list_models(&self, request: &ProbeRequest) -> ProbeOutcome {
        let url = match self.models_url(request) {
            Ok(url) => url,
            Err(e) => return ProbeOutcome::Unreachable(format!("invalid probe url: {}", e)),
        };

        let response = match self.client.get(url.clone()).send().await {
            Ok(response) => response,
            Err(e) => return ProbeOutcome::Unreachable(e.to_string()),
        };
        debug!(url = %url, status = %response.status(), "Model probe answered");

        match response.text().await {
            Ok(body) if !body.trim().is_empty() => parse_model_listing(&body),
            Ok(_) => ProbeOutcome::Unreachable("empty response".to_string()),
            Err(e) => ProbeOutcome::Unreachable(e.to_string()),
        }
    }
}
