//! Service view parsed from `kubectl get service -o json`

use serde::{Deserialize, Serialize};

/// Kubernetes service type, reduced to the cases the controller cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceType {
    ClusterIP,
    LoadBalancer,
    Other,
}

impl ServiceType {
    pub fn from_type(service_type: &str) -> Self {
        match service_type {
            "ClusterIP" => ServiceType::ClusterIP,
            "LoadBalancer" => ServiceType::LoadBalancer,
            _ => ServiceType::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub service_type: ServiceType,
    /// Load balancer hostname or IP
    pub external_address: Option<String>,
    /// `http://{external_address}`
    pub public_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawService {
    metadata: RawMetadata,
    spec: RawServiceSpec,
    status: RawServiceStatus,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawMetadata {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawServiceSpec {
    #[serde(rename = "type")]
    service_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawServiceStatus {
    load_balancer: RawLoadBalancer,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawLoadBalancer {
    ingress: Vec<RawIngress>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawIngress {
    hostname: Option<String>,
    ip: Option<String>,
}

/// Parse one service document. Only a LoadBalancer with an ingress entry gets an
/// external address; the first entry's hostname is preferred over its IP.
pub fn parse_service(json: &str) -> Result<ServiceInfo, serde_json::Error> {
    let raw: RawService = serde_json::from_str(json)?;
    let service_type = raw
        .spec
        .service_type
        .as_deref()
        .map(ServiceType::from_type)
        .unwrap_or(ServiceType::Other);

    let external_address = match service_type {
        ServiceType::LoadBalancer => raw.status.load_balancer.ingress.first().and_then(|entry| {
            entry
                .hostname
                .clone()
                .filter(|h| !h.is_empty())
                .or_else(|| entry.ip.clone().filter(|ip| !ip.is_empty()))
        }),
        _ => None,
    };

    Ok(ServiceInfo {
        name: raw.metadata.name,
        service_type,
        public_url: external_address.as_ref().map(|addr| format!("http://{}", addr)),
        external_address,
    })
}
