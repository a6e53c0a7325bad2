use serde::Deserialize;

// ─── Resource listings ────────────────────────────────────────────────────
//
// Typed views over `kubectl get <kind> -o json`. Only the fields this tool
// consumes are modelled; everything else the API server sends is ignored.
// Fields that older or minimal objects omit default rather than fail.

/// `kubectl get pods -o json`
#[derive(Debug, Clone, Deserialize)]
pub struct PodList {
    #[serde(default)]
    pub items: Vec<Pod>,
}

impl PodList {
    pub fn parse(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Pod {
    pub metadata: Metadata,
    #[serde(default)]
    pub status: PodStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Metadata {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PodStatus {
    /// Lifecycle phase as reported by the API server (`Running`, `Pending`,
    /// `Failed`, …). A pod with no reported phase counts as `Unknown`.
    #[serde(default = "unknown_phase")]
    pub phase: String,
}

impl Default for PodStatus {
    fn default() -> Self {
        PodStatus {
            phase: unknown_phase(),
        }
    }
}

fn unknown_phase() -> String {
    "Unknown".to_owned()
}

/// `kubectl get pvc -o json`
#[derive(Debug, Clone, Deserialize)]
pub struct ClaimList {
    #[serde(default)]
    pub items: Vec<Claim>,
}

impl ClaimList {
    pub fn parse(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Claim {
    pub metadata: Metadata,
    #[serde(default)]
    pub status: ClaimStatus,
    #[serde(default)]
    pub spec: ClaimSpec,
}

impl Claim {
    /// The requested storage size (`spec.resources.requests.storage`), if set.
    pub fn requested_storage(&self) -> Option<&str> {
        self.spec.resources.requests.storage.as_deref()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClaimStatus {
    /// `Bound` once the claim has a volume; `Pending` or `Lost` otherwise.
    #[serde(default = "unknown_phase")]
    pub phase: String,
}

impl Default for ClaimStatus {
    fn default() -> Self {
        ClaimStatus {
            phase: unknown_phase(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClaimSpec {
    #[serde(default)]
    pub resources: ClaimResources,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClaimResources {
    #[serde(default)]
    pub requests: ClaimRequests,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClaimRequests {
    #[serde(default)]
    pub storage: Option<String>,
}

/// `kubectl get svc -o json`
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceList {
    #[serde(default)]
    pub items: Vec<Service>,
}

impl ServiceList {
    pub fn parse(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
    pub metadata: Metadata,
    #[serde(default)]
    pub spec: ServiceSpec,
}

impl Service {
    /// The first exposed port, if any.
    pub fn first_port(&self) -> Option<u16> {
        self.spec.ports.first().map(|p| p.port)
    }

    /// In-cluster DNS address for this service: `<name>.<ns>.svc.cluster.local:<port>`.
    pub fn cluster_dns_address(&self, namespace: &str) -> Option<String> {
        self.first_port()
            .map(|port| format!("{}.{namespace}.svc.cluster.local:{port}", self.metadata.name))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceSpec {
    #[serde(default)]
    pub ports: Vec<ServicePort>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServicePort {
    pub port: u16,
}
