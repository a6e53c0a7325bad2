use serde::Serialize;

// ─── Observation ──────────────────────────────────────────────────────────

/// The resource classes whose readiness this tool understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Pod,
    StorageClaim,
    Endpoint,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Pod => "pod",
            ResourceKind::StorageClaim => "pvc",
            ResourceKind::Endpoint => "endpoint",
        }
    }
}

/// One named resource and its reported state, captured during a single poll
/// cycle and discarded after aggregation.
///
/// The raw phase string is retained verbatim so diagnostics show exactly
/// what the control plane reported (`CrashLoopBackOff`, not a lossy
/// "not ready").
#[derive(Debug, Clone, Serialize)]
pub struct Observation {
    pub name: String,
    pub kind: ResourceKind,
    pub phase: String,
    /// Kind-specific detail: requested storage for claims, the resolved
    /// address for endpoints.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Observation {
    pub fn pod(name: impl Into<String>, phase: impl Into<String>) -> Self {
        Observation {
            name: name.into(),
            kind: ResourceKind::Pod,
            phase: phase.into(),
            detail: None,
        }
    }

    pub fn claim(
        name: impl Into<String>,
        phase: impl Into<String>,
        storage: Option<String>,
    ) -> Self {
        Observation {
            name: name.into(),
            kind: ResourceKind::StorageClaim,
            phase: phase.into(),
            detail: storage,
        }
    }

    /// A service endpoint resolved to an in-cluster address.
    pub fn endpoint_resolved(name: impl Into<String>, address: impl Into<String>) -> Self {
        Observation {
            name: name.into(),
            kind: ResourceKind::Endpoint,
            phase: "Resolved".to_owned(),
            detail: Some(address.into()),
        }
    }

    /// A service endpoint that could not be resolved. `phase` says why
    /// (`NotFound` when no service matched, `NoPorts` when one matched but
    /// exposes nothing) — distinct from "resolved but unreachable", which is
    /// the connectivity check's territory.
    pub fn endpoint_unresolved(name: impl Into<String>, phase: impl Into<String>) -> Self {
        Observation {
            name: name.into(),
            kind: ResourceKind::Endpoint,
            phase: phase.into(),
            detail: None,
        }
    }

    /// Readiness classification: `Running` pods, `Bound` claims, `Resolved`
    /// endpoints. Anything else — `Pending`, `Failed`, `Unknown`,
    /// `CrashLoopBackOff` — is not ready.
    pub fn is_ready(&self) -> bool {
        match self.kind {
            ResourceKind::Pod => self.phase == "Running",
            ResourceKind::StorageClaim => self.phase == "Bound",
            ResourceKind::Endpoint => self.phase == "Resolved",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_pod_is_ready_any_other_phase_is_not() {
        assert!(Observation::pod("pg-0", "Running").is_ready());
        for phase in ["Pending", "Failed", "Unknown", "CrashLoopBackOff"] {
            assert!(!Observation::pod("pg-0", phase).is_ready(), "{phase}");
        }
    }

    #[test]
    fn bound_claim_is_ready() {
        assert!(Observation::claim("data-pg-0", "Bound", Some("8Gi".into())).is_ready());
        assert!(!Observation::claim("data-pg-0", "Pending", None).is_ready());
    }

    #[test]
    fn endpoint_readiness_tracks_resolution() {
        assert!(Observation::endpoint_resolved("pg", "pg.ns.svc.cluster.local:5432").is_ready());
        assert!(!Observation::endpoint_unresolved("app=pg", "NotFound").is_ready());
    }

    #[test]
    fn phase_string_is_retained_verbatim() {
        let obs = Observation::pod("pg-0", "CrashLoopBackOff");
        assert_eq!(obs.phase, "CrashLoopBackOff");
    }
}
