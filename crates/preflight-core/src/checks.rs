use tracing::debug;

use kubectl_driver::{ClaimList, ClusterCtl, PodList, ProbeFailure, ProbeResult, ServiceList};

use crate::config::Settings;
use crate::error::{PreflightError, Result};
use crate::health::{aggregate, HealthVerdict};
use crate::observation::Observation;
use crate::poll::poll_until;

/// Catalog query proving the database is reachable and initialized, not
/// merely that its pod reports Running.
const TABLE_SQL: &str =
    "SELECT table_name FROM information_schema.tables WHERE table_schema='public';";

// ─── ClusterChecks ────────────────────────────────────────────────────────

/// Readiness checks for one deployment: joins control-plane queries to
/// [`Observation`]s that the aggregator can fold.
///
/// Generic over [`ClusterCtl`] so every check runs identically against the
/// real cluster and a scripted fake.
pub struct ClusterChecks<'a, C: ClusterCtl> {
    ctl: &'a C,
    settings: &'a Settings,
}

impl<'a, C: ClusterCtl> ClusterChecks<'a, C> {
    pub fn new(ctl: &'a C, settings: &'a Settings) -> Self {
        ClusterChecks { ctl, settings }
    }

    fn get_json(&self, resource: &str) -> Result<String> {
        let args = [
            "get",
            resource,
            "-l",
            self.settings.selector.as_str(),
            "-o",
            "json",
        ];
        match self
            .ctl
            .query(&self.settings.namespace, &args, self.settings.query_timeout())
        {
            ProbeResult::Ok(out) => Ok(out),
            ProbeResult::Failed(failure) => Err(PreflightError::Probe(failure)),
        }
    }

    /// One observation per pod matching the selector.
    pub fn pod_observations(&self) -> Result<Vec<Observation>> {
        let raw = self.get_json("pods")?;
        let pods = PodList::parse(&raw)
            .map_err(|e| PreflightError::Probe(ProbeFailure::malformed(format!("pod listing: {e}"))))?;
        debug!(count = pods.items.len(), "collected pod observations");
        Ok(pods
            .items
            .into_iter()
            .map(|p| Observation::pod(p.metadata.name, p.status.phase))
            .collect())
    }

    /// One observation per persistent volume claim, with its requested size.
    pub fn claim_observations(&self) -> Result<Vec<Observation>> {
        let raw = self.get_json("pvc")?;
        let claims = ClaimList::parse(&raw)
            .map_err(|e| PreflightError::Probe(ProbeFailure::malformed(format!("pvc listing: {e}"))))?;
        debug!(count = claims.items.len(), "collected claim observations");
        Ok(claims
            .items
            .into_iter()
            .map(|c| {
                let storage = c.requested_storage().map(ToOwned::to_owned);
                Observation::claim(c.metadata.name, c.status.phase, storage)
            })
            .collect())
    }

    /// Resolve the deployment's service to an in-cluster DNS address.
    ///
    /// Candidates are ordered by name so the pick is stable across
    /// invocations. No matching service yields a not-ready observation —
    /// a different condition than "resolved but unreachable", which the
    /// catalog check reports separately.
    pub fn endpoint_observation(&self) -> Result<Observation> {
        let raw = self.get_json("svc")?;
        let mut services = ServiceList::parse(&raw).map_err(|e| {
            PreflightError::Probe(ProbeFailure::malformed(format!("service listing: {e}")))
        })?;
        services
            .items
            .sort_by(|a, b| a.metadata.name.cmp(&b.metadata.name));

        match services.items.into_iter().next() {
            None => Ok(Observation::endpoint_unresolved(
                &self.settings.selector,
                "NotFound",
            )),
            Some(svc) => match svc.cluster_dns_address(&self.settings.namespace) {
                Some(address) => Ok(Observation::endpoint_resolved(svc.metadata.name, address)),
                None => Ok(Observation::endpoint_unresolved(svc.metadata.name, "NoPorts")),
            },
        }
    }

    /// The single addressable pod for remote sessions: first match, ordered
    /// by name. `None` when nothing matches the selector.
    pub fn locate_pod(&self) -> Result<Option<String>> {
        let raw = self.get_json("pods")?;
        let pods = PodList::parse(&raw)
            .map_err(|e| PreflightError::Probe(ProbeFailure::malformed(format!("pod listing: {e}"))))?;
        let mut names: Vec<String> = pods.items.into_iter().map(|p| p.metadata.name).collect();
        names.sort();
        Ok(names.into_iter().next())
    }

    /// List user tables through the database pod — live-connectivity
    /// evidence beyond the pod phase.
    pub fn table_listing(&self, pod: &str) -> Result<Vec<String>> {
        let args = [
            "exec",
            pod,
            "--",
            "psql",
            "-U",
            self.settings.user.as_str(),
            "-d",
            self.settings.database.as_str(),
            "-tAc",
            TABLE_SQL,
        ];
        match self
            .ctl
            .query(&self.settings.namespace, &args, self.settings.query_timeout())
        {
            ProbeResult::Ok(out) => Ok(out
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(ToOwned::to_owned)
                .collect()),
            ProbeResult::Failed(failure) => Err(PreflightError::Probe(failure)),
        }
    }

    /// Poll pod observations until the aggregate verdict is healthy.
    ///
    /// Probe-level failures inside the loop are absorbed into the next
    /// attempt; the only error out of here is the typed readiness timeout,
    /// carrying the last observed state.
    pub fn wait_for_pods(&self) -> Result<HealthVerdict> {
        let outcome = poll_until(
            || self.pod_observations().map(aggregate),
            |attempt| matches!(attempt, Ok(verdict) if verdict.healthy()),
            self.settings.interval(),
            self.settings.deadline(),
        );

        match outcome {
            Ok(Ok(verdict)) => Ok(verdict),
            Ok(Err(e)) => Err(e),
            Err(timeout) => {
                let last = match &timeout.last {
                    Ok(verdict) => verdict.summary(),
                    Err(e) => e.to_string(),
                };
                Err(PreflightError::ReadinessTimeout(format!(
                    "{timeout}; last state: {last}"
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kubectl_driver::{FailureCause, ProbeResult, ScriptedCtl};

    const RUNNING_PODS: &str = r#"{"items": [
        {"metadata": {"name": "postgresql-1"}, "status": {"phase": "Running"}},
        {"metadata": {"name": "postgresql-0"}, "status": {"phase": "Running"}}
    ]}"#;

    const PENDING_PODS: &str =
        r#"{"items": [{"metadata": {"name": "postgresql-0"}, "status": {"phase": "Pending"}}]}"#;

    fn fast_settings() -> Settings {
        Settings {
            deadline_secs: 0,
            settle_secs: 0,
            ..Settings::default()
        }
    }

    #[test]
    fn pod_observations_carry_names_and_phases() {
        let ctl = ScriptedCtl::new().push_query_ok(PENDING_PODS);
        let settings = fast_settings();
        let obs = ClusterChecks::new(&ctl, &settings).pod_observations().unwrap();
        assert_eq!(obs.len(), 1);
        assert_eq!(obs[0].name, "postgresql-0");
        assert_eq!(obs[0].phase, "Pending");
    }

    #[test]
    fn probe_failure_surfaces_as_probe_error() {
        let ctl = ScriptedCtl::new()
            .push_query(ProbeResult::Failed(ProbeFailure::exit(1, "forbidden")));
        let settings = fast_settings();
        let err = ClusterChecks::new(&ctl, &settings)
            .pod_observations()
            .unwrap_err();
        assert!(matches!(err, PreflightError::Probe(_)));
        assert!(err.to_string().contains("forbidden"));
    }

    #[test]
    fn unparseable_listing_is_a_malformed_probe_failure() {
        let ctl = ScriptedCtl::new().push_query_ok("error: the server refused");
        let settings = fast_settings();
        let err = ClusterChecks::new(&ctl, &settings)
            .pod_observations()
            .unwrap_err();
        match err {
            PreflightError::Probe(failure) => assert_eq!(failure.cause, FailureCause::Malformed),
            other => panic!("expected probe failure, got {other}"),
        }
    }

    #[test]
    fn claim_observations_keep_the_requested_storage() {
        let ctl = ScriptedCtl::new().push_query_ok(
            r#"{"items": [{
                "metadata": {"name": "data-postgresql-0"},
                "spec": {"resources": {"requests": {"storage": "8Gi"}}},
                "status": {"phase": "Bound"}
            }]}"#,
        );
        let settings = fast_settings();
        let obs = ClusterChecks::new(&ctl, &settings)
            .claim_observations()
            .unwrap();
        assert!(obs[0].is_ready());
        assert_eq!(obs[0].detail.as_deref(), Some("8Gi"));
    }

    #[test]
    fn endpoint_resolution_picks_the_first_service_by_name() {
        let ctl = ScriptedCtl::new().push_query_ok(
            r#"{"items": [
                {"metadata": {"name": "postgresql-headless"}, "spec": {"ports": [{"port": 5432}]}},
                {"metadata": {"name": "postgresql"}, "spec": {"ports": [{"port": 5432}]}}
            ]}"#,
        );
        let settings = fast_settings();
        let obs = ClusterChecks::new(&ctl, &settings)
            .endpoint_observation()
            .unwrap();
        assert!(obs.is_ready());
        assert_eq!(obs.name, "postgresql");
        assert_eq!(
            obs.detail.as_deref(),
            Some("postgresql.learnflow.svc.cluster.local:5432")
        );
    }

    #[test]
    fn missing_service_is_a_not_ready_observation_not_an_error() {
        let ctl = ScriptedCtl::new().push_query_ok(r#"{"items": []}"#);
        let settings = fast_settings();
        let obs = ClusterChecks::new(&ctl, &settings)
            .endpoint_observation()
            .unwrap();
        assert!(!obs.is_ready());
        assert_eq!(obs.phase, "NotFound");
    }

    #[test]
    fn locate_pod_orders_candidates_by_name() {
        let ctl = ScriptedCtl::new().push_query_ok(RUNNING_PODS);
        let settings = fast_settings();
        let pod = ClusterChecks::new(&ctl, &settings).locate_pod().unwrap();
        assert_eq!(pod.as_deref(), Some("postgresql-0"));
    }

    #[test]
    fn table_listing_splits_and_trims_lines() {
        let ctl = ScriptedCtl::new().push_query_ok("students\nexercises\n\n progress \n");
        let settings = fast_settings();
        let tables = ClusterChecks::new(&ctl, &settings)
            .table_listing("postgresql-0")
            .unwrap();
        assert_eq!(tables, ["students", "exercises", "progress"]);
    }

    #[test]
    fn wait_for_pods_returns_the_healthy_verdict() {
        let ctl = ScriptedCtl::new().push_query_ok(RUNNING_PODS);
        let settings = fast_settings();
        let verdict = ClusterChecks::new(&ctl, &settings).wait_for_pods().unwrap();
        assert!(verdict.healthy());
        assert_eq!(verdict.total, 2);
    }

    #[test]
    fn wait_for_pods_times_out_with_the_last_state_in_the_detail() {
        let ctl = ScriptedCtl::new().push_query_ok(PENDING_PODS);
        let settings = fast_settings();
        let err = ClusterChecks::new(&ctl, &settings)
            .wait_for_pods()
            .unwrap_err();
        match err {
            PreflightError::ReadinessTimeout(detail) => {
                assert!(detail.contains("postgresql-0 (Pending)"), "detail: {detail}");
            }
            other => panic!("expected readiness timeout, got {other}"),
        }
    }

    #[test]
    fn wait_for_pods_absorbs_probe_failures_between_attempts() {
        // First attempt fails at the transport level, second sees Running —
        // the failure is swallowed into the retry, not surfaced.
        let ctl = ScriptedCtl::new()
            .push_query(ProbeResult::Failed(ProbeFailure::exit(1, "connection refused")))
            .push_query_ok(RUNNING_PODS);
        let settings = Settings {
            interval_secs: 1,
            deadline_secs: 5,
            ..Settings::default()
        };
        let verdict = ClusterChecks::new(&ctl, &settings).wait_for_pods().unwrap();
        assert!(verdict.healthy());
        assert_eq!(ctl.queries_issued(), 2);
    }
}
