use std::fmt;
use std::thread;
use std::time::Instant;

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use kubectl_driver::{ClusterCtl, SessionFailure};

use crate::checks::ClusterChecks;
use crate::config::Settings;

// ─── MigrationStage ───────────────────────────────────────────────────────

/// Where a migration attempt failed. Tags the terminal record so operators
/// see which stage to investigate, not a bare nonzero exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MigrationStage {
    ReadinessTimeout,
    EndpointNotFound,
    TransportError,
    RemoteRejected,
}

impl MigrationStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            MigrationStage::ReadinessTimeout => "readiness-timeout",
            MigrationStage::EndpointNotFound => "endpoint-not-found",
            MigrationStage::TransportError => "transport-error",
            MigrationStage::RemoteRejected => "remote-rejected",
        }
    }
}

impl fmt::Display for MigrationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal failure record of one migration attempt.
#[derive(Debug, Error)]
#[error("migration failed at {stage}: {detail}")]
pub struct MigrationFailure {
    pub stage: MigrationStage,
    /// Last diagnostic text captured before the failure.
    pub detail: String,
}

fn fail(stage: MigrationStage, detail: impl Into<String>) -> MigrationFailure {
    MigrationFailure {
        stage,
        detail: detail.into(),
    }
}

/// Terminal success record of one migration attempt.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    /// The pod the payload was applied through.
    pub pod: String,
    pub elapsed_secs: f64,
    /// Remote interpreter output — diagnostic only.
    pub remote_output: String,
}

// ─── MigrationSession ─────────────────────────────────────────────────────

/// One-shot schema-migration session, gated on readiness:
///
/// ```text
/// START → WAIT_READY → LOCATE_TARGET → RUN_PAYLOAD → SUCCEEDED
///             │              │              │
///             ▼              ▼              ▼
///      readiness-timeout  endpoint-    transport-error /
///                         not-found    remote-rejected
/// ```
///
/// Stages are strictly sequential and fail-fast: a timeout in `WAIT_READY`
/// never reaches the later stages. `RUN_PAYLOAD` is never retried by this
/// layer — whether the payload is safe to re-run is the payload's own
/// contract, so a partial application surfaces to the operator instead.
pub struct MigrationSession<'a, C: ClusterCtl> {
    ctl: &'a C,
    settings: &'a Settings,
    payload: &'a str,
}

impl<'a, C: ClusterCtl> MigrationSession<'a, C> {
    pub fn new(ctl: &'a C, settings: &'a Settings, payload: &'a str) -> Self {
        MigrationSession {
            ctl,
            settings,
            payload,
        }
    }

    /// Drive the state machine to a terminal state. Consumes the session:
    /// terminal states are final and the session is not reusable.
    pub fn run(self) -> Result<MigrationReport, MigrationFailure> {
        let start = Instant::now();
        let checks = ClusterChecks::new(self.ctl, self.settings);

        // WAIT_READY
        info!(
            selector = %self.settings.selector,
            deadline_secs = self.settings.deadline_secs,
            "waiting for pods"
        );
        let verdict = checks
            .wait_for_pods()
            .map_err(|e| fail(MigrationStage::ReadinessTimeout, e.to_string()))?;
        info!(ready = verdict.ready, total = verdict.total, "pods ready");

        // The pod reports Running before the database inside accepts
        // connections; give it a moment.
        let settle = self.settings.settle();
        if !settle.is_zero() {
            thread::sleep(settle);
        }

        // LOCATE_TARGET
        let pod = match checks.locate_pod() {
            Ok(Some(pod)) => pod,
            Ok(None) => {
                return Err(fail(
                    MigrationStage::EndpointNotFound,
                    format!("no pods match selector '{}'", self.settings.selector),
                ))
            }
            Err(e) => return Err(fail(MigrationStage::EndpointNotFound, e.to_string())),
        };
        info!(pod = %pod, "located migration target");

        // RUN_PAYLOAD
        let command = ["psql", "-U", self.settings.user.as_str()];
        let remote_output = self
            .ctl
            .exec_stdin(
                &self.settings.namespace,
                &pod,
                &command,
                self.payload,
                self.settings.exec_timeout(),
            )
            .map_err(|e| match e {
                SessionFailure::Transport(detail) => fail(MigrationStage::TransportError, detail),
                SessionFailure::Rejected(detail) => fail(MigrationStage::RemoteRejected, detail),
            })?;

        let elapsed_secs = start.elapsed().as_secs_f64();
        info!(pod = %pod, elapsed_secs, "migration applied");
        Ok(MigrationReport {
            pod,
            elapsed_secs,
            remote_output,
        })
    }
}
