use std::fmt;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::KubectlError;
use crate::session::{ExecSession, SessionFailure};

/// Granularity of the child-exit poll loop while a deadline is pending.
const WAIT_TICK: Duration = Duration::from_millis(25);

// ─── ProbeResult ──────────────────────────────────────────────────────────

/// The outcome of one external query against the control plane.
///
/// Produced fresh on every call; a failed probe never raises — every failure
/// mode (timeout, nonzero exit, spawn error) is folded into
/// [`ProbeResult::Failed`] so callers branch uniformly. Retry is the
/// poller's responsibility, not this boundary's.
#[derive(Debug, Clone)]
pub enum ProbeResult {
    /// Exit code zero. Carries trimmed standard output.
    Ok(String),
    Failed(ProbeFailure),
}

impl ProbeResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, ProbeResult::Ok(_))
    }

    /// The payload, if the probe succeeded.
    pub fn output(&self) -> Option<&str> {
        match self {
            ProbeResult::Ok(out) => Some(out),
            ProbeResult::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&ProbeFailure> {
        match self {
            ProbeResult::Ok(_) => None,
            ProbeResult::Failed(f) => Some(f),
        }
    }
}

/// Why a probe failed, with the captured diagnostic text.
#[derive(Debug, Clone)]
pub struct ProbeFailure {
    pub cause: FailureCause,
    pub detail: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCause {
    /// The deadline elapsed before the child exited; the child was killed.
    Timeout,
    /// The child exited with the given nonzero code.
    Exit(i32),
    /// The child was terminated by a signal.
    Signal,
    /// The child could not be spawned or its pipes could not be driven.
    Spawn,
    /// The child succeeded but its output could not be interpreted.
    Malformed,
}

impl ProbeFailure {
    pub fn timeout(budget: Duration, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        let detail = if detail.is_empty() {
            format!("no output within {budget:?}")
        } else {
            detail
        };
        ProbeFailure {
            cause: FailureCause::Timeout,
            detail,
        }
    }

    pub fn exit(code: i32, detail: impl Into<String>) -> Self {
        ProbeFailure {
            cause: FailureCause::Exit(code),
            detail: detail.into(),
        }
    }

    pub fn signal(detail: impl Into<String>) -> Self {
        ProbeFailure {
            cause: FailureCause::Signal,
            detail: detail.into(),
        }
    }

    pub fn spawn(err: impl fmt::Display) -> Self {
        ProbeFailure {
            cause: FailureCause::Spawn,
            detail: err.to_string(),
        }
    }

    pub fn malformed(detail: impl Into<String>) -> Self {
        ProbeFailure {
            cause: FailureCause::Malformed,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for ProbeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cause {
            FailureCause::Timeout => write!(f, "timed out: {}", self.detail),
            FailureCause::Exit(code) => write!(f, "exit code {code}: {}", self.detail),
            FailureCause::Signal => write!(f, "terminated by signal: {}", self.detail),
            FailureCause::Spawn => write!(f, "failed to spawn: {}", self.detail),
            FailureCause::Malformed => write!(f, "malformed output: {}", self.detail),
        }
    }
}

// ─── ClusterCtl ───────────────────────────────────────────────────────────

/// Capability boundary for external cluster commands.
///
/// Two implementations: [`Kubectl`], which spawns real subprocesses, and
/// [`crate::fake::ScriptedCtl`], which replays scripted results so the
/// polling, aggregation, and migration logic can be tested without a live
/// cluster.
///
/// Both operations spawn exactly one external process per call and never
/// retry internally.
pub trait ClusterCtl {
    /// Run one namespace-scoped query (`kubectl -n <ns> <args…>`) with a
    /// hard timeout.
    fn query(&self, namespace: &str, args: &[&str], timeout: Duration) -> ProbeResult;

    /// Open one interactive remote session against `pod`, stream `input`
    /// over stdin, and wait for the remote interpreter to exit.
    ///
    /// Failures before the remote accepted the input surface as
    /// [`SessionFailure::Transport`]; failures after, as
    /// [`SessionFailure::Rejected`].
    fn exec_stdin(
        &self,
        namespace: &str,
        pod: &str,
        command: &[&str],
        input: &str,
        timeout: Duration,
    ) -> Result<String, SessionFailure>;
}

// ─── Kubectl ──────────────────────────────────────────────────────────────

/// The real subprocess-backed [`ClusterCtl`].
#[derive(Debug, Clone)]
pub struct Kubectl {
    binary: PathBuf,
    context: Option<String>,
}

impl Kubectl {
    /// Locate the kubectl binary on PATH.
    pub fn discover() -> Result<Self, KubectlError> {
        let binary = which::which("kubectl").map_err(|_| KubectlError::KubectlNotFound)?;
        Ok(Kubectl {
            binary,
            context: None,
        })
    }

    /// Pin all invocations to a named kubeconfig context.
    pub fn with_context(mut self, context: Option<String>) -> Self {
        self.context = context;
        self
    }

    pub(crate) fn base_command(&self) -> Command {
        let mut cmd = Command::new(&self.binary);
        if let Some(ctx) = &self.context {
            cmd.arg("--context").arg(ctx);
        }
        cmd
    }
}

impl ClusterCtl for Kubectl {
    fn query(&self, namespace: &str, args: &[&str], timeout: Duration) -> ProbeResult {
        let mut cmd = self.base_command();
        cmd.arg("-n")
            .arg(namespace)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!(namespace, ?args, ?timeout, "spawning kubectl query");
        run_to_completion(cmd, timeout)
    }

    fn exec_stdin(
        &self,
        namespace: &str,
        pod: &str,
        command: &[&str],
        input: &str,
        timeout: Duration,
    ) -> Result<String, SessionFailure> {
        let mut cmd = self.base_command();
        cmd.arg("exec")
            .arg("-i")
            .arg("-n")
            .arg(namespace)
            .arg(pod)
            .arg("--")
            .args(command);

        debug!(namespace, pod, ?command, "opening remote exec session");
        ExecSession::open(cmd)?.run(input, timeout)
    }
}

// ─── Subprocess plumbing ──────────────────────────────────────────────────

/// Spawn `cmd` and drive it to completion under `timeout`, classifying the
/// outcome as a [`ProbeResult`]. The child never outlives this call: on
/// timeout it is killed and reaped before returning.
pub(crate) fn run_to_completion(mut cmd: Command, timeout: Duration) -> ProbeResult {
    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => return ProbeResult::Failed(ProbeFailure::spawn(e)),
    };

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    match wait_with_deadline(&mut child, timeout) {
        Err(e) => {
            kill_and_reap(&mut child);
            ProbeResult::Failed(ProbeFailure::spawn(e))
        }
        Ok(None) => {
            kill_and_reap(&mut child);
            let diag = join_output(stderr);
            let _ = join_output(stdout);
            ProbeResult::Failed(ProbeFailure::timeout(timeout, diag))
        }
        Ok(Some(status)) => {
            let out = join_output(stdout);
            let err = join_output(stderr);
            classify_exit(status, out, err)
        }
    }
}

fn classify_exit(status: ExitStatus, stdout: String, stderr: String) -> ProbeResult {
    if status.success() {
        return ProbeResult::Ok(stdout.trim().to_owned());
    }
    // Diagnostic text: stderr preferred, stdout as fallback.
    let diag = if stderr.trim().is_empty() {
        stdout.trim().to_owned()
    } else {
        stderr.trim().to_owned()
    };
    match status.code() {
        Some(code) => ProbeResult::Failed(ProbeFailure::exit(code, diag)),
        None => ProbeResult::Failed(ProbeFailure::signal(diag)),
    }
}

/// Poll the child for exit until `timeout` elapses.
///
/// Returns `Ok(None)` when the deadline fired with the child still running;
/// the caller is responsible for killing it.
pub(crate) fn wait_with_deadline(
    child: &mut Child,
    timeout: Duration,
) -> std::io::Result<Option<ExitStatus>> {
    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if start.elapsed() >= timeout {
            return Ok(None);
        }
        thread::sleep(WAIT_TICK);
    }
}

/// Kill and reap the child so no process outlives the call, on any path.
pub(crate) fn kill_and_reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

/// Drain a pipe on a background thread so the child cannot block on a full
/// buffer while we wait for it to exit.
pub(crate) fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<String>> {
    pipe.map(|mut r| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = r.read_to_end(&mut buf);
            String::from_utf8_lossy(&buf).into_owned()
        })
    })
}

pub(crate) fn join_output(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(script)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }

    #[test]
    fn zero_exit_yields_trimmed_stdout() {
        let result = run_to_completion(sh("printf ' hello \\n'"), Duration::from_secs(5));
        assert_eq!(result.output(), Some("hello"));
    }

    #[test]
    fn nonzero_exit_carries_stderr_detail() {
        let result = run_to_completion(sh("echo boom >&2; exit 3"), Duration::from_secs(5));
        let failure = result.failure().expect("expected failure");
        assert_eq!(failure.cause, FailureCause::Exit(3));
        assert_eq!(failure.detail, "boom");
    }

    #[test]
    fn nonzero_exit_falls_back_to_stdout_detail() {
        let result = run_to_completion(sh("echo why; exit 1"), Duration::from_secs(5));
        let failure = result.failure().expect("expected failure");
        assert_eq!(failure.cause, FailureCause::Exit(1));
        assert_eq!(failure.detail, "why");
    }

    #[test]
    fn deadline_kills_child_and_reports_timeout_not_exit() {
        let started = Instant::now();
        let result = run_to_completion(sh("sleep 30"), Duration::from_millis(80));
        let failure = result.failure().expect("expected failure");
        assert_eq!(failure.cause, FailureCause::Timeout);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn unspawnable_binary_is_a_spawn_failure() {
        let mut cmd = Command::new("/nonexistent/preflight-test-binary");
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        let result = run_to_completion(cmd, Duration::from_secs(1));
        let failure = result.failure().expect("expected failure");
        assert_eq!(failure.cause, FailureCause::Spawn);
    }
}
