use std::io::Write;
use std::process::{Child, Command, Stdio};
use std::thread::JoinHandle;
use std::time::Duration;

use thiserror::Error;

use crate::exec::{drain, join_output, kill_and_reap, wait_with_deadline};

// ─── SessionFailure ───────────────────────────────────────────────────────

/// How a remote exec session failed, split on whether the remote process
/// accepted the streamed input.
///
/// The distinction matters to callers: a transport failure means the payload
/// never reached the remote interpreter and nothing was applied, while a
/// rejection means the interpreter consumed the payload and then failed —
/// which must not be silently re-attempted.
#[derive(Debug, Clone, Error)]
pub enum SessionFailure {
    /// The session could not be established or the input could not be
    /// streamed (spawn failure, broken pipe before the payload was written).
    #[error("transport failure: {0}")]
    Transport(String),

    /// The remote process accepted the input and then exited nonzero,
    /// was killed, or never exited within the deadline.
    #[error("remote rejected: {0}")]
    Rejected(String),
}

// ─── ExecSession ──────────────────────────────────────────────────────────

/// One interactive remote session: a spawned `kubectl exec -i …` child with
/// its output pipes drained in the background.
///
/// Single-shot by construction — [`ExecSession::run`] consumes the session,
/// streams the payload, closes stdin, and waits for the remote exit.
#[derive(Debug)]
pub(crate) struct ExecSession {
    child: Child,
    stdout: Option<JoinHandle<String>>,
    stderr: Option<JoinHandle<String>>,
}

impl ExecSession {
    pub(crate) fn open(mut cmd: Command) -> Result<Self, SessionFailure> {
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .map_err(|e| SessionFailure::Transport(format!("failed to spawn session: {e}")))?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        Ok(ExecSession {
            child,
            stdout,
            stderr,
        })
    }

    /// Stream `input` over stdin, close it, and wait for the remote exit.
    ///
    /// On timeout the child is killed and reaped before returning.
    pub(crate) fn run(mut self, input: &str, timeout: Duration) -> Result<String, SessionFailure> {
        let mut stdin = self
            .child
            .stdin
            .take()
            .ok_or_else(|| SessionFailure::Transport("stdin not captured".into()))?;

        if let Err(e) = stdin.write_all(input.as_bytes()) {
            kill_and_reap(&mut self.child);
            return Err(SessionFailure::Transport(format!(
                "failed to stream payload: {e}"
            )));
        }
        // Close stdin so the remote interpreter sees EOF and runs the payload.
        drop(stdin);

        match wait_with_deadline(&mut self.child, timeout) {
            Err(e) => {
                kill_and_reap(&mut self.child);
                Err(SessionFailure::Rejected(format!(
                    "failed waiting for remote exit: {e}"
                )))
            }
            Ok(None) => {
                kill_and_reap(&mut self.child);
                let diag = join_output(self.stderr);
                Err(SessionFailure::Rejected(format!(
                    "remote did not exit within {timeout:?}{}",
                    suffix(&diag)
                )))
            }
            Ok(Some(status)) => {
                let out = join_output(self.stdout);
                let err = join_output(self.stderr);
                if status.success() {
                    return Ok(out.trim().to_owned());
                }
                let diag = if err.trim().is_empty() { out } else { err };
                match status.code() {
                    Some(code) => Err(SessionFailure::Rejected(format!(
                        "remote exited with code {code}{}",
                        suffix(diag.trim())
                    ))),
                    None => Err(SessionFailure::Rejected(format!(
                        "remote terminated by signal{}",
                        suffix(diag.trim())
                    ))),
                }
            }
        }
    }
}

fn suffix(diag: &str) -> String {
    if diag.is_empty() {
        String::new()
    } else {
        format!(": {diag}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(script);
        cmd
    }

    #[test]
    fn payload_is_streamed_and_stdout_returned() {
        let session = ExecSession::open(sh("cat")).unwrap();
        let out = session.run("select 1;\n", Duration::from_secs(5)).unwrap();
        assert_eq!(out, "select 1;");
    }

    #[test]
    fn nonzero_remote_exit_is_rejected_with_code_and_diagnostics() {
        let session = ExecSession::open(sh("cat >/dev/null; echo 'syntax error' >&2; exit 2")).unwrap();
        let err = session
            .run("bad payload", Duration::from_secs(5))
            .unwrap_err();
        match err {
            SessionFailure::Rejected(detail) => {
                assert!(detail.contains("code 2"), "detail: {detail}");
                assert!(detail.contains("syntax error"), "detail: {detail}");
            }
            SessionFailure::Transport(detail) => panic!("expected rejection, got transport: {detail}"),
        }
    }

    #[test]
    fn unspawnable_session_is_a_transport_failure() {
        let err = ExecSession::open(Command::new("/nonexistent/preflight-session")).unwrap_err();
        assert!(matches!(err, SessionFailure::Transport(_)));
    }

    #[test]
    fn hung_remote_is_killed_at_the_deadline() {
        let session = ExecSession::open(sh("cat >/dev/null; sleep 30")).unwrap();
        let err = session
            .run("payload", Duration::from_millis(80))
            .unwrap_err();
        assert!(matches!(err, SessionFailure::Rejected(_)));
    }
}
