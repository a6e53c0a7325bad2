//! In-memory [`ClusterCtl`] returning scripted results, for deterministic
//! tests of the polling, aggregation, and migration logic.

use std::sync::Mutex;
use std::time::Duration;

use crate::exec::{ClusterCtl, ProbeFailure, ProbeResult};
use crate::session::SessionFailure;

/// A scripted control-plane double.
///
/// Query results are consumed front-to-back; the final scripted result is
/// sticky, so a single entry models a cluster whose state never changes
/// (the shape polling tests need). Exec results are consumed the same way.
/// Every call is recorded for assertions on ordering and fail-fast
/// behavior.
#[derive(Default)]
pub struct ScriptedCtl {
    queries: Mutex<Vec<ProbeResult>>,
    execs: Mutex<Vec<Result<String, SessionFailure>>>,
    query_log: Mutex<Vec<Vec<String>>>,
    exec_log: Mutex<Vec<String>>,
}

impl ScriptedCtl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a scripted query result.
    pub fn push_query(self, result: ProbeResult) -> Self {
        self.queries.lock().unwrap().push(result);
        self
    }

    /// Append a scripted query success with the given stdout payload.
    pub fn push_query_ok(self, stdout: impl Into<String>) -> Self {
        self.push_query(ProbeResult::Ok(stdout.into()))
    }

    /// Append a scripted exec outcome.
    pub fn push_exec(self, result: Result<String, SessionFailure>) -> Self {
        self.execs.lock().unwrap().push(result);
        self
    }

    /// Number of queries issued so far.
    pub fn queries_issued(&self) -> usize {
        self.query_log.lock().unwrap().len()
    }

    /// Number of exec sessions opened so far.
    pub fn execs_issued(&self) -> usize {
        self.exec_log.lock().unwrap().len()
    }

    /// Arguments of every query issued, in order.
    pub fn query_args(&self) -> Vec<Vec<String>> {
        self.query_log.lock().unwrap().clone()
    }

    fn take_front<T: Clone>(scripted: &Mutex<Vec<T>>, exhausted: impl FnOnce() -> T) -> T {
        let mut scripted = scripted.lock().unwrap();
        match scripted.len() {
            0 => exhausted(),
            // Last entry is sticky.
            1 => scripted[0].clone(),
            _ => scripted.remove(0),
        }
    }
}

impl ClusterCtl for ScriptedCtl {
    fn query(&self, _namespace: &str, args: &[&str], _timeout: Duration) -> ProbeResult {
        self.query_log
            .lock()
            .unwrap()
            .push(args.iter().map(|a| a.to_string()).collect());
        Self::take_front(&self.queries, || {
            ProbeResult::Failed(ProbeFailure::spawn("no scripted query result"))
        })
    }

    fn exec_stdin(
        &self,
        _namespace: &str,
        pod: &str,
        _command: &[&str],
        _input: &str,
        _timeout: Duration,
    ) -> Result<String, SessionFailure> {
        self.exec_log.lock().unwrap().push(pod.to_owned());
        Self::take_front(&self.execs, || {
            Err(SessionFailure::Transport("no scripted exec result".into()))
        })
    }
}
