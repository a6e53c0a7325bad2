use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

// ─── Settings ─────────────────────────────────────────────────────────────

/// Explicit configuration for one orchestration run.
///
/// Nothing here is ambient: every check and session receives its settings as
/// an argument, so tests can run against a scripted control plane with tight
/// budgets. Loadable from a YAML file where every field is optional and
/// falls back to its default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Target namespace.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Label selector identifying the deployment's resources.
    #[serde(default = "default_selector")]
    pub selector: String,

    /// Database name for connectivity checks and the migration session.
    #[serde(default = "default_database")]
    pub database: String,

    /// Database user for remote sessions.
    #[serde(default = "default_user")]
    pub user: String,

    /// Sleep between readiness poll attempts.
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Wall-clock budget for a readiness wait.
    #[serde(default = "default_deadline")]
    pub deadline_secs: u64,

    /// Per-probe budget for status queries.
    #[serde(default = "default_query_timeout")]
    pub query_timeout_secs: u64,

    /// Budget for remote script execution.
    #[serde(default = "default_exec_timeout")]
    pub exec_timeout_secs: u64,

    /// Extra wait after pods turn Running, before opening a remote session.
    /// The database inside a Running pod may still be starting up.
    #[serde(default = "default_settle")]
    pub settle_secs: u64,
}

fn default_namespace() -> String {
    "learnflow".to_owned()
}

fn default_selector() -> String {
    "app.kubernetes.io/name=postgresql".to_owned()
}

fn default_database() -> String {
    "learnflow".to_owned()
}

fn default_user() -> String {
    "postgres".to_owned()
}

fn default_interval() -> u64 {
    5
}

fn default_deadline() -> u64 {
    120
}

fn default_query_timeout() -> u64 {
    30
}

fn default_exec_timeout() -> u64 {
    60
}

fn default_settle() -> u64 {
    10
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            namespace: default_namespace(),
            selector: default_selector(),
            database: default_database(),
            user: default_user(),
            interval_secs: default_interval(),
            deadline_secs: default_deadline(),
            query_timeout_secs: default_query_timeout(),
            exec_timeout_secs: default_exec_timeout(),
            settle_secs: default_settle(),
        }
    }
}

impl Settings {
    /// Load settings from a YAML file; omitted fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&raw)?)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    pub fn exec_timeout(&self) -> Duration {
        Duration::from_secs(self.exec_timeout_secs)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_secs(self.settle_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_deployment_conventions() {
        let s = Settings::default();
        assert_eq!(s.namespace, "learnflow");
        assert_eq!(s.selector, "app.kubernetes.io/name=postgresql");
        assert_eq!(s.interval_secs, 5);
        assert_eq!(s.deadline_secs, 120);
    }

    #[test]
    fn partial_yaml_fills_remaining_defaults() {
        let s: Settings = serde_yaml::from_str("namespace: staging\ndeadline_secs: 30\n").unwrap();
        assert_eq!(s.namespace, "staging");
        assert_eq!(s.deadline_secs, 30);
        assert_eq!(s.user, "postgres");
        assert_eq!(s.interval_secs, 5);
    }

    #[test]
    fn load_reads_a_settings_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preflight.yaml");
        std::fs::write(&path, "selector: app=kafka\nsettle_secs: 0\n").unwrap();

        let s = Settings::load(&path).unwrap();
        assert_eq!(s.selector, "app=kafka");
        assert_eq!(s.settle_secs, 0);
        assert_eq!(s.namespace, "learnflow");
    }

    #[test]
    fn load_rejects_malformed_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preflight.yaml");
        std::fs::write(&path, "interval_secs: [not, a, number]\n").unwrap();
        assert!(Settings::load(&path).is_err());
    }
}
