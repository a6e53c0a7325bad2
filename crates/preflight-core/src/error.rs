use thiserror::Error;

#[derive(Debug, Error)]
pub enum PreflightError {
    #[error("cluster query failed: {0}")]
    Probe(kubectl_driver::ProbeFailure),

    #[error("readiness wait timed out: {0}")]
    ReadinessTimeout(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, PreflightError>;
