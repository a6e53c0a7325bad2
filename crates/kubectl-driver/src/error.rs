use thiserror::Error;

#[derive(Debug, Error)]
pub enum KubectlError {
    #[error("kubectl not found on PATH")]
    KubectlNotFound,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
