//! `kubectl-driver` — blocking driver for the kubectl subprocess boundary.
//!
//! Everything this workspace knows about the cluster flows through one
//! external binary. This crate keeps that boundary narrow and single-shot:
//!
//! ```text
//! ClusterCtl trait
//!     │
//!     ├── Kubectl      ← spawns `kubectl -n <ns> …`, one process per call,
//!     │                  hard timeout, kills and reaps on expiry
//!     └── ScriptedCtl  ← in-memory fake replaying scripted ProbeResults
//!
//! ProbeResult          ← ok(trimmed stdout) | failed(cause + diagnostics)
//! types::*             ← typed views over `kubectl get … -o json`
//! ```
//!
//! No call here retries — bounded retry lives in the poller upstream — and
//! no failure escapes as a panic or error: probes fold every failure mode
//! into [`ProbeResult::Failed`] so callers branch uniformly.

pub mod error;
pub mod exec;
pub mod fake;
pub mod session;
pub mod types;


pub use error::KubectlError;
pub use exec::{ClusterCtl, FailureCause, Kubectl, ProbeFailure, ProbeResult};
pub use fake::ScriptedCtl;
pub use session::SessionFailure;
pub use types::{Claim, ClaimList, Pod, PodList, Service, ServiceList};
