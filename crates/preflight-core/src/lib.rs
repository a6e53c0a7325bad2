pub mod checks;
pub mod config;
pub mod error;
pub mod health;
pub mod migrate;
pub mod observation;
pub mod poll;

pub use checks::ClusterChecks;
pub use config::Settings;
pub use error::{PreflightError, Result};
pub use health::{aggregate, HealthVerdict};
pub use migrate::{MigrationFailure, MigrationReport, MigrationSession, MigrationStage};
pub use observation::{Observation, ResourceKind};
pub use poll::{poll_until, PollTimeout};
