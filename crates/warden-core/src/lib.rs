//! # warden-core
//!
//! Core types and configuration for the warden process supervisor.
//!
//! Holds the passive pieces shared by the daemon and anything that talks to
//! it: the app roster configuration, the health-status model, the snapshot
//! projection returned by queries, and the error taxonomy.

pub mod config;
pub mod error;
pub mod types;

pub use config::{AppConfig, Config, DaemonConfig};
pub use error::{ConfigError, SupervisorError};
pub use types::{HealthStatus, ProcessView};
