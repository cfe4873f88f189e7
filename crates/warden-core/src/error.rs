use thiserror::Error;

/// Errors returned synchronously by supervisor control operations.
///
/// Probe failures are deliberately absent: a failed health check is recorded
/// as a [`HealthStatus`](crate::types::HealthStatus) value, never surfaced as
/// an error to any caller.
#[derive(Debug, Error)]
pub enum SupervisorError {
	#[error("app {0} not found")]
	NotFound(String),
	#[error("app {0} is already running")]
	AlreadyRunning(String),
	#[error("app {0} is not running")]
	NotRunning(String),
	#[error("failed to start app {name}: {source}")]
	Launch {
		name: String,
		#[source]
		source: std::io::Error,
	},
	#[error("failed to signal app {name}: {message}")]
	Signal { name: String, message: String },
	#[error("output stream for app {0} is already claimed")]
	OutputClaimed(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("duplicate app name: {0}")]
	DuplicateName(String),
}
