use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Health of a managed app as of its most recent evaluation.
///
/// `Degraded` carries the HTTP status code the probe saw; `Error` carries the
/// transport failure; `Exited` carries the cause reported when the process
/// terminated on its own. Rendered to a display string at the API boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
	Unknown,
	NotApplicable,
	Healthy,
	Degraded(u16),
	Error(String),
	Stopped,
	Exited(String),
}

impl HealthStatus {
	pub fn is_healthy(&self) -> bool {
		matches!(self, HealthStatus::Healthy)
	}
}

impl fmt::Display for HealthStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			HealthStatus::Unknown => write!(f, "Unknown"),
			HealthStatus::NotApplicable => write!(f, "N/A"),
			HealthStatus::Healthy => write!(f, "Healthy"),
			HealthStatus::Degraded(code) => write!(f, "Degraded ({})", code),
			HealthStatus::Error(message) => write!(f, "Error: {}", message),
			HealthStatus::Stopped => write!(f, "Stopped"),
			HealthStatus::Exited(cause) => write!(f, "Exited: {}", cause),
		}
	}
}

impl Serialize for HealthStatus {
	fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.collect_str(self)
	}
}

/// Point-in-time copy of one managed app's externally visible state.
///
/// No process handles or channels leak through here; `output` is the trailing
/// captured text as retained by the app's bounded buffer.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessView {
	pub name: String,
	pub path: String,
	pub args: Vec<String>,
	pub health_url: Option<String>,
	pub running: bool,
	pub health_status: HealthStatus,
	pub health_last_check: Option<DateTime<Utc>>,
	pub output: String,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn health_status_display() {
		assert_eq!(HealthStatus::Unknown.to_string(), "Unknown");
		assert_eq!(HealthStatus::NotApplicable.to_string(), "N/A");
		assert_eq!(HealthStatus::Healthy.to_string(), "Healthy");
		assert_eq!(HealthStatus::Degraded(503).to_string(), "Degraded (503)");
		assert_eq!(
			HealthStatus::Error("connection refused".into()).to_string(),
			"Error: connection refused"
		);
		assert_eq!(HealthStatus::Stopped.to_string(), "Stopped");
		assert_eq!(
			HealthStatus::Exited("exit status: 1".into()).to_string(),
			"Exited: exit status: 1"
		);
	}

	#[test]
	fn health_status_serializes_as_display_string() {
		let value = serde_json::to_value(HealthStatus::Degraded(502)).unwrap();
		assert_eq!(value, serde_json::json!("Degraded (502)"));
	}

	#[test]
	fn process_view_serializes_flat() {
		let view = ProcessView {
			name: "echo".into(),
			path: "/bin/echo".into(),
			args: vec!["hi".into()],
			health_url: None,
			running: false,
			health_status: HealthStatus::Stopped,
			health_last_check: None,
			output: String::new(),
		};
		let value = serde_json::to_value(&view).unwrap();
		assert_eq!(value["health_status"], "Stopped");
		assert_eq!(value["running"], false);
		assert!(value["health_last_check"].is_null());
	}
}
