use std::sync::Arc;
use std::time::Duration;

use warden_core::types::HealthStatus;

use crate::supervisor::Supervisor;

pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Issues a single bounded-timeout GET against an app's health URL and
/// classifies the result. Never returns an error; failures become status.
pub struct HealthProbe {
	client: reqwest::Client,
}

impl HealthProbe {
	pub fn new() -> Self {
		Self {
			client: reqwest::Client::new(),
		}
	}

	pub async fn probe(&self, url: Option<&str>) -> HealthStatus {
		let Some(url) = url else {
			return HealthStatus::NotApplicable;
		};
		match self.client.get(url).timeout(PROBE_TIMEOUT).send().await {
			Ok(response) => {
				let code = response.status();
				if code == reqwest::StatusCode::OK {
					HealthStatus::Healthy
				} else {
					HealthStatus::Degraded(code.as_u16())
				}
			}
			Err(e) => HealthStatus::Error(e.to_string()),
		}
	}
}

impl Default for HealthProbe {
	fn default() -> Self {
		Self::new()
	}
}

/// One pass over the roster: running apps get a network probe, stopped apps
/// are stamped `Stopped` without one. The roster is snapshotted under the
/// read lock first so a slow probe never blocks start/stop/query for others;
/// each result write is its own short write-lock acquisition.
pub async fn check_all(supervisor: &Arc<Supervisor>, probe: &HealthProbe) {
	let targets = supervisor.health_targets().await;
	for (name, url, running) in targets {
		if running {
			let status = probe.probe(url.as_deref()).await;
			match &status {
				HealthStatus::Error(message) => {
					tracing::warn!(app = %name, error = %message, "health check failed")
				}
				status => tracing::debug!(app = %name, %status, "health check"),
			}
			supervisor.record_health(&name, status).await;
		} else {
			supervisor.record_health(&name, HealthStatus::Stopped).await;
		}
	}
}

/// Periodic scheduling loop. Probe failures degrade a status; they never
/// abort the loop.
pub async fn run_health_loop(supervisor: Arc<Supervisor>, interval: Duration) {
	let probe = HealthProbe::new();
	loop {
		tokio::time::sleep(interval).await;
		check_all(&supervisor, &probe).await;
	}
}
