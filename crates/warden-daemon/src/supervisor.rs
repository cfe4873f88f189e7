use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, RwLock};

use warden_core::config::AppConfig;
use warden_core::error::{ConfigError, SupervisorError};
use warden_core::types::{HealthStatus, ProcessView};

use crate::output::{self, OutputBuffer, OUTPUT_CHANNEL_CAPACITY};

/// Owns every managed app's record and serializes all state changes behind
/// one reader/writer lock. Records are created once at construction and live
/// for the supervisor's entire lifetime.
pub struct Supervisor {
	apps: RwLock<HashMap<String, ProcessRecord>>,
	order: Vec<String>,
	next_generation: AtomicU64,
}

struct ProcessRecord {
	config: AppConfig,
	running: bool,
	health: HealthStatus,
	health_last_check: Option<DateTime<Utc>>,
	output: OutputBuffer,
	output_tx: mpsc::Sender<String>,
	output_rx: Option<mpsc::Receiver<String>>,
	live: Option<LiveHandle>,
}

/// Identity of one launch. The `Child` itself is owned by the exit-waiter
/// task; the record keeps only the pid (for signalling) and a generation
/// token so a late exit notification can detect it has been superseded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LiveHandle {
	pid: u32,
	generation: u64,
}

impl ProcessRecord {
	fn new(config: AppConfig) -> Self {
		let (output_tx, output_rx) = mpsc::channel(OUTPUT_CHANNEL_CAPACITY);
		Self {
			config,
			running: false,
			health: HealthStatus::Unknown,
			health_last_check: None,
			output: OutputBuffer::new(),
			output_tx,
			output_rx: Some(output_rx),
			live: None,
		}
	}

	fn view(&self) -> ProcessView {
		ProcessView {
			name: self.config.name.clone(),
			path: self.config.path.clone(),
			args: self.config.args.clone(),
			health_url: self.config.health_url.clone(),
			running: self.running,
			health_status: self.health.clone(),
			health_last_check: self.health_last_check,
			output: self.output.contents(),
		}
	}
}

impl Supervisor {
	/// Builds a record for every configured app. Duplicate names are a
	/// construction error; the loader is expected to have caught them, but
	/// the map key must be unique so this fails fast rather than silently
	/// dropping a roster entry.
	pub fn new(configs: Vec<AppConfig>) -> Result<Arc<Self>, ConfigError> {
		let mut apps = HashMap::new();
		let mut order = Vec::with_capacity(configs.len());
		for config in configs {
			if apps.contains_key(&config.name) {
				return Err(ConfigError::DuplicateName(config.name));
			}
			order.push(config.name.clone());
			apps.insert(config.name.clone(), ProcessRecord::new(config));
		}
		Ok(Arc::new(Self {
			apps: RwLock::new(apps),
			order,
			next_generation: AtomicU64::new(1),
		}))
	}

	/// Launches the app's executable with piped stdout/stderr and spawns the
	/// capture and exit-waiter tasks for this launch. Returns once the OS
	/// process exists, not once it is healthy.
	pub async fn start(self: &Arc<Self>, name: &str) -> Result<(), SupervisorError> {
		// Pre-flight check; the spawn below must not happen under the lock.
		let config = {
			let apps = self.apps.read().await;
			let record = apps
				.get(name)
				.ok_or_else(|| SupervisorError::NotFound(name.to_string()))?;
			if record.running {
				return Err(SupervisorError::AlreadyRunning(name.to_string()));
			}
			record.config.clone()
		};

		let mut child = Command::new(&config.path)
			.args(&config.args)
			.stdout(Stdio::piped())
			.stderr(Stdio::piped())
			.spawn()
			.map_err(|source| SupervisorError::Launch {
				name: name.to_string(),
				source,
			})?;

		let stdout = child.stdout.take();
		let stderr = child.stderr.take();
		let pid = child.id().unwrap_or(0);
		let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);

		{
			let mut apps = self.apps.write().await;
			let record = match apps.get_mut(name) {
				Some(record) => record,
				None => {
					reap(child);
					return Err(SupervisorError::NotFound(name.to_string()));
				}
			};
			if record.running {
				// Lost a concurrent start race; ours is the extra child.
				reap(child);
				return Err(SupervisorError::AlreadyRunning(name.to_string()));
			}
			record.running = true;
			record.live = Some(LiveHandle { pid, generation });
			record.output.reset();
			let (tx, rx) = mpsc::channel(OUTPUT_CHANNEL_CAPACITY);
			record.output_tx = tx;
			record.output_rx = Some(rx);
		}

		output::spawn_capture(Arc::clone(self), name.to_string(), stdout, stderr);

		let sup = Arc::clone(self);
		let app = name.to_string();
		tokio::spawn(async move {
			wait_for_exit(sup, app, generation, child).await;
		});

		tracing::info!(app = name, pid, "started");
		Ok(())
	}

	/// Sends SIGTERM to the app's process and immediately marks it stopped.
	/// Does not wait for the exit-waiter to observe the termination; that
	/// task detects its handle has been superseded and writes nothing.
	pub async fn stop(&self, name: &str) -> Result<(), SupervisorError> {
		let mut apps = self.apps.write().await;
		let record = apps
			.get_mut(name)
			.ok_or_else(|| SupervisorError::NotFound(name.to_string()))?;
		let handle = match record.live {
			Some(handle) if record.running => handle,
			_ => return Err(SupervisorError::NotRunning(name.to_string())),
		};

		signal_terminate(handle.pid).map_err(|e| SupervisorError::Signal {
			name: name.to_string(),
			message: e.to_string(),
		})?;

		record.running = false;
		record.health = HealthStatus::Stopped;
		record.live = None;
		tracing::info!(app = name, pid = handle.pid, "stopped");
		Ok(())
	}

	/// Immutable copy of one record, taken atomically under the read lock.
	pub async fn snapshot(&self, name: &str) -> Option<ProcessView> {
		let apps = self.apps.read().await;
		apps.get(name).map(ProcessRecord::view)
	}

	/// Snapshots every record in configuration order. Each record is
	/// individually consistent; no cross-record atomicity is implied.
	pub async fn snapshot_all(&self) -> Vec<ProcessView> {
		let apps = self.apps.read().await;
		self.order
			.iter()
			.filter_map(|name| apps.get(name).map(ProcessRecord::view))
			.collect()
	}

	/// Trailing `max_lines` newline-delimited lines of the app's current
	/// output buffer. Lines older than the buffer's trim point may be
	/// truncated; they are returned as retained.
	pub async fn tail(&self, name: &str, max_lines: usize) -> Option<String> {
		let apps = self.apps.read().await;
		apps.get(name).map(|record| record.output.tail(max_lines))
	}

	/// Claims the live-tail receiver for the app's current launch. Only one
	/// consumer may hold it; a new start installs a fresh channel.
	pub async fn subscribe_output(
		&self,
		name: &str,
	) -> Result<mpsc::Receiver<String>, SupervisorError> {
		let mut apps = self.apps.write().await;
		let record = apps
			.get_mut(name)
			.ok_or_else(|| SupervisorError::NotFound(name.to_string()))?;
		record
			.output_rx
			.take()
			.ok_or_else(|| SupervisorError::OutputClaimed(name.to_string()))
	}

	/// Appends a captured chunk to the app's buffer and best-effort publishes
	/// it to the live-tail channel. A full (or unclaimed-and-dropped) channel
	/// drops the chunk rather than blocking the reader task.
	pub(crate) async fn append_output(&self, name: &str, chunk: &[u8]) {
		let mut apps = self.apps.write().await;
		if let Some(record) = apps.get_mut(name) {
			record.output.push(chunk);
			let text = String::from_utf8_lossy(chunk).into_owned();
			let _ = record.output_tx.try_send(text);
		}
	}

	/// Roster snapshot for the periodic health checker: (name, health URL,
	/// running). Taken under the read lock so slow probes never hold it.
	pub(crate) async fn health_targets(&self) -> Vec<(String, Option<String>, bool)> {
		let apps = self.apps.read().await;
		self.order
			.iter()
			.filter_map(|name| apps.get(name))
			.map(|record| {
				(
					record.config.name.clone(),
					record.config.health_url.clone(),
					record.running,
				)
			})
			.collect()
	}

	/// Records a health evaluation and stamps its completion time.
	pub(crate) async fn record_health(&self, name: &str, status: HealthStatus) {
		let mut apps = self.apps.write().await;
		if let Some(record) = apps.get_mut(name) {
			record.health = status;
			record.health_last_check = Some(Utc::now());
		}
	}
}

/// Awaits the termination of one specific launch. If the record's handle
/// still matches this generation, records the exit; otherwise a newer start
/// (or an explicit stop) owns the record and this waiter writes nothing.
async fn wait_for_exit(supervisor: Arc<Supervisor>, name: String, generation: u64, mut child: Child) {
	let result = child.wait().await;

	let mut apps = supervisor.apps.write().await;
	let Some(record) = apps.get_mut(&name) else {
		return;
	};
	if record.live.map(|handle| handle.generation) != Some(generation) {
		tracing::debug!(app = %name, generation, "exit notification superseded");
		return;
	}

	record.running = false;
	record.live = None;
	record.health = match &result {
		Ok(status) if status.success() => {
			tracing::info!(app = %name, "exited normally");
			HealthStatus::Stopped
		}
		Ok(status) => {
			tracing::warn!(app = %name, %status, "exited with error");
			HealthStatus::Exited(status.to_string())
		}
		Err(e) => {
			tracing::warn!(app = %name, error = %e, "wait failed");
			HealthStatus::Exited(e.to_string())
		}
	};
}

fn signal_terminate(pid: u32) -> Result<(), nix::Error> {
	use nix::sys::signal::{kill, Signal};
	use nix::unistd::Pid;
	kill(Pid::from_raw(pid as i32), Signal::SIGTERM)
}

/// Kills and reaps a child that lost a start race so it neither lingers nor
/// leaves a zombie.
fn reap(mut child: Child) {
	let _ = child.start_kill();
	tokio::spawn(async move {
		let _ = child.wait().await;
	});
}
