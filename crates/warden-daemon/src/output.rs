use std::sync::Arc;

use tokio::io::AsyncReadExt;
use tokio::process::{ChildStderr, ChildStdout};

use crate::supervisor::Supervisor;

/// Buffer cap and post-trim size.
pub const MAX_BUFFER_BYTES: usize = 4096;
pub const TRIM_TO_BYTES: usize = 2048;
/// Live-tail channel capacity; a full channel drops the newest chunk.
pub const OUTPUT_CHANNEL_CAPACITY: usize = 100;

const READ_CHUNK_BYTES: usize = 1024;

/// Bounded buffer holding the most recent combined output of one child.
#[derive(Debug, Default)]
pub struct OutputBuffer {
	data: Vec<u8>,
}

impl OutputBuffer {
	pub fn new() -> Self {
		Self { data: Vec::new() }
	}

	/// Appends a chunk, keeping only the trailing [`TRIM_TO_BYTES`] once the
	/// buffer grows past [`MAX_BUFFER_BYTES`]. No line-boundary alignment.
	pub fn push(&mut self, chunk: &[u8]) {
		self.data.extend_from_slice(chunk);
		if self.data.len() > MAX_BUFFER_BYTES {
			let excess = self.data.len() - TRIM_TO_BYTES;
			self.data.drain(..excess);
		}
	}

	pub fn contents(&self) -> String {
		String::from_utf8_lossy(&self.data).into_owned()
	}

	/// Last `max_lines` newline-delimited lines, in original order. A line
	/// that predates the trim point comes back truncated.
	pub fn tail(&self, max_lines: usize) -> String {
		let contents = self.contents();
		let trimmed = contents.strip_suffix('\n').unwrap_or(&contents);
		if trimmed.is_empty() {
			return String::new();
		}
		let lines: Vec<&str> = trimmed.split('\n').collect();
		let start = lines.len().saturating_sub(max_lines);
		lines[start..].join("\n")
	}

	pub fn reset(&mut self) {
		self.data.clear();
	}

	pub fn len(&self) -> usize {
		self.data.len()
	}

	pub fn is_empty(&self) -> bool {
		self.data.is_empty()
	}
}

/// Spawns the capture task for one launch: drains stdout and stderr
/// concurrently until end-of-stream or read error. Liveness is the
/// exit-waiter's call, never this task's.
pub(crate) fn spawn_capture(
	supervisor: Arc<Supervisor>,
	name: String,
	stdout: Option<ChildStdout>,
	stderr: Option<ChildStderr>,
) {
	tokio::spawn(async move {
		match (stdout, stderr) {
			(Some(out), Some(err)) => {
				tokio::join!(pump(&supervisor, &name, out), pump(&supervisor, &name, err));
			}
			(Some(out), None) => pump(&supervisor, &name, out).await,
			(None, Some(err)) => pump(&supervisor, &name, err).await,
			(None, None) => {}
		}
	});
}

async fn pump<R: tokio::io::AsyncRead + Unpin>(supervisor: &Arc<Supervisor>, name: &str, mut reader: R) {
	let mut buf = [0u8; READ_CHUNK_BYTES];
	loop {
		match reader.read(&mut buf).await {
			Ok(0) => break,
			Ok(n) => supervisor.append_output(name, &buf[..n]).await,
			Err(e) => {
				tracing::warn!(app = name, error = %e, "output read failed");
				break;
			}
		}
	}
}
