use serde::Deserialize;
use std::path::PathBuf;

/// One managed program: name (unique key), executable path, arguments, and an
/// optional health-check URL. Never mutated after load.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
	pub name: String,
	pub path: String,
	#[serde(default)]
	pub args: Vec<String>,
	pub health_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
	#[serde(default)]
	pub daemon: DaemonConfig,
	#[serde(default)]
	pub apps: Vec<AppConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DaemonConfig {
	#[serde(default = "default_port")]
	pub port: u16,
	#[serde(default = "default_health_interval")]
	pub health_interval_secs: u64,
}

impl Default for DaemonConfig {
	fn default() -> Self {
		Self {
			port: default_port(),
			health_interval_secs: default_health_interval(),
		}
	}
}

fn default_port() -> u16 {
	6978
}
fn default_health_interval() -> u64 {
	5
}

pub fn config_path() -> PathBuf {
	if let Ok(path) = std::env::var("WARDEN_CONFIG") {
		return PathBuf::from(path);
	}
	config_dir().join("warden.toml")
}

pub fn config_dir() -> PathBuf {
	if let Ok(dir) = std::env::var("XDG_CONFIG_HOME") {
		PathBuf::from(dir).join("warden")
	} else if let Ok(home) = std::env::var("HOME") {
		PathBuf::from(home).join(".config").join("warden")
	} else {
		PathBuf::from("/tmp/warden/config")
	}
}

/// Loads the roster and daemon settings, falling back to defaults (and an
/// empty roster) when the file is missing or malformed.
pub fn load_config() -> Config {
	let path = config_path();
	if path.exists() {
		match std::fs::read_to_string(&path) {
			Ok(content) => match toml::from_str(&content) {
				Ok(config) => return config,
				Err(e) => eprintln!("warning: failed to parse {}: {}", path.display(), e),
			},
			Err(e) => eprintln!("warning: failed to read {}: {}", path.display(), e),
		}
	}
	Config::default()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parse_full_config() {
		let config: Config = toml::from_str(
			r#"
			[daemon]
			port = 7000
			health_interval_secs = 10

			[[apps]]
			name = "Trombone"
			path = "/opt/trombone/trombone"
			args = ["--port", "6973"]
			health_url = "http://127.0.0.1:6973/health"

			[[apps]]
			name = "Echo"
			path = "/bin/echo"
			"#,
		)
		.unwrap();

		assert_eq!(config.daemon.port, 7000);
		assert_eq!(config.daemon.health_interval_secs, 10);
		assert_eq!(config.apps.len(), 2);
		assert_eq!(config.apps[0].name, "Trombone");
		assert_eq!(config.apps[0].args, vec!["--port", "6973"]);
		assert_eq!(
			config.apps[0].health_url.as_deref(),
			Some("http://127.0.0.1:6973/health")
		);
		assert_eq!(config.apps[1].health_url, None);
		assert!(config.apps[1].args.is_empty());
	}

	#[test]
	fn empty_config_uses_defaults() {
		let config: Config = toml::from_str("").unwrap();
		assert_eq!(config.daemon.port, 6978);
		assert_eq!(config.daemon.health_interval_secs, 5);
		assert!(config.apps.is_empty());
	}
}
