use std::sync::Arc;
use std::time::Duration;

use warden_core::config;
use warden_daemon::{api, probe, supervisor};

#[tokio::main]
async fn main() {
	tracing_subscriber::fmt().init();

	let config = config::load_config();
	let port = config.daemon.port;
	let health_interval = Duration::from_secs(config.daemon.health_interval_secs);

	let supervisor = match supervisor::Supervisor::new(config.apps) {
		Ok(supervisor) => supervisor,
		Err(e) => {
			tracing::error!("invalid configuration: {}", e);
			std::process::exit(1);
		}
	};

	{
		let sup = Arc::clone(&supervisor);
		tokio::spawn(async move {
			probe::run_health_loop(sup, health_interval).await;
		});
	}

	let app = api::router(Arc::clone(&supervisor));
	let addr = std::net::SocketAddr::from(([127, 0, 0, 1], port));
	let listener = match tokio::net::TcpListener::bind(addr).await {
		Ok(listener) => listener,
		Err(e) => {
			tracing::error!("failed to bind {}: {}", addr, e);
			std::process::exit(1);
		}
	};
	tracing::info!("listening on {}", addr);

	tokio::select! {
		result = axum::serve(listener, app) => {
			if let Err(e) = result {
				tracing::error!("server error: {}", e);
			}
		}
		_ = tokio::signal::ctrl_c() => {
			tracing::info!("shutting down");
		}
	}
}
