use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use warden_core::error::SupervisorError;
use warden_core::types::ProcessView;

use crate::supervisor::Supervisor;

const DEFAULT_TAIL_LINES: usize = 50;

#[derive(Clone)]
pub struct AppState {
	pub supervisor: Arc<Supervisor>,
}

pub fn router(supervisor: Arc<Supervisor>) -> Router {
	let state = AppState { supervisor };

	Router::new()
		.route("/api/apps", get(list_apps))
		.route("/api/apps/{name}", get(app_detail))
		.route("/api/apps/{name}/start", post(start_app))
		.route("/api/apps/{name}/stop", post(stop_app))
		.route("/api/apps/{name}/output", get(app_output))
		.route("/ws/output/{name}", get(ws_output))
		.layer(CorsLayer::permissive())
		.with_state(state)
}

#[derive(Serialize)]
struct ActionResponse {
	status: &'static str,
	message: String,
}

#[derive(Serialize)]
struct ErrorResponse {
	error: String,
}

fn not_found(name: &str) -> (StatusCode, Json<ErrorResponse>) {
	(
		StatusCode::NOT_FOUND,
		Json(ErrorResponse {
			error: format!("app {} not found", name),
		}),
	)
}

fn error_response(err: SupervisorError) -> (StatusCode, Json<ErrorResponse>) {
	let code = match &err {
		SupervisorError::NotFound(_) => StatusCode::NOT_FOUND,
		SupervisorError::AlreadyRunning(_)
		| SupervisorError::NotRunning(_)
		| SupervisorError::OutputClaimed(_) => StatusCode::CONFLICT,
		SupervisorError::Launch { .. } | SupervisorError::Signal { .. } => {
			StatusCode::INTERNAL_SERVER_ERROR
		}
	};
	(code, Json(ErrorResponse { error: err.to_string() }))
}

async fn list_apps(State(state): State<AppState>) -> Json<Vec<ProcessView>> {
	Json(state.supervisor.snapshot_all().await)
}

async fn app_detail(
	State(state): State<AppState>,
	Path(name): Path<String>,
) -> Result<Json<ProcessView>, (StatusCode, Json<ErrorResponse>)> {
	state
		.supervisor
		.snapshot(&name)
		.await
		.map(Json)
		.ok_or_else(|| not_found(&name))
}

async fn start_app(
	State(state): State<AppState>,
	Path(name): Path<String>,
) -> Result<Json<ActionResponse>, (StatusCode, Json<ErrorResponse>)> {
	state
		.supervisor
		.start(&name)
		.await
		.map(|_| {
			Json(ActionResponse {
				status: "success",
				message: format!("started {}", name),
			})
		})
		.map_err(error_response)
}

async fn stop_app(
	State(state): State<AppState>,
	Path(name): Path<String>,
) -> Result<Json<ActionResponse>, (StatusCode, Json<ErrorResponse>)> {
	state
		.supervisor
		.stop(&name)
		.await
		.map(|_| {
			Json(ActionResponse {
				status: "success",
				message: format!("stopped {}", name),
			})
		})
		.map_err(error_response)
}

#[derive(Deserialize)]
struct OutputParams {
	lines: Option<usize>,
}

async fn app_output(
	State(state): State<AppState>,
	Path(name): Path<String>,
	Query(params): Query<OutputParams>,
) -> Result<String, (StatusCode, Json<ErrorResponse>)> {
	let lines = params.lines.unwrap_or(DEFAULT_TAIL_LINES);
	state
		.supervisor
		.tail(&name, lines)
		.await
		.ok_or_else(|| not_found(&name))
}

async fn ws_output(
	State(state): State<AppState>,
	Path(name): Path<String>,
	ws: WebSocketUpgrade,
) -> impl IntoResponse {
	ws.on_upgrade(move |socket| handle_ws_output(socket, state, name))
}

/// Sends the current buffer contents, then forwards live chunks from the
/// launch's output channel until either side closes. The channel is single
/// consumer; a second tail on the same launch is refused upstream.
async fn handle_ws_output(mut socket: WebSocket, state: AppState, name: String) {
	let Some(snapshot) = state.supervisor.snapshot(&name).await else {
		return;
	};
	if !snapshot.output.is_empty() {
		if socket.send(Message::Text(snapshot.output.into())).await.is_err() {
			return;
		}
	}

	let mut rx = match state.supervisor.subscribe_output(&name).await {
		Ok(rx) => rx,
		Err(_) => return,
	};

	while let Some(chunk) = rx.recv().await {
		if socket.send(Message::Text(chunk.into())).await.is_err() {
			break;
		}
	}
}
