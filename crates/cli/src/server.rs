//! Read-only HTTP status endpoints.
//!
//! `GET /` answers whether the session is usable and `GET /health` is the
//! liveness probe for orchestrators. Both read the latest lifecycle snapshot
//! and never block on the lifecycle driver.

use std::future::Future;
use std::net::SocketAddr;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use tokio::net::TcpListener;
use tracing::info;
use wak::StatusReader;
use wak_protocol::{HealthBody, StatusBody};

use crate::error::{Result, WakError};

pub fn router(status: StatusReader) -> Router {
	Router::new().route("/", get(root)).route("/health", get(health)).with_state(status)
}

async fn root(State(status): State<StatusReader>) -> Json<StatusBody> {
	Json(StatusBody::from_ready(status.is_ready()))
}

async fn health(State(status): State<StatusReader>) -> Json<HealthBody> {
	let snapshot = status.snapshot();
	let mut body = HealthBody::new(snapshot.ready, Utc::now());
	body.state = Some(snapshot.state.to_string());
	body.last_error = snapshot.last_error;
	Json(body)
}

pub async fn bind(addr: SocketAddr) -> Result<TcpListener> {
	let listener = TcpListener::bind(addr).await.map_err(|source| WakError::Bind { addr, source })?;
	info!(target = "wak.server", %addr, "status server listening");
	Ok(listener)
}

/// Serves the status endpoints until `shutdown` resolves.
pub async fn serve(listener: TcpListener, status: StatusReader, shutdown: impl Future<Output = ()> + Send + 'static) -> Result<()> {
	axum::serve(listener, router(status))
		.with_graceful_shutdown(shutdown)
		.await
		.map_err(WakError::Serve)?;
	info!(target = "wak.server", "status server stopped");
	Ok(())
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use axum::body::{Body, to_bytes};
	use axum::http::{Request, StatusCode};
	use serde_json::Value;
	use tower::ServiceExt;
	use wak::fake::{FakeEngine, FakePage};
	use wak::{FileSessionStore, LifecycleConfig, LifecycleController, MarkerSet};

	use super::*;

	async fn get_json(status: StatusReader, uri: &str) -> Value {
		let response = router(status).oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap()).await.unwrap();
		assert_eq!(response.status(), StatusCode::OK);
		let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
		serde_json::from_slice(&bytes).unwrap()
	}

	fn lifecycle(dir: &tempfile::TempDir) -> (LifecycleController, wak::fake::FakeController) {
		let (engine, fake) = FakeEngine::new(MarkerSet::default());
		let store = FileSessionStore::new(dir.path().join("session.json"));
		(LifecycleController::new(Arc::new(engine), Arc::new(store), LifecycleConfig::default()), fake)
	}

	#[tokio::test]
	async fn root_reports_initializing_before_start() {
		let dir = tempfile::tempdir().unwrap();
		let (lifecycle, _fake) = lifecycle(&dir);

		let body = get_json(lifecycle.status(), "/").await;
		assert_eq!(body["status"], "initializing");
		assert_eq!(body["message"], "Session is initializing");
	}

	#[tokio::test]
	async fn health_reports_ready_session() {
		let dir = tempfile::tempdir().unwrap();
		let (lifecycle, fake) = lifecycle(&dir);
		fake.push(FakePage::ready());
		lifecycle.start();
		lifecycle.status().wait_for(|s| s.ready).await.unwrap();

		let body = get_json(lifecycle.status(), "/health").await;
		assert_eq!(body["status"], "ok");
		assert_eq!(body["whatsappReady"], true);
		assert_eq!(body["state"], "ready");
		assert!(body.get("lastError").is_none());
		assert!(body["timestamp"].as_str().unwrap().parse::<chrono::DateTime<Utc>>().is_ok());

		let body = get_json(lifecycle.status(), "/").await;
		assert_eq!(body["status"], "ready");
		assert_eq!(body["message"], "WhatsApp headless session is running");
		lifecycle.shutdown().await;
	}

	#[tokio::test(start_paused = true)]
	async fn health_exposes_last_error_while_retrying() {
		let dir = tempfile::tempdir().unwrap();
		let (lifecycle, fake) = lifecycle(&dir);
		fake.push(FakePage::launch_failure("chrome not found"));
		lifecycle.start();
		lifecycle.status().wait_for(|s| s.last_error.is_some()).await.unwrap();

		let body = get_json(lifecycle.status(), "/health").await;
		assert_eq!(body["whatsappReady"], false);
		assert_eq!(body["state"], "retrying");
		assert!(body["lastError"].as_str().unwrap().contains("chrome not found"));
		lifecycle.shutdown().await;
	}

	#[tokio::test]
	async fn unknown_route_is_not_found() {
		let dir = tempfile::tempdir().unwrap();
		let (lifecycle, _fake) = lifecycle(&dir);
		let response = router(lifecycle.status())
			.oneshot(Request::builder().uri("/qr").body(Body::empty()).unwrap())
			.await
			.unwrap();
		assert_eq!(response.status(), StatusCode::NOT_FOUND);
	}
}
