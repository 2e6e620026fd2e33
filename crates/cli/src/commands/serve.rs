//! Long-running mode: lifecycle driver plus status endpoints.

use tokio::sync::oneshot;
use tracing::{error, info};

use super::chromium_lifecycle;
use crate::cli::Settings;
use crate::error::Result;
use crate::server;

pub async fn run(settings: &Settings) -> Result<()> {
	let config = settings.lifecycle_config()?;
	let addr = settings.bind_addr()?;
	let listener = server::bind(addr).await?;

	let lifecycle = chromium_lifecycle(settings, config);
	info!(
		target = "wak.serve",
		session_file = %settings.session_file.display(),
		interactive = settings.interactive_login,
		"starting session keeper"
	);
	lifecycle.start();

	let (stop_tx, stop_rx) = oneshot::channel::<()>();
	let mut server = tokio::spawn(server::serve(listener, lifecycle.status(), async {
		let _ = stop_rx.await;
	}));

	let server_result = tokio::select! {
		_ = shutdown_signal() => {
			info!(target = "wak.serve", "shutdown requested");
			None
		}
		result = &mut server => Some(result),
	};

	// Release the browser before anything else so no Chromium process outlives us.
	lifecycle.shutdown().await;

	let result = match server_result {
		Some(result) => result,
		None => {
			let _ = stop_tx.send(());
			server.await
		}
	};
	match result {
		Ok(outcome) => outcome,
		Err(err) => {
			error!(target = "wak.serve", error = %err, "status server task panicked");
			Ok(())
		}
	}
}

async fn shutdown_signal() {
	let ctrl_c = async {
		if let Err(err) = tokio::signal::ctrl_c().await {
			error!(target = "wak.serve", error = %err, "failed to listen for ctrl-c");
			std::future::pending::<()>().await;
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
			Ok(mut signal) => {
				signal.recv().await;
			}
			Err(err) => {
				error!(target = "wak.serve", error = %err, "failed to listen for SIGTERM");
				std::future::pending::<()>().await;
			}
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {}
		_ = terminate => {}
	}
}
