//! Interactive session generator: headed browser, QR scan, save, exit.

use tracing::info;
use wak::{LifecycleError, StoredSession};

use super::chromium_lifecycle;
use crate::cli::Settings;
use crate::error::{Result, WakError};

pub async fn run(settings: &Settings) -> Result<()> {
	let mut config = settings.lifecycle_config()?;
	config.launch.headless = false;
	config.interactive_login = true;
	let login_timeout = config.login_timeout;
	let url = config.target_url.clone();
	let lifecycle = chromium_lifecycle(settings, config);

	println!("Opening {url} in a browser window.");
	println!("Scan the QR code with WhatsApp on your phone (Settings > Linked devices).");
	println!("Waiting up to {}s for the chat list to appear...", login_timeout.as_secs());

	// Ctrl-C shuts the controller down, which interrupts the attempt and
	// closes the browser before acquire_once returns.
	let interrupt = tokio::spawn({
		let lifecycle = lifecycle.clone();
		async move {
			if tokio::signal::ctrl_c().await.is_ok() {
				info!(target = "wak.login", "login cancelled");
				lifecycle.shutdown().await;
			}
		}
	});
	let result = lifecycle.acquire_once(true).await;
	interrupt.abort();

	let handle = match result {
		Ok(handle) => handle,
		Err(LifecycleError::Cancelled) => return Err(WakError::Cancelled),
		Err(err) => return Err(err.into()),
	};
	lifecycle.release(handle).await;

	let store = settings.session_store();
	match store.inspect() {
		StoredSession::Present(session) => {
			println!("Session with {} cookies saved to {}", session.cookies().len(), store.path().display());
			Ok(())
		}
		_ => Err(WakError::SessionNotSaved(store.path().display().to_string())),
	}
}
