//! Browser capability contract driven by the lifecycle.
//!
//! The lifecycle never talks to a browser directly. It launches a handle
//! through an [`AutomationEngine`] and uses only the operations below, which
//! keeps the state machine testable with [`crate::fake`] and lets the
//! Chromium backend live in its own crate.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use wak_protocol::CookieRecord;

use crate::error::AutomationError;

/// Flags applied when launching a browser context.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchOptions {
	pub headless: bool,
	/// Keep the Chromium sandbox enabled. Containers usually need it off.
	pub sandbox: bool,
	/// Explicit browser binary; discovered from the environment when `None`.
	pub executable: Option<PathBuf>,
	/// Profile directory; a throwaway directory is used when `None`.
	pub user_data_dir: Option<PathBuf>,
	pub extra_args: Vec<String>,
	pub launch_timeout: Duration,
}

impl Default for LaunchOptions {
	fn default() -> Self {
		Self {
			headless: true,
			sandbox: false,
			executable: None,
			user_data_dir: None,
			extra_args: Vec::new(),
			launch_timeout: Duration::from_secs(30),
		}
	}
}

/// Starts browser contexts.
#[async_trait]
pub trait AutomationEngine: Send + Sync {
	async fn launch(&self, options: &LaunchOptions) -> Result<Box<dyn AutomationHandle>, AutomationError>;
}

/// One launched browser context with a single page.
///
/// Implementations must tolerate `close` being called on an already closed
/// handle.
#[async_trait]
pub trait AutomationHandle: Send + Sync {
	/// Loads `url` in the page, failing after `timeout`.
	async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), AutomationError>;

	/// Resolves once an element matching `selector` exists, failing after `timeout`.
	async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<(), AutomationError>;

	async fn set_cookies(&self, cookies: &[CookieRecord]) -> Result<(), AutomationError>;

	async fn cookies(&self) -> Result<Vec<CookieRecord>, AutomationError>;

	/// Cheap liveness check; returns the page title.
	async fn probe(&self) -> Result<String, AutomationError>;

	/// `true` once the underlying browser connection is gone.
	fn is_closed(&self) -> bool;

	async fn close(&self) -> Result<(), AutomationError>;
}
