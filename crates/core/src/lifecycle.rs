//! The session lifecycle state machine.
//!
//! A single driver task owns the browser handle and is the only writer of
//! the published status. It moves through
//! `Launching -> AwaitingMarker -> Ready`, falls back to `Retrying` after a
//! failed attempt, and relaunches straight from `Degraded` when a ready
//! session stops answering keep-alive probes.
//!
//! Every path out of a state that holds a handle releases it, including
//! shutdown: [`LifecycleController::shutdown`] cancels the driver and waits
//! for it to close the browser before returning.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use wak_protocol::CookieRecord;

use crate::automation::{AutomationEngine, AutomationHandle};
use crate::config::LifecycleConfig;
use crate::detect::{Marker, race_markers};
use crate::error::{AutomationError, LifecycleError, Result};
use crate::health::HealthMonitor;
use crate::session::Session;
use crate::status::{LifecycleState, StatusPublisher, StatusReader};
use crate::store::SessionStore;

/// Owns the lifecycle of one browser session.
///
/// Cheap to clone; clones share the same driver and status.
#[derive(Clone)]
pub struct LifecycleController {
	inner: Arc<Inner>,
}

struct Inner {
	engine: Arc<dyn AutomationEngine>,
	store: Arc<dyn SessionStore>,
	config: LifecycleConfig,
	status: StatusPublisher,
	reader: StatusReader,
	started: AtomicBool,
	cancel: CancellationToken,
	reinit_tx: mpsc::Sender<()>,
	reinit_rx: Mutex<Option<mpsc::Receiver<()>>>,
	driver: Mutex<Option<JoinHandle<()>>>,
}

/// Why the driver left `Ready`.
enum ReadyExit {
	Shutdown,
	ConnectionLost(LifecycleError),
	Reinit,
}

impl LifecycleController {
	pub fn new(engine: Arc<dyn AutomationEngine>, store: Arc<dyn SessionStore>, config: LifecycleConfig) -> Self {
		let status = StatusPublisher::new();
		let reader = status.reader();
		let (reinit_tx, reinit_rx) = mpsc::channel(1);
		Self {
			inner: Arc::new(Inner {
				engine,
				store,
				config,
				status,
				reader,
				started: AtomicBool::new(false),
				cancel: CancellationToken::new(),
				reinit_tx,
				reinit_rx: Mutex::new(Some(reinit_rx)),
				driver: Mutex::new(None),
			}),
		}
	}

	pub fn status(&self) -> StatusReader {
		self.inner.reader.clone()
	}

	/// Spawns the lifecycle driver.
	///
	/// Returns `false` without doing anything if the driver was already
	/// started or the controller has been shut down. Must be called from
	/// within a Tokio runtime.
	pub fn start(&self) -> bool {
		if self.inner.cancel.is_cancelled() {
			debug!(target = "wak.lifecycle", "start ignored after shutdown");
			return false;
		}
		if self.inner.started.swap(true, Ordering::SeqCst) {
			debug!(target = "wak.lifecycle", "start ignored; driver already running");
			return false;
		}
		let Some(reinit_rx) = self.inner.reinit_rx.lock().take() else {
			return false;
		};

		let mut driver = self.inner.driver.lock();
		let inner = Arc::clone(&self.inner);
		*driver = Some(tokio::spawn(inner.drive(reinit_rx)));
		info!(target = "wak.lifecycle", url = %self.inner.config.target_url, "session lifecycle started");
		true
	}

	/// Asks a ready session to relaunch from scratch.
	///
	/// Accepted only in `Ready`, and at most one request is pending at a
	/// time. Returns whether the request was queued.
	pub fn request_reinit(&self) -> bool {
		if self.inner.reader.state() != LifecycleState::Ready {
			debug!(target = "wak.lifecycle", state = %self.inner.reader.state(), "reinit ignored; session not ready");
			return false;
		}
		match self.inner.reinit_tx.try_send(()) {
			Ok(()) => {
				info!(target = "wak.lifecycle", "reinitialization requested");
				true
			}
			Err(_) => {
				debug!(target = "wak.lifecycle", "reinit already pending");
				false
			}
		}
	}

	/// Stops the driver and waits until it has released the browser.
	///
	/// A launch in flight is allowed to finish so its handle can be closed.
	/// Idempotent; the status ends in `Idle`.
	pub async fn shutdown(&self) {
		self.inner.cancel.cancel();
		let driver = self.inner.driver.lock().take();
		if let Some(driver) = driver {
			info!(target = "wak.lifecycle", "waiting for session driver to stop");
			if let Err(err) = driver.await {
				warn!(target = "wak.lifecycle", error = %err, "session driver ended abnormally");
			}
		}
		self.inner.status.transition(LifecycleState::Idle);
	}

	/// Runs a single initialization attempt outside the driver and returns
	/// the live handle.
	///
	/// Restores the stored session, detects the page state, optionally waits
	/// for a human to complete the login challenge, and persists the
	/// resulting cookies. The handle is released if any step fails, and
	/// [`Self::shutdown`] interrupts the attempt with
	/// [`LifecycleError::Cancelled`] after releasing it. Does not publish
	/// status, so it must not be mixed with [`Self::start`].
	pub async fn acquire_once(&self, interactive: bool) -> Result<Box<dyn AutomationHandle>> {
		let handle = self.inner.launch().await?;
		let established = tokio::select! {
			biased;
			_ = self.inner.cancel.cancelled() => Err(LifecycleError::Cancelled),
			result = self.inner.establish(handle.as_ref(), interactive) => result,
		};
		match established {
			Ok(()) => Ok(handle),
			Err(err) => {
				self.inner.release(handle).await;
				Err(err)
			}
		}
	}

	/// Closes `handle`, bounded by the configured close timeout.
	pub async fn release(&self, handle: Box<dyn AutomationHandle>) {
		self.inner.release(handle).await;
	}
}

impl Inner {
	async fn drive(self: Arc<Self>, mut reinit_rx: mpsc::Receiver<()>) {
		let monitor = HealthMonitor::new(self.config.keep_alive_interval, self.config.probe_timeout);
		let mut failures: u32 = 0;

		while !self.cancel.is_cancelled() {
			self.status.transition(LifecycleState::Launching);
			let handle = match self.launch().await {
				Ok(handle) => handle,
				Err(err) => {
					failures = failures.saturating_add(1);
					if self.wait_retry(&err, failures).await {
						continue;
					}
					break;
				}
			};
			if self.cancel.is_cancelled() {
				self.release(handle).await;
				break;
			}

			self.status.transition(LifecycleState::AwaitingMarker);
			let established = tokio::select! {
				biased;
				_ = self.cancel.cancelled() => None,
				result = self.establish(handle.as_ref(), self.config.interactive_login) => Some(result),
			};
			match established {
				None => {
					self.release(handle).await;
					break;
				}
				Some(Err(err)) => {
					self.release(handle).await;
					failures = failures.saturating_add(1);
					if self.wait_retry(&err, failures).await {
						continue;
					}
					break;
				}
				Some(Ok(())) => {}
			}

			failures = 0;
			while reinit_rx.try_recv().is_ok() {}
			self.status.set_ready();
			info!(target = "wak.lifecycle", "session ready");

			let exit = tokio::select! {
				biased;
				_ = self.cancel.cancelled() => ReadyExit::Shutdown,
				Some(()) = reinit_rx.recv() => ReadyExit::Reinit,
				err = monitor.run(handle.as_ref()) => ReadyExit::ConnectionLost(err),
			};
			match exit {
				ReadyExit::Shutdown => {
					self.release(handle).await;
					break;
				}
				ReadyExit::ConnectionLost(err) => {
					warn!(target = "wak.lifecycle", error = %err, "keep-alive failed; reinitializing");
					self.status.fail(LifecycleState::Degraded, &err);
				}
				ReadyExit::Reinit => {
					info!(target = "wak.lifecycle", "reinitializing on request");
					self.status.transition(LifecycleState::Degraded);
				}
			}
			self.release(handle).await;
		}

		self.status.transition(LifecycleState::Idle);
		debug!(target = "wak.lifecycle", "session driver stopped");
	}

	/// Publishes `Retrying` and sleeps out the retry delay.
	///
	/// Returns `false` if shutdown was requested while waiting.
	async fn wait_retry(&self, err: &LifecycleError, failures: u32) -> bool {
		let delay = self.config.retry.delay_for(failures);
		self.status.fail(LifecycleState::Retrying, err);
		warn!(
			target = "wak.lifecycle",
			error = %err,
			failures,
			retry_in_secs = delay.as_secs(),
			"initialization failed"
		);

		tokio::select! {
			_ = self.cancel.cancelled() => false,
			_ = tokio::time::sleep(delay) => true,
		}
	}

	async fn launch(&self) -> Result<Box<dyn AutomationHandle>> {
		let options = &self.config.launch;
		debug!(target = "wak.lifecycle", headless = options.headless, "launching browser");
		bounded(options.launch_timeout, self.engine.launch(options)).await.map_err(LifecycleError::Launch)
	}

	/// Restores, detects, and persists on an already launched handle.
	async fn establish(&self, handle: &dyn AutomationHandle, interactive: bool) -> Result<()> {
		let cookie_timeout = self.config.navigation_timeout;

		if let Some(session) = self.load_session().await {
			bounded(cookie_timeout, handle.set_cookies(session.cookies())).await.map_err(LifecycleError::Engine)?;
			info!(target = "wak.lifecycle", cookies = session.cookies().len(), "stored session injected");
		}

		let url = &self.config.target_url;
		handle
			.navigate(url, self.config.navigation_timeout)
			.await
			.map_err(|source| LifecycleError::Navigation { url: url.clone(), source })?;

		let markers = &self.config.markers;
		match race_markers(handle, &markers.all(), self.config.detection_timeout).await? {
			Marker::Ready => info!(target = "wak.lifecycle", "authenticated session detected"),
			Marker::LoginRequired if !interactive => {
				return Err(LifecycleError::LoginRequired("no valid session and interactive login is disabled".to_string()));
			}
			Marker::LoginRequired => {
				info!(
					target = "wak.lifecycle",
					timeout_secs = self.config.login_timeout.as_secs(),
					"login challenge shown; waiting for QR scan"
				);
				race_markers(handle, &markers.ready_only(), self.config.login_timeout)
					.await
					.map_err(|_| LifecycleError::LoginRequired(format!("login not completed within {:?}", self.config.login_timeout)))?;
				tokio::time::sleep(self.config.settle_delay).await;
			}
		}

		let cookies = bounded(cookie_timeout, handle.cookies()).await.map_err(LifecycleError::Engine)?;
		self.persist(cookies).await;
		Ok(())
	}

	async fn load_session(&self) -> Option<Session> {
		let store = Arc::clone(&self.store);
		match tokio::task::spawn_blocking(move || store.load()).await {
			Ok(session) => session,
			Err(err) => {
				warn!(target = "wak.lifecycle", error = %err, "session load task failed; starting without a session");
				None
			}
		}
	}

	/// Saves extracted cookies. Failures are logged and do not affect readiness.
	async fn persist(&self, cookies: Vec<CookieRecord>) {
		let Some(session) = Session::from_cookies(cookies) else {
			warn!(target = "wak.lifecycle", "page returned no cookies; session not saved");
			return;
		};
		let count = session.cookies().len();
		let store = Arc::clone(&self.store);
		let saved = match tokio::task::spawn_blocking(move || store.save(&session)).await {
			Ok(saved) => saved,
			Err(err) => {
				warn!(target = "wak.lifecycle", error = %err, "session save task failed");
				return;
			}
		};
		match saved {
			Ok(()) => info!(target = "wak.lifecycle", cookies = count, location = %self.store.location(), "session saved"),
			Err(err) => {
				let err = LifecycleError::from(err);
				warn!(target = "wak.lifecycle", error = %err, "continuing without a persisted session");
			}
		}
	}

	async fn release(&self, handle: Box<dyn AutomationHandle>) {
		match tokio::time::timeout(self.config.close_timeout, handle.close()).await {
			Ok(Ok(())) => debug!(target = "wak.lifecycle", "browser released"),
			Ok(Err(err)) => warn!(target = "wak.lifecycle", error = %err, "failed to close browser"),
			Err(_) => warn!(target = "wak.lifecycle", timeout = ?self.config.close_timeout, "timed out closing browser"),
		}
	}
}

async fn bounded<T>(limit: Duration, operation: impl Future<Output = std::result::Result<T, AutomationError>>) -> std::result::Result<T, AutomationError> {
	tokio::time::timeout(limit, operation).await.unwrap_or(Err(AutomationError::Timeout(limit)))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::detect::MarkerSet;
	use crate::fake::{FakeController, FakeEngine, FakePage};
	use crate::store::FileSessionStore;

	fn controller(dir: &tempfile::TempDir) -> (LifecycleController, FakeController) {
		let (engine, fake) = FakeEngine::new(MarkerSet::default());
		let store = FileSessionStore::new(dir.path().join("session.json"));
		let lifecycle = LifecycleController::new(Arc::new(engine), Arc::new(store), LifecycleConfig::default());
		fake.observe(lifecycle.status());
		(lifecycle, fake)
	}

	#[tokio::test(start_paused = true)]
	async fn second_start_is_a_no_op() {
		let dir = tempfile::tempdir().unwrap();
		let (lifecycle, fake) = controller(&dir);
		fake.push(FakePage::ready());

		assert!(lifecycle.start());
		assert!(!lifecycle.start());
		assert!(!lifecycle.clone().start(), "clones share the driver");

		let mut status = lifecycle.status();
		status.wait_for(|s| s.ready).await.unwrap();
		assert_eq!(fake.launches(), 1);
		lifecycle.shutdown().await;
	}

	#[tokio::test(start_paused = true)]
	async fn start_after_shutdown_is_refused() {
		let dir = tempfile::tempdir().unwrap();
		let (lifecycle, fake) = controller(&dir);

		lifecycle.shutdown().await;
		assert!(!lifecycle.start());
		assert_eq!(lifecycle.status().state(), LifecycleState::Idle);
		assert_eq!(fake.launches(), 0);
	}

	#[tokio::test(start_paused = true)]
	async fn reinit_is_refused_until_ready() {
		let dir = tempfile::tempdir().unwrap();
		let (lifecycle, fake) = controller(&dir);
		fake.push(FakePage::ready().with_launch_delay(Duration::from_secs(5)));

		assert!(!lifecycle.request_reinit(), "idle");
		lifecycle.start();
		tokio::time::sleep(Duration::from_secs(1)).await;
		assert_eq!(lifecycle.status().state(), LifecycleState::Launching);
		assert!(!lifecycle.request_reinit(), "launching");

		lifecycle.status().wait_for(|s| s.ready).await.unwrap();
		assert!(lifecycle.request_reinit());
		lifecycle.shutdown().await;
	}

	#[tokio::test(start_paused = true)]
	async fn acquire_once_releases_handle_on_failure() {
		let dir = tempfile::tempdir().unwrap();
		let (lifecycle, fake) = controller(&dir);
		fake.push(FakePage::login_challenge());

		let err = lifecycle.acquire_once(false).await.err().unwrap();
		assert!(matches!(err, LifecycleError::LoginRequired(_)));
		assert_eq!(fake.handles(), 1);
		assert_eq!(fake.closes(), 1);
		assert_eq!(lifecycle.status().state(), LifecycleState::Idle, "one-shot attempts do not publish");
	}

	#[tokio::test(start_paused = true)]
	async fn shutdown_interrupts_acquire_once_and_releases_handle() {
		let dir = tempfile::tempdir().unwrap();
		let (lifecycle, fake) = controller(&dir);
		fake.push(FakePage::login_challenge());

		let attempt = tokio::spawn({
			let lifecycle = lifecycle.clone();
			async move { lifecycle.acquire_once(true).await.map(|_| ()) }
		});
		tokio::time::sleep(Duration::from_secs(30)).await;
		assert_eq!(fake.closes(), 0, "still waiting for the QR scan");

		lifecycle.shutdown().await;
		let err = attempt.await.unwrap().unwrap_err();
		assert!(matches!(err, LifecycleError::Cancelled));
		assert_eq!(fake.handles(), 1);
		assert_eq!(fake.closes(), 1);
		assert!(!dir.path().join("session.json").exists());
	}

	#[tokio::test(start_paused = true)]
	async fn acquire_once_waits_for_interactive_login() {
		let dir = tempfile::tempdir().unwrap();
		let (lifecycle, fake) = controller(&dir);
		fake.push(FakePage::login_challenge().with_login_after(Duration::from_secs(40)));

		let start = tokio::time::Instant::now();
		let handle = lifecycle.acquire_once(true).await.unwrap();
		assert_eq!(start.elapsed(), Duration::from_secs(45), "login delay plus settle delay");
		assert!(dir.path().join("session.json").exists());

		lifecycle.release(handle).await;
		assert_eq!(fake.closes(), 1);
	}
}
