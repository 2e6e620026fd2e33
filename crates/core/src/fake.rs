//! Scripted automation engine for exercising the lifecycle without a browser.
//!
//! Each launch consumes the next queued [`FakePage`], which describes how
//! the launched page behaves: which marker shows up after navigation, when a
//! simulated QR scan completes, which cookies the page holds, and when
//! keep-alive probes start failing. The [`FakeController`] records every
//! interaction for assertions.
//!
//! # Example
//!
//! ```ignore
//! let (engine, controller) = FakeEngine::new(MarkerSet::default());
//! controller.push(FakePage::launch_failure("missing chrome"));
//! controller.push(FakePage::ready());
//!
//! let lifecycle = LifecycleController::new(Arc::new(engine), store, config);
//! lifecycle.start();
//! ```

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;
use wak_protocol::CookieRecord;

use crate::automation::{AutomationEngine, AutomationHandle, LaunchOptions};
use crate::detect::{Marker, MarkerSet};
use crate::error::AutomationError;
use crate::status::{LifecycleState, StatusReader};

/// Behaviour of one launched page.
#[derive(Debug, Clone)]
pub struct FakePage {
	first_marker: Option<Marker>,
	login_after: Option<Duration>,
	cookies: Vec<CookieRecord>,
	launch_delay: Duration,
	launch_error: Option<String>,
	navigation_error: Option<String>,
	probe_failure_after: Option<usize>,
	hanging_probe: bool,
	hanging_launch: bool,
	hanging_close: bool,
	close_error: Option<String>,
}

impl FakePage {
	fn with_marker(first_marker: Option<Marker>) -> Self {
		Self {
			first_marker,
			login_after: None,
			cookies: vec![CookieRecord::new("wa_ul", "fake-session", ".web.whatsapp.com")],
			launch_delay: Duration::ZERO,
			launch_error: None,
			navigation_error: None,
			probe_failure_after: None,
			hanging_probe: false,
			hanging_launch: false,
			hanging_close: false,
			close_error: None,
		}
	}

	/// A page that shows the chat list right after navigation.
	pub fn ready() -> Self {
		Self::with_marker(Some(Marker::Ready))
	}

	/// A page that shows the QR challenge and never logs in on its own.
	pub fn login_challenge() -> Self {
		Self::with_marker(Some(Marker::LoginRequired))
	}

	/// A page on which no marker ever appears.
	pub fn blank() -> Self {
		Self::with_marker(None)
	}

	/// A launch that fails with `message`.
	pub fn launch_failure(message: impl Into<String>) -> Self {
		Self {
			launch_error: Some(message.into()),
			..Self::blank()
		}
	}

	/// The QR challenge resolves into the chat list `after` navigation.
	pub fn with_login_after(mut self, after: Duration) -> Self {
		self.login_after = Some(after);
		self
	}

	pub fn with_cookies(mut self, cookies: Vec<CookieRecord>) -> Self {
		self.cookies = cookies;
		self
	}

	pub fn with_launch_delay(mut self, delay: Duration) -> Self {
		self.launch_delay = delay;
		self
	}

	pub fn with_navigation_error(mut self, message: impl Into<String>) -> Self {
		self.navigation_error = Some(message.into());
		self
	}

	/// The first `successes` probes succeed; every later probe fails.
	pub fn with_probe_failure_after(mut self, successes: usize) -> Self {
		self.probe_failure_after = Some(successes);
		self
	}

	/// Probes never complete.
	pub fn with_hanging_probe(mut self) -> Self {
		self.hanging_probe = true;
		self
	}

	/// The launch never returns a handle.
	pub fn with_hanging_launch(mut self) -> Self {
		self.hanging_launch = true;
		self
	}

	/// `close` never completes.
	pub fn with_hanging_close(mut self) -> Self {
		self.hanging_close = true;
		self
	}

	/// `close` marks the handle closed but reports `message` as an error.
	pub fn with_close_error(mut self, message: impl Into<String>) -> Self {
		self.close_error = Some(message.into());
		self
	}
}

struct FakeState {
	markers: MarkerSet,
	script: Mutex<VecDeque<FakePage>>,
	last_page: Mutex<Option<FakePage>>,
	launches: AtomicUsize,
	launch_times: Mutex<Vec<Instant>>,
	handles: AtomicUsize,
	closes: AtomicUsize,
	probes: AtomicUsize,
	injected: Mutex<Vec<Vec<CookieRecord>>>,
	injected_before_navigation: AtomicUsize,
	navigations: Mutex<Vec<String>>,
	observer: Mutex<Option<StatusReader>>,
	close_states: Mutex<Vec<LifecycleState>>,
}

impl FakeState {
	fn next_page(&self) -> FakePage {
		let next = self.script.lock().pop_front();
		let mut last = self.last_page.lock();
		match next {
			Some(page) => {
				*last = Some(page.clone());
				page
			}
			None => last.clone().unwrap_or_else(FakePage::ready),
		}
	}
}

/// [`AutomationEngine`] that replays queued [`FakePage`]s.
///
/// Once the queue is drained, later launches repeat the last page.
pub struct FakeEngine {
	state: Arc<FakeState>,
}

impl FakeEngine {
	/// Creates an engine that classifies selectors with `markers`.
	pub fn new(markers: MarkerSet) -> (Self, FakeController) {
		let state = Arc::new(FakeState {
			markers,
			script: Mutex::new(VecDeque::new()),
			last_page: Mutex::new(None),
			launches: AtomicUsize::new(0),
			launch_times: Mutex::new(Vec::new()),
			handles: AtomicUsize::new(0),
			closes: AtomicUsize::new(0),
			probes: AtomicUsize::new(0),
			injected: Mutex::new(Vec::new()),
			injected_before_navigation: AtomicUsize::new(0),
			navigations: Mutex::new(Vec::new()),
			observer: Mutex::new(None),
			close_states: Mutex::new(Vec::new()),
		});
		(Self { state: Arc::clone(&state) }, FakeController { state })
	}
}

#[async_trait]
impl AutomationEngine for FakeEngine {
	async fn launch(&self, _options: &LaunchOptions) -> Result<Box<dyn AutomationHandle>, AutomationError> {
		self.state.launches.fetch_add(1, Ordering::SeqCst);
		self.state.launch_times.lock().push(Instant::now());
		let page = self.state.next_page();

		if !page.launch_delay.is_zero() {
			tokio::time::sleep(page.launch_delay).await;
		}
		if page.hanging_launch {
			std::future::pending::<()>().await;
		}
		if let Some(message) = &page.launch_error {
			return Err(AutomationError::Engine(message.clone()));
		}

		self.state.handles.fetch_add(1, Ordering::SeqCst);
		Ok(Box::new(FakeHandle {
			state: Arc::clone(&self.state),
			page,
			launched_at: Instant::now(),
			navigated_at: Mutex::new(None),
			probes: AtomicUsize::new(0),
			closed: AtomicBool::new(false),
		}))
	}
}

struct FakeHandle {
	state: Arc<FakeState>,
	page: FakePage,
	launched_at: Instant,
	navigated_at: Mutex<Option<Instant>>,
	probes: AtomicUsize,
	closed: AtomicBool,
}

impl FakeHandle {
	/// Markers appear relative to the last navigation, or to launch if the
	/// page was never navigated.
	fn visible_at(&self, selector: &str) -> Option<Instant> {
		let navigated_at = self.navigated_at.lock().unwrap_or(self.launched_at);
		let marker = self.state.markers.classify(selector)?;
		match (self.page.first_marker?, marker) {
			(shown, wanted) if shown == wanted => Some(navigated_at),
			(Marker::LoginRequired, Marker::Ready) => self.page.login_after.map(|after| navigated_at + after),
			_ => None,
		}
	}

	fn ensure_open(&self) -> Result<(), AutomationError> {
		if self.closed.load(Ordering::SeqCst) { Err(AutomationError::Closed) } else { Ok(()) }
	}
}

#[async_trait]
impl AutomationHandle for FakeHandle {
	async fn navigate(&self, url: &str, _timeout: Duration) -> Result<(), AutomationError> {
		self.ensure_open()?;
		if let Some(message) = &self.page.navigation_error {
			return Err(AutomationError::Engine(message.clone()));
		}
		self.state.navigations.lock().push(url.to_string());
		*self.navigated_at.lock() = Some(Instant::now());
		Ok(())
	}

	async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<(), AutomationError> {
		self.ensure_open()?;
		let deadline = Instant::now() + timeout;
		match self.visible_at(selector) {
			Some(at) if at <= deadline => {
				tokio::time::sleep_until(at).await;
				self.ensure_open()
			}
			_ => {
				tokio::time::sleep_until(deadline).await;
				Err(AutomationError::Timeout(timeout))
			}
		}
	}

	/// Before the first navigation the page has no URL to scope cookies to,
	/// so every cookie must name its domain.
	async fn set_cookies(&self, cookies: &[CookieRecord]) -> Result<(), AutomationError> {
		self.ensure_open()?;
		if self.navigated_at.lock().is_none() {
			if let Some(cookie) = cookies.iter().find(|c| c.domain.trim().is_empty()) {
				return Err(AutomationError::Engine(format!("cookie {} needs a domain on a blank page", cookie.name)));
			}
			self.state.injected_before_navigation.fetch_add(1, Ordering::SeqCst);
		}
		self.state.injected.lock().push(cookies.to_vec());
		Ok(())
	}

	async fn cookies(&self) -> Result<Vec<CookieRecord>, AutomationError> {
		self.ensure_open()?;
		Ok(self.page.cookies.clone())
	}

	async fn probe(&self) -> Result<String, AutomationError> {
		self.ensure_open()?;
		let attempt = self.probes.fetch_add(1, Ordering::SeqCst);
		self.state.probes.fetch_add(1, Ordering::SeqCst);

		if self.page.hanging_probe {
			std::future::pending::<()>().await;
		}
		match self.page.probe_failure_after {
			Some(successes) if attempt >= successes => Err(AutomationError::Engine("Target closed".to_string())),
			_ => Ok("WhatsApp".to_string()),
		}
	}

	fn is_closed(&self) -> bool {
		self.closed.load(Ordering::SeqCst)
	}

	async fn close(&self) -> Result<(), AutomationError> {
		self.state.closes.fetch_add(1, Ordering::SeqCst);
		if let Some(reader) = self.state.observer.lock().as_ref() {
			self.state.close_states.lock().push(reader.state());
		}
		self.closed.store(true, Ordering::SeqCst);
		if self.page.hanging_close {
			std::future::pending::<()>().await;
		}
		match &self.page.close_error {
			Some(message) => Err(AutomationError::Engine(message.clone())),
			None => Ok(()),
		}
	}
}

/// Queues pages and exposes what the engine observed.
#[derive(Clone)]
pub struct FakeController {
	state: Arc<FakeState>,
}

impl FakeController {
	/// Queues the behaviour of the next launch.
	pub fn push(&self, page: FakePage) {
		self.state.script.lock().push_back(page);
	}

	/// Records the lifecycle state seen at every `close` call.
	pub fn observe(&self, reader: StatusReader) {
		*self.state.observer.lock() = Some(reader);
	}

	/// Number of launch attempts, failed ones included.
	pub fn launches(&self) -> usize {
		self.state.launches.load(Ordering::SeqCst)
	}

	pub fn launch_times(&self) -> Vec<Instant> {
		self.state.launch_times.lock().clone()
	}

	/// Number of handles successfully launched.
	pub fn handles(&self) -> usize {
		self.state.handles.load(Ordering::SeqCst)
	}

	/// Number of `close` calls across all handles.
	pub fn closes(&self) -> usize {
		self.state.closes.load(Ordering::SeqCst)
	}

	pub fn close_states(&self) -> Vec<LifecycleState> {
		self.state.close_states.lock().clone()
	}

	pub fn probes(&self) -> usize {
		self.state.probes.load(Ordering::SeqCst)
	}

	/// Cookie sets injected, one entry per `set_cookies` call.
	pub fn injected(&self) -> Vec<Vec<CookieRecord>> {
		self.state.injected.lock().clone()
	}

	/// Number of `set_cookies` calls made before the page was navigated.
	pub fn injected_before_navigation(&self) -> usize {
		self.state.injected_before_navigation.load(Ordering::SeqCst)
	}

	pub fn navigations(&self) -> Vec<String> {
		self.state.navigations.lock().clone()
	}
}
