//! [`AutomationEngine`] backed by Chromium over the DevTools protocol.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{Cookie, CookieParam, CookieSameSite, SetCookiesParams, TimeSinceEpoch};
use chromiumoxide::handler::Handler;
use futures::StreamExt;
use tempfile::TempDir;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use wak::{AutomationEngine, AutomationError, AutomationHandle, CookieRecord, LaunchOptions, SameSite};

use crate::browser_finder::resolve_executable;

/// Flags for running Chromium on a headless server.
pub const SERVER_ARGS: &[&str] = &[
	"--disable-dev-shm-usage",
	"--disable-accelerated-2d-canvas",
	"--no-first-run",
	"--no-zygote",
	"--disable-gpu",
	"--disable-software-rasterizer",
	"--disable-extensions",
];

const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Launches one Chromium process per handle.
#[derive(Debug, Clone, Default)]
pub struct ChromiumEngine;

impl ChromiumEngine {
	pub fn new() -> Self {
		Self
	}
}

#[async_trait]
impl AutomationEngine for ChromiumEngine {
	async fn launch(&self, options: &LaunchOptions) -> Result<Box<dyn AutomationHandle>, AutomationError> {
		let executable = resolve_executable(options.executable.as_deref())?;

		// A throwaway profile per launch keeps Chromium's singleton lock from
		// colliding with a previous process that has not fully exited.
		let (profile, scratch_profile) = match &options.user_data_dir {
			Some(dir) => (dir.clone(), None),
			None => {
				let scratch = tempfile::Builder::new()
					.prefix("wak-profile-")
					.tempdir()
					.map_err(|err| AutomationError::Engine(format!("failed to create browser profile directory: {err}")))?;
				(scratch.path().to_path_buf(), Some(scratch))
			}
		};

		let config = build_config(options, &executable, &profile)?;
		info!(
			target = "wak.runtime",
			executable = %executable.display(),
			headless = options.headless,
			sandbox = options.sandbox,
			"launching chromium"
		);

		let (mut browser, handler) = Browser::launch(config).await.map_err(engine_error)?;
		let closed = Arc::new(AtomicBool::new(false));
		let handler_task = spawn_handler(handler, Arc::clone(&closed));

		let page = match browser.new_page("about:blank").await {
			Ok(page) => page,
			Err(err) => {
				if let Err(close_err) = browser.close().await {
					debug!(target = "wak.runtime", error = %close_err, "close after failed page creation");
				}
				let _ = browser.wait().await;
				handler_task.abort();
				return Err(engine_error(err));
			}
		};

		Ok(Box::new(ChromiumHandle {
			browser: Mutex::new(Some(browser)),
			page,
			closed,
			handler_task,
			_scratch_profile: scratch_profile,
		}))
	}
}

fn build_config(options: &LaunchOptions, executable: &Path, profile: &Path) -> Result<BrowserConfig, AutomationError> {
	let mut builder = BrowserConfig::builder()
		.chrome_executable(executable)
		.user_data_dir(profile)
		.launch_timeout(options.launch_timeout)
		.args(SERVER_ARGS.iter().copied())
		.args(options.extra_args.iter().map(String::as_str));

	if !options.headless {
		builder = builder.with_head();
	}
	if !options.sandbox {
		builder = builder.no_sandbox().arg("--disable-setuid-sandbox");
	}

	builder.build().map_err(AutomationError::Engine)
}

fn spawn_handler(mut handler: Handler, closed: Arc<AtomicBool>) -> JoinHandle<()> {
	tokio::spawn(async move {
		while let Some(event) = handler.next().await {
			if let Err(err) = event {
				debug!(target = "wak.runtime", error = %err, "cdp handler error");
			}
		}
		closed.store(true, Ordering::SeqCst);
		debug!(target = "wak.runtime", "cdp connection ended");
	})
}

fn engine_error(err: impl std::fmt::Display) -> AutomationError {
	AutomationError::Engine(err.to_string())
}

/// One Chromium process with a single page.
pub struct ChromiumHandle {
	browser: Mutex<Option<Browser>>,
	page: Page,
	closed: Arc<AtomicBool>,
	handler_task: JoinHandle<()>,
	_scratch_profile: Option<TempDir>,
}

impl ChromiumHandle {
	fn ensure_open(&self) -> Result<(), AutomationError> {
		if self.is_closed() { Err(AutomationError::Closed) } else { Ok(()) }
	}
}

#[async_trait]
impl AutomationHandle for ChromiumHandle {
	async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), AutomationError> {
		self.ensure_open()?;
		debug!(target = "wak.runtime", url, "navigating");
		match tokio::time::timeout(timeout, self.page.goto(url)).await {
			Ok(Ok(_)) => Ok(()),
			Ok(Err(err)) => Err(engine_error(err)),
			Err(_) => Err(AutomationError::Timeout(timeout)),
		}
	}

	async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<(), AutomationError> {
		let poll = async {
			loop {
				self.ensure_open()?;
				if self.page.find_element(selector).await.is_ok() {
					return Ok(());
				}
				tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
			}
		};
		tokio::time::timeout(timeout, poll).await.unwrap_or(Err(AutomationError::Timeout(timeout)))
	}

	async fn set_cookies(&self, cookies: &[CookieRecord]) -> Result<(), AutomationError> {
		self.ensure_open()?;
		let params = cookies.iter().map(to_cookie_param).collect::<Result<Vec<_>, _>>()?;
		// Page::set_cookies scopes cookies to the current page URL and rejects
		// about:blank. Domain-scoped cookies go straight to Network.setCookies.
		self.page.execute(SetCookiesParams::new(params)).await.map_err(engine_error)?;
		Ok(())
	}

	async fn cookies(&self) -> Result<Vec<CookieRecord>, AutomationError> {
		self.ensure_open()?;
		let cookies = self.page.get_cookies().await.map_err(engine_error)?;
		Ok(cookies.into_iter().map(from_cookie).collect())
	}

	async fn probe(&self) -> Result<String, AutomationError> {
		self.ensure_open()?;
		let result = self.page.evaluate("document.title").await.map_err(engine_error)?;
		result.into_value::<String>().map_err(engine_error)
	}

	fn is_closed(&self) -> bool {
		self.closed.load(Ordering::SeqCst)
	}

	async fn close(&self) -> Result<(), AutomationError> {
		let Some(mut browser) = self.browser.lock().await.take() else {
			return Ok(());
		};
		self.closed.store(true, Ordering::SeqCst);

		let result = browser.close().await.map(|_| ()).map_err(engine_error);
		if result.is_err() {
			// The CDP connection is gone; make sure the process goes with it.
			if let Some(Err(err)) = browser.kill().await {
				warn!(target = "wak.runtime", error = %err, "failed to kill chromium");
			}
		}
		match browser.wait().await {
			Ok(status) => debug!(target = "wak.runtime", ?status, "chromium exited"),
			Err(err) => warn!(target = "wak.runtime", error = %err, "failed to reap chromium"),
		}
		self.handler_task.abort();
		result
	}
}

impl Drop for ChromiumHandle {
	fn drop(&mut self) {
		self.handler_task.abort();
	}
}

/// Builds a domain-scoped `CookieParam`. Cookies are injected before the
/// first navigation, so there is no page URL to fall back on.
fn to_cookie_param(record: &CookieRecord) -> Result<CookieParam, AutomationError> {
	if record.domain.trim().is_empty() {
		return Err(AutomationError::Engine(format!("cookie {} has no domain", record.name)));
	}
	let mut builder = CookieParam::builder()
		.name(record.name.clone())
		.value(record.value.clone())
		.domain(record.domain.clone())
		.path(record.path.clone())
		.secure(record.secure)
		.http_only(record.http_only);
	if !record.is_session_cookie() {
		builder = builder.expires(TimeSinceEpoch::new(record.expires));
	}
	if let Some(same_site) = record.same_site {
		builder = builder.same_site(match same_site {
			SameSite::Strict => CookieSameSite::Strict,
			SameSite::Lax => CookieSameSite::Lax,
			SameSite::None => CookieSameSite::None,
		});
	}
	builder.build().map_err(AutomationError::Engine)
}

fn from_cookie(cookie: Cookie) -> CookieRecord {
	let mut record = CookieRecord::new(cookie.name, cookie.value, cookie.domain);
	record.path = cookie.path;
	if !cookie.session {
		record.expires = cookie.expires;
	}
	record.http_only = cookie.http_only;
	record.secure = cookie.secure;
	record.same_site = cookie.same_site.map(|same_site| match same_site {
		CookieSameSite::Strict => SameSite::Strict,
		CookieSameSite::Lax => SameSite::Lax,
		CookieSameSite::None => SameSite::None,
	});
	record
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn persistent_cookie_converts_every_attribute() {
		let mut record = CookieRecord::new("wa_ul", "abc", ".web.whatsapp.com");
		record.expires = 1_900_000_000.0;
		record.secure = true;
		record.http_only = true;
		record.same_site = Some(SameSite::Strict);

		let param = to_cookie_param(&record).unwrap();
		assert_eq!(param.name, "wa_ul");
		assert_eq!(param.domain.as_deref(), Some(".web.whatsapp.com"));
		assert_eq!(param.path.as_deref(), Some("/"));
		assert_eq!(param.secure, Some(true));
		assert_eq!(param.http_only, Some(true));
		assert_eq!(param.same_site, Some(CookieSameSite::Strict));
		assert!(param.expires.is_some());
	}

	#[test]
	fn session_cookie_has_no_expiry() {
		let param = to_cookie_param(&CookieRecord::new("wa_lang_pref", "en", "web.whatsapp.com")).unwrap();
		assert!(param.expires.is_none());
		assert!(param.same_site.is_none());
	}

	#[test]
	fn cookies_are_scoped_by_domain_not_page_url() {
		let param = to_cookie_param(&CookieRecord::new("wa_ul", "abc", ".web.whatsapp.com")).unwrap();
		assert!(param.url.is_none());
		assert_eq!(param.domain.as_deref(), Some(".web.whatsapp.com"));
	}

	#[test]
	fn cookie_without_domain_is_rejected() {
		let err = to_cookie_param(&CookieRecord::new("wa_ul", "abc", "")).unwrap_err();
		assert!(err.to_string().contains("wa_ul"));
	}

	#[test]
	fn config_builds_with_server_flags() {
		let options = LaunchOptions {
			extra_args: vec!["--lang=en-US".to_string()],
			..Default::default()
		};
		let dir = tempfile::tempdir().unwrap();
		let executable = tempfile::NamedTempFile::new().unwrap();
		assert!(build_config(&options, executable.path(), dir.path()).is_ok());
	}
}
