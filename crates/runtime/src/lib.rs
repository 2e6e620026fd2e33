//! Chromium backend for the session lifecycle.
//!
//! [`ChromiumEngine`] implements [`wak::AutomationEngine`] on top of
//! `chromiumoxide`: one browser process and one page per launched handle,
//! driven over the DevTools protocol.

pub mod browser_finder;
pub mod chromium;

pub use browser_finder::{find_chrome_executable, resolve_executable};
pub use chromium::{ChromiumEngine, ChromiumHandle, SERVER_ARGS};
