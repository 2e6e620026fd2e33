//! Page-marker detection.
//!
//! After navigation exactly one of two things shows up: the chat list of an
//! authenticated session, or the QR login challenge. Every candidate selector
//! is awaited concurrently and the first one to appear decides the outcome.

use std::time::Duration;

use futures::future::select_ok;
use tracing::debug;

use crate::automation::AutomationHandle;
use crate::error::{LifecycleError, Result};

/// What a detected selector means for the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
	/// The authenticated chat UI is visible.
	Ready,
	/// A QR login challenge is visible.
	LoginRequired,
}

/// Selectors identifying each [`Marker`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerSet {
	pub ready: Vec<String>,
	pub login: Vec<String>,
}

impl Default for MarkerSet {
	fn default() -> Self {
		Self {
			ready: vec![
				r#"[data-testid="chat-list"]"#.to_string(),
				"#side".to_string(),
				r#"[data-testid="conversation-panel-wrapper"]"#.to_string(),
			],
			login: vec!["canvas".to_string(), "div[data-ref]".to_string()],
		}
	}
}

impl MarkerSet {
	/// Ready and login selectors, in that order.
	pub fn all(&self) -> Vec<(Marker, &str)> {
		self.ready_only().into_iter().chain(self.login.iter().map(|s| (Marker::LoginRequired, s.as_str()))).collect()
	}

	pub fn ready_only(&self) -> Vec<(Marker, &str)> {
		self.ready.iter().map(|s| (Marker::Ready, s.as_str())).collect()
	}

	/// Maps a selector back to its marker.
	pub fn classify(&self, selector: &str) -> Option<Marker> {
		if self.ready.iter().any(|s| s == selector) {
			Some(Marker::Ready)
		} else if self.login.iter().any(|s| s == selector) {
			Some(Marker::LoginRequired)
		} else {
			None
		}
	}
}

/// Waits for the first of `candidates` to appear within `timeout`.
///
/// Waits that fail early do not end the race; the remaining ones keep going
/// until one succeeds or the deadline passes. Unfinished waits are dropped
/// as soon as a winner is known.
pub async fn race_markers(handle: &dyn AutomationHandle, candidates: &[(Marker, &str)], timeout: Duration) -> Result<Marker> {
	if candidates.is_empty() {
		return Err(LifecycleError::DetectionTimeout(timeout));
	}

	let waits = candidates.iter().map(|&(marker, selector)| {
		Box::pin(async move {
			handle.wait_for_selector(selector, timeout).await?;
			Ok::<_, crate::error::AutomationError>((marker, selector))
		})
	});

	match tokio::time::timeout(timeout, select_ok(waits)).await {
		Ok(Ok(((marker, selector), _pending))) => {
			debug!(target = "wak.detect", ?marker, selector, "page marker detected");
			Ok(marker)
		}
		Ok(Err(err)) => {
			debug!(target = "wak.detect", error = %err, "every marker wait failed");
			Err(LifecycleError::DetectionTimeout(timeout))
		}
		Err(_) => Err(LifecycleError::DetectionTimeout(timeout)),
	}
}
