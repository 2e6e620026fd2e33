//! Error taxonomy for the session lifecycle.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failures reported by an automation engine or handle.
#[derive(Debug, Error)]
pub enum AutomationError {
	#[error("browser handle is closed")]
	Closed,

	#[error("operation timed out after {0:?}")]
	Timeout(Duration),

	#[error("{0}")]
	Engine(String),
}

/// Failures reading or writing the session file.
#[derive(Debug, Error)]
pub enum StoreError {
	#[error("I/O error on {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("failed to serialize session: {0}")]
	Serialize(#[from] serde_json::Error),
}

impl StoreError {
	pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
		Self::Io { path: path.into(), source }
	}
}

/// Every failure the lifecycle translates into a state transition.
#[derive(Debug, Error)]
pub enum LifecycleError {
	#[error("failed to launch browser: {0}")]
	Launch(#[source] AutomationError),

	#[error("failed to navigate to {url}: {source}")]
	Navigation {
		url: String,
		#[source]
		source: AutomationError,
	},

	#[error("no page marker detected within {0:?}")]
	DetectionTimeout(Duration),

	#[error("login required: {0}")]
	LoginRequired(String),

	#[error("failed to persist session: {0}")]
	Persist(#[from] StoreError),

	#[error("connection lost: {0}")]
	ConnectionLost(#[source] AutomationError),

	#[error("browser automation failed: {0}")]
	Engine(#[source] AutomationError),

	#[error("initialization cancelled by shutdown")]
	Cancelled,
}

impl LifecycleError {
	/// Returns `true` for failures recovered immediately instead of after the retry delay.
	pub fn is_connection_lost(&self) -> bool {
		matches!(self, Self::ConnectionLost(_))
	}
}

pub type Result<T, E = LifecycleError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn navigation_error_names_the_url() {
		let err = LifecycleError::Navigation {
			url: "https://web.whatsapp.com".to_string(),
			source: AutomationError::Timeout(Duration::from_secs(60)),
		};
		let message = err.to_string();
		assert!(message.contains("https://web.whatsapp.com"));
		assert!(message.contains("60s"));
	}

	#[test]
	fn only_connection_lost_skips_backoff() {
		assert!(LifecycleError::ConnectionLost(AutomationError::Closed).is_connection_lost());
		assert!(!LifecycleError::Launch(AutomationError::Closed).is_connection_lost());
		assert!(!LifecycleError::DetectionTimeout(Duration::from_secs(1)).is_connection_lost());
	}
}
