//! Lifecycle tuning.

use std::time::Duration;

use crate::automation::LaunchOptions;
use crate::detect::MarkerSet;
use crate::retry::RetryPolicy;

pub const DEFAULT_TARGET_URL: &str = "https://web.whatsapp.com";

/// Everything the lifecycle needs besides its collaborators.
#[derive(Debug, Clone, PartialEq)]
pub struct LifecycleConfig {
	pub target_url: String,
	pub launch: LaunchOptions,
	pub markers: MarkerSet,
	pub navigation_timeout: Duration,
	/// Deadline for the initial ready-vs-login marker race.
	pub detection_timeout: Duration,
	/// Wait for a human to complete a login challenge.
	pub interactive_login: bool,
	pub login_timeout: Duration,
	/// Pause after a human-assisted login before cookies are extracted.
	pub settle_delay: Duration,
	pub keep_alive_interval: Duration,
	pub probe_timeout: Duration,
	/// Upper bound on releasing a browser handle.
	pub close_timeout: Duration,
	pub retry: RetryPolicy,
}

impl Default for LifecycleConfig {
	fn default() -> Self {
		Self {
			target_url: DEFAULT_TARGET_URL.to_string(),
			launch: LaunchOptions::default(),
			markers: MarkerSet::default(),
			navigation_timeout: Duration::from_secs(60),
			detection_timeout: Duration::from_secs(15),
			interactive_login: false,
			login_timeout: Duration::from_secs(120),
			settle_delay: Duration::from_secs(5),
			keep_alive_interval: Duration::from_secs(60),
			probe_timeout: Duration::from_secs(10),
			close_timeout: Duration::from_secs(10),
			retry: RetryPolicy::default(),
		}
	}
}

impl LifecycleConfig {
	/// Checks values that would make the lifecycle spin or never detect anything.
	pub fn validate(&self) -> Result<(), String> {
		if self.target_url.trim().is_empty() {
			return Err("target URL must not be empty".to_string());
		}
		if self.markers.ready.is_empty() {
			return Err("at least one ready selector is required".to_string());
		}
		if self.markers.login.is_empty() {
			return Err("at least one login selector is required".to_string());
		}

		let durations = [
			("navigation timeout", self.navigation_timeout),
			("detection timeout", self.detection_timeout),
			("login timeout", self.login_timeout),
			("keep-alive interval", self.keep_alive_interval),
			("probe timeout", self.probe_timeout),
			("close timeout", self.close_timeout),
		];
		for (name, value) in durations {
			if value.is_zero() {
				return Err(format!("{name} must be greater than zero"));
			}
		}

		match self.retry {
			RetryPolicy::Fixed { delay } if delay.is_zero() => Err("retry delay must be greater than zero".to_string()),
			RetryPolicy::Exponential { initial, max } if initial.is_zero() || max < initial => {
				Err("exponential retry needs a non-zero initial delay no larger than the maximum".to_string())
			}
			_ => Ok(()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_are_valid() {
		assert_eq!(LifecycleConfig::default().validate(), Ok(()));
	}

	#[test]
	fn zero_durations_are_rejected() {
		let config = LifecycleConfig {
			keep_alive_interval: Duration::ZERO,
			..Default::default()
		};
		assert_eq!(config.validate().unwrap_err(), "keep-alive interval must be greater than zero");

		let config = LifecycleConfig {
			retry: RetryPolicy::Fixed { delay: Duration::ZERO },
			..Default::default()
		};
		assert!(config.validate().is_err());
	}

	#[test]
	fn empty_selector_lists_are_rejected() {
		let mut config = LifecycleConfig::default();
		config.markers.ready.clear();
		assert!(config.validate().unwrap_err().contains("ready selector"));
	}

	#[test]
	fn inverted_exponential_bounds_are_rejected() {
		let config = LifecycleConfig {
			retry: RetryPolicy::Exponential {
				initial: Duration::from_secs(60),
				max: Duration::from_secs(10),
			},
			..Default::default()
		};
		assert!(config.validate().is_err());
	}
}
