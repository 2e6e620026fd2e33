//! Turns command-line and environment settings into lifecycle configuration.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use wak::{FileSessionStore, LaunchOptions, LifecycleConfig, MarkerSet, RetryPolicy};

use crate::cli::Settings;
use crate::error::{Result, WakError};

impl Settings {
	pub fn lifecycle_config(&self) -> Result<LifecycleConfig> {
		let defaults = LifecycleConfig::default();
		let default_markers = MarkerSet::default();

		let retry = match self.retry_max_delay {
			Some(max) => RetryPolicy::Exponential {
				initial: secs(self.retry_delay),
				max: secs(max),
			},
			None => RetryPolicy::Fixed {
				delay: secs(self.retry_delay),
			},
		};

		let config = LifecycleConfig {
			target_url: self.url.clone(),
			launch: LaunchOptions {
				headless: self.headless,
				sandbox: self.sandbox,
				executable: self.chrome_executable.clone(),
				user_data_dir: self.user_data_dir.clone(),
				..LaunchOptions::default()
			},
			markers: MarkerSet {
				ready: selectors_or(&self.ready_selectors, default_markers.ready),
				login: selectors_or(&self.login_selectors, default_markers.login),
			},
			navigation_timeout: secs(self.navigation_timeout),
			detection_timeout: secs(self.detection_timeout),
			interactive_login: self.interactive_login,
			login_timeout: secs(self.login_timeout),
			keep_alive_interval: secs(self.keepalive_interval),
			probe_timeout: secs(self.probe_timeout),
			retry,
			..defaults
		};

		config.validate().map_err(WakError::Config)?;
		Ok(config)
	}

	pub fn session_store(&self) -> FileSessionStore {
		FileSessionStore::new(&self.session_file)
	}

	pub fn bind_addr(&self) -> Result<SocketAddr> {
		let ip: IpAddr = self
			.bind
			.parse()
			.map_err(|_| WakError::Config(format!("bind address {:?} is not an IP address", self.bind)))?;
		Ok(SocketAddr::new(ip, self.port))
	}
}

fn secs(value: u64) -> Duration {
	Duration::from_secs(value)
}

/// Trimmed, non-empty selectors, or `fallback` when none were given.
fn selectors_or(given: &[String], fallback: Vec<String>) -> Vec<String> {
	let cleaned: Vec<String> = given.iter().map(|s| s.trim()).filter(|s| !s.is_empty()).map(str::to_string).collect();
	if cleaned.is_empty() { fallback } else { cleaned }
}

#[cfg(test)]
mod tests {
	use clap::Parser;

	use super::*;
	use crate::cli::Cli;

	fn settings(args: &[&str]) -> Settings {
		let argv = std::iter::once("wak").chain(args.iter().copied());
		Cli::try_parse_from(argv).unwrap().settings
	}

	#[test]
	fn explicit_flags_reach_the_lifecycle() {
		let config = settings(&[
			"--url",
			"https://example.test",
			"--headless",
			"no",
			"--keepalive-interval",
			"5",
			"--interactive-login",
			"yes",
			"--ready-selectors",
			"#pane-side, [data-testid=\"chat-list\"]",
		])
		.lifecycle_config()
		.unwrap();

		assert_eq!(config.target_url, "https://example.test");
		assert!(!config.launch.headless);
		assert!(config.interactive_login);
		assert_eq!(config.keep_alive_interval, Duration::from_secs(5));
		assert_eq!(config.markers.ready, ["#pane-side", "[data-testid=\"chat-list\"]"]);
	}

	#[test]
	fn retry_cap_switches_to_exponential_backoff() {
		let config = settings(&["--retry-delay", "10", "--retry-max-delay", "300"]).lifecycle_config().unwrap();
		assert_eq!(
			config.retry,
			RetryPolicy::Exponential {
				initial: Duration::from_secs(10),
				max: Duration::from_secs(300),
			}
		);
	}

	#[test]
	fn zero_interval_is_rejected() {
		let err = settings(&["--probe-timeout", "0"]).lifecycle_config().unwrap_err();
		assert!(matches!(err, WakError::Config(message) if message.contains("probe timeout")));
	}

	#[test]
	fn blank_selector_list_falls_back_to_defaults() {
		assert_eq!(selectors_or(&[" ".to_string()], vec!["canvas".to_string()]), ["canvas"]);
	}

	#[test]
	fn bind_address_must_be_an_ip() {
		let parsed = settings(&["--bind", "localhost", "--port", "8080"]);
		assert!(parsed.bind_addr().is_err());

		let parsed = settings(&["--bind", "127.0.0.1", "--port", "8080"]);
		assert_eq!(parsed.bind_addr().unwrap(), "127.0.0.1:8080".parse().unwrap());
	}

	#[test]
	fn subcommands_accept_global_settings() {
		let cli = Cli::try_parse_from(["wak", "session", "show", "--session-file", "/tmp/s.json"]).unwrap();
		assert_eq!(cli.settings.session_file, std::path::PathBuf::from("/tmp/s.json"));
	}
}
