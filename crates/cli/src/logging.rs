//! Tracing subscriber setup. Logs go to stderr so command output stays clean.

use tracing_subscriber::EnvFilter;

/// Default filter for a `-v` count; `RUST_LOG` takes precedence when set.
fn default_filter(verbosity: u8) -> &'static str {
	match verbosity {
		0 => "info,chromiumoxide=warn",
		1 => "info,wak=debug,chromiumoxide=warn",
		_ => "debug,wak=trace",
	}
}

pub fn init(verbosity: u8) {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(verbosity)));
	tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn every_verbosity_yields_a_valid_filter() {
		for verbosity in 0..=3 {
			assert!(EnvFilter::try_new(default_filter(verbosity)).is_ok());
		}
	}
}
