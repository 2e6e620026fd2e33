use std::path::PathBuf;

use clap::builder::BoolishValueParser;
use clap::{Args, Parser, Subcommand};

/// Keeps one WhatsApp Web session alive in a headless browser.
#[derive(Parser, Debug)]
#[command(name = "wak", version, about, long_about = None)]
pub struct Cli {
	/// Increase log verbosity (-v debug, -vv trace). RUST_LOG overrides.
	#[arg(short, long, action = clap::ArgAction::Count, global = true)]
	pub verbose: u8,

	#[command(flatten)]
	pub settings: Settings,

	#[command(subcommand)]
	pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
	/// Run the session lifecycle and the HTTP status server (default)
	Serve,

	/// Open a visible browser, wait for a QR scan, and save the session
	Login,

	/// Inspect or remove the stored session
	#[command(subcommand)]
	Session(SessionCommand),
}

#[derive(Subcommand, Debug, Clone)]
pub enum SessionCommand {
	/// Summarize the stored session
	Show,

	/// Delete the stored session file
	Clear,
}

/// Settings shared by every command, each with an environment fallback.
#[derive(Args, Debug, Clone)]
pub struct Settings {
	/// Port for the status endpoints
	#[arg(long, env = "PORT", default_value_t = 3000, global = true)]
	pub port: u16,

	/// Address to bind the status endpoints to
	#[arg(long, env = "BIND_ADDRESS", default_value = "0.0.0.0", global = true)]
	pub bind: String,

	/// Session file (JSON cookie array)
	#[arg(long, env = "SESSION_FILE_PATH", default_value = "./session.json", global = true)]
	pub session_file: PathBuf,

	/// Page to keep open
	#[arg(long, env = "WHATSAPP_URL", default_value = wak::config::DEFAULT_TARGET_URL, global = true)]
	pub url: String,

	/// Run the browser without a window
	#[arg(long, env = "HEADLESS", default_value = "true", value_parser = BoolishValueParser::new(), action = clap::ArgAction::Set, global = true)]
	pub headless: bool,

	/// Keep the Chromium sandbox enabled
	#[arg(long, env = "BROWSER_SANDBOX", default_value = "false", value_parser = BoolishValueParser::new(), action = clap::ArgAction::Set, global = true)]
	pub sandbox: bool,

	/// Browser binary; discovered from PATH when unset
	#[arg(long, env = "CHROME_EXECUTABLE_PATH", global = true)]
	pub chrome_executable: Option<PathBuf>,

	/// Browser profile directory; a fresh temporary profile when unset
	#[arg(long, env = "BROWSER_USER_DATA_DIR", global = true)]
	pub user_data_dir: Option<PathBuf>,

	/// Seconds to wait before retrying a failed initialization
	#[arg(long, env = "RETRY_DELAY_SECS", default_value_t = 30, global = true)]
	pub retry_delay: u64,

	/// Cap for exponential retry backoff; fixed delay when unset
	#[arg(long, env = "RETRY_MAX_DELAY_SECS", global = true)]
	pub retry_max_delay: Option<u64>,

	/// Seconds between keep-alive probes
	#[arg(long, env = "KEEPALIVE_INTERVAL_SECS", default_value_t = 60, global = true)]
	pub keepalive_interval: u64,

	/// Seconds before a keep-alive probe counts as failed
	#[arg(long, env = "PROBE_TIMEOUT_SECS", default_value_t = 10, global = true)]
	pub probe_timeout: u64,

	/// Seconds to wait for a QR scan during interactive login
	#[arg(long, env = "LOGIN_TIMEOUT_SECS", default_value_t = 120, global = true)]
	pub login_timeout: u64,

	/// Seconds to wait for the chat list or the login challenge
	#[arg(long, env = "DETECTION_TIMEOUT_SECS", default_value_t = 15, global = true)]
	pub detection_timeout: u64,

	/// Seconds allowed for page navigation
	#[arg(long, env = "NAVIGATION_TIMEOUT_SECS", default_value_t = 60, global = true)]
	pub navigation_timeout: u64,

	/// Wait for a QR scan instead of failing when no session is stored
	#[arg(long, env = "INTERACTIVE_LOGIN", default_value = "false", value_parser = BoolishValueParser::new(), action = clap::ArgAction::Set, global = true)]
	pub interactive_login: bool,

	/// Selectors that mean the chat list is visible (comma separated)
	#[arg(long, env = "READY_SELECTORS", value_delimiter = ',', global = true)]
	pub ready_selectors: Vec<String>,

	/// Selectors that mean a login challenge is visible (comma separated)
	#[arg(long, env = "LOGIN_SELECTORS", value_delimiter = ',', global = true)]
	pub login_selectors: Vec<String>,
}
