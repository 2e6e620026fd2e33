//! `wak`: keeps a WhatsApp Web session alive in a headless browser.

mod cli;
mod commands;
mod config;
mod error;
mod logging;
mod server;

use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, warn};

use crate::cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
	// Load .env before parsing so its values act as environment fallbacks.
	let dotenv = dotenvy::dotenv();
	let cli = Cli::parse();
	logging::init(cli.verbose);

	match dotenv {
		Ok(path) => debug!(target = "wak", path = %path.display(), "loaded .env"),
		Err(err) if err.not_found() => {}
		Err(err) => warn!(target = "wak", error = %err, "failed to load .env"),
	}

	match commands::dispatch(cli).await {
		Ok(()) => ExitCode::SUCCESS,
		Err(err) => {
			eprintln!("error: {:#}", anyhow::Error::from(err));
			ExitCode::FAILURE
		}
	}
}
