mod login;
mod serve;
mod session;

use std::sync::Arc;

use wak::LifecycleController;
use wak_runtime::ChromiumEngine;

use crate::cli::{Cli, Commands, Settings};
use crate::error::Result;

pub async fn dispatch(cli: Cli) -> Result<()> {
	let settings = cli.settings;
	match cli.command.unwrap_or(Commands::Serve) {
		Commands::Serve => serve::run(&settings).await?,
		Commands::Login => login::run(&settings).await?,
		Commands::Session(command) => session::run(command, &settings)?,
	}

	Ok(())
}

/// Lifecycle wired to Chromium and the configured session file.
fn chromium_lifecycle(settings: &Settings, config: wak::LifecycleConfig) -> LifecycleController {
	LifecycleController::new(Arc::new(ChromiumEngine::new()), Arc::new(settings.session_store()), config)
}
