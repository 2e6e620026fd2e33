//! Chrome/Chromium executable discovery.

use std::path::{Path, PathBuf};

use tracing::debug;
use wak::AutomationError;

/// Picks the browser binary: the explicit override when given, otherwise
/// the first installed candidate for this platform.
pub fn resolve_executable(explicit: Option<&Path>) -> Result<PathBuf, AutomationError> {
	if let Some(path) = explicit {
		return if path.exists() {
			Ok(path.to_path_buf())
		} else {
			Err(AutomationError::Engine(format!("configured browser executable {} does not exist", path.display())))
		};
	}

	find_chrome_executable().ok_or_else(|| {
		AutomationError::Engine("could not find a Chrome/Chromium executable; install one or set CHROME_EXECUTABLE_PATH".to_string())
	})
}

/// Searches well-known install locations and `PATH`.
pub fn find_chrome_executable() -> Option<PathBuf> {
	let found = platform_candidates().into_iter().find_map(|candidate| locate(&candidate));
	debug!(target = "wak.runtime", executable = ?found, "browser discovery finished");
	found
}

fn locate(candidate: &str) -> Option<PathBuf> {
	let path = Path::new(candidate);
	if path.is_absolute() {
		path.exists().then(|| path.to_path_buf())
	} else {
		which::which(candidate).ok()
	}
}

fn platform_candidates() -> Vec<String> {
	if cfg!(target_os = "macos") {
		[
			"/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
			"/Applications/Chromium.app/Contents/MacOS/Chromium",
			"/Applications/Google Chrome Canary.app/Contents/MacOS/Google Chrome Canary",
		]
		.into_iter()
		.map(str::to_string)
		.collect()
	} else if cfg!(target_os = "windows") {
		windows_candidates()
	} else {
		[
			"google-chrome-stable",
			"google-chrome",
			"chromium",
			"chromium-browser",
			"/usr/bin/google-chrome-stable",
			"/usr/bin/google-chrome",
			"/usr/bin/chromium",
			"/usr/bin/chromium-browser",
			"/snap/bin/chromium",
		]
		.into_iter()
		.map(str::to_string)
		.collect()
	}
}

fn windows_candidates() -> Vec<String> {
	let mut roots: Vec<PathBuf> = ["PROGRAMFILES", "PROGRAMFILES(X86)", "LOCALAPPDATA"]
		.into_iter()
		.filter_map(|key| std::env::var_os(key).map(PathBuf::from))
		.collect();
	if roots.is_empty() {
		roots.push(PathBuf::from(r"C:\Program Files"));
		roots.push(PathBuf::from(r"C:\Program Files (x86)"));
	}

	let suffixes: &[&[&str]] = &[&["Google", "Chrome", "Application", "chrome.exe"], &["Chromium", "Application", "chrome.exe"]];

	let mut candidates: Vec<String> = roots
		.iter()
		.flat_map(|root| suffixes.iter().map(move |suffix| suffix.iter().fold(root.clone(), |path, part| path.join(part))))
		.map(|path| path.to_string_lossy().into_owned())
		.collect();
	candidates.extend(["chrome.exe", "chromium.exe"].map(str::to_string));
	candidates
}
