//! Session persistence.
//!
//! The session file is a JSON array of [`CookieRecord`]s. Writes go to a
//! temporary file in the same directory and are renamed over the target, so
//! a reader (or a restart after a crash) sees either the previous session or
//! the new one, never a partial file.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};
use wak_protocol::CookieRecord;

use crate::error::StoreError;
use crate::session::Session;

/// Durable storage for the single session of this process.
pub trait SessionStore: Send + Sync {
	/// Loads the stored session. Never fails: anything unusable is `None`.
	fn load(&self) -> Option<Session>;

	/// Replaces the stored session.
	fn save(&self, session: &Session) -> Result<(), StoreError>;

	/// Human-readable location used in log lines.
	fn location(&self) -> String;
}

/// What [`FileSessionStore::inspect`] found on disk.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredSession {
	Missing,
	Empty,
	Malformed(String),
	Unreadable(String),
	Present(Session),
}

/// Accepted on-disk shapes: a bare cookie array, or a storage-state object
/// (`{"cookies": [...], "origins": [...]}`) as exported by Playwright tooling.
#[derive(Deserialize)]
#[serde(untagged)]
enum SessionFile {
	Cookies(Vec<CookieRecord>),
	StorageState { cookies: Vec<CookieRecord> },
}

impl SessionFile {
	fn into_cookies(self) -> Vec<CookieRecord> {
		match self {
			Self::Cookies(cookies) | Self::StorageState { cookies } => cookies,
		}
	}
}

/// [`SessionStore`] backed by a single JSON file.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
	path: PathBuf,
}

impl FileSessionStore {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Reads and classifies the session file without logging.
	pub fn inspect(&self) -> StoredSession {
		let content = match std::fs::read_to_string(&self.path) {
			Ok(content) => content,
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => return StoredSession::Missing,
			Err(err) => return StoredSession::Unreadable(err.to_string()),
		};

		match serde_json::from_str::<SessionFile>(&content) {
			Ok(file) => match Session::from_cookies(file.into_cookies()) {
				Some(session) => StoredSession::Present(session),
				None => StoredSession::Empty,
			},
			Err(err) => StoredSession::Malformed(err.to_string()),
		}
	}

	/// Removes the session file. Returns `false` if there was none.
	pub fn clear(&self) -> Result<bool, StoreError> {
		match std::fs::remove_file(&self.path) {
			Ok(()) => Ok(true),
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
			Err(err) => Err(StoreError::io(&self.path, err)),
		}
	}

	fn parent_dir(&self) -> &Path {
		match self.path.parent() {
			Some(parent) if !parent.as_os_str().is_empty() => parent,
			_ => Path::new("."),
		}
	}
}

impl SessionStore for FileSessionStore {
	fn load(&self) -> Option<Session> {
		match self.inspect() {
			StoredSession::Present(session) => {
				info!(target = "wak.store", path = %self.path.display(), cookies = session.cookies().len(), "session file loaded");
				Some(session)
			}
			StoredSession::Missing => {
				info!(target = "wak.store", path = %self.path.display(), "no session file found");
				None
			}
			StoredSession::Empty => {
				warn!(target = "wak.store", path = %self.path.display(), "session file holds no cookies; ignoring it");
				None
			}
			StoredSession::Malformed(reason) => {
				warn!(target = "wak.store", path = %self.path.display(), error = %reason, "session file is malformed; ignoring it");
				None
			}
			StoredSession::Unreadable(reason) => {
				warn!(target = "wak.store", path = %self.path.display(), error = %reason, "session file could not be read; ignoring it");
				None
			}
		}
	}

	fn save(&self, session: &Session) -> Result<(), StoreError> {
		let dir = self.parent_dir();
		std::fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;

		// NamedTempFile is created 0600 on unix, and persist() keeps that mode.
		let mut tmp = NamedTempFile::new_in(dir).map_err(|e| StoreError::io(dir, e))?;
		serde_json::to_writer_pretty(&mut tmp, session.cookies())?;
		tmp.write_all(b"\n").map_err(|e| StoreError::io(tmp.path(), e))?;
		tmp.as_file().sync_all().map_err(|e| StoreError::io(tmp.path(), e))?;
		tmp.persist(&self.path).map_err(|e| StoreError::io(&self.path, e.error))?;

		debug!(target = "wak.store", path = %self.path.display(), cookies = session.cookies().len(), "session file written");
		Ok(())
	}

	fn location(&self) -> String {
		self.path.display().to_string()
	}
}
