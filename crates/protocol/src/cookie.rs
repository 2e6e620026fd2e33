//! Cookie records as persisted in the session file.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Expiry value browsers report for cookies that end with the browser session.
pub const SESSION_COOKIE_EXPIRY: f64 = -1.0;

/// Cookie `SameSite` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSite {
	Strict,
	Lax,
	None,
}

/// One cookie of a stored WhatsApp Web session.
///
/// Field names match the JSON written by browser tooling (`httpOnly`,
/// `sameSite`, ...). Attributes this type does not model, such as `size` or
/// `priority`, are kept in [`CookieRecord::extra`] and written back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CookieRecord {
	pub name: String,
	pub value: String,
	pub domain: String,
	#[serde(default = "default_path")]
	pub path: String,
	/// Unix timestamp in seconds, or [`SESSION_COOKIE_EXPIRY`].
	#[serde(default = "default_expires")]
	pub expires: f64,
	#[serde(default)]
	pub http_only: bool,
	#[serde(default)]
	pub secure: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub same_site: Option<SameSite>,
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

fn default_path() -> String {
	"/".to_string()
}

fn default_expires() -> f64 {
	SESSION_COOKIE_EXPIRY
}

impl CookieRecord {
	/// Creates a session-scoped cookie with path `/` and no flags set.
	pub fn new(name: impl Into<String>, value: impl Into<String>, domain: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			value: value.into(),
			domain: domain.into(),
			path: default_path(),
			expires: SESSION_COOKIE_EXPIRY,
			http_only: false,
			secure: false,
			same_site: None,
			extra: Map::new(),
		}
	}

	/// Returns `true` when the cookie has no absolute expiry.
	pub fn is_session_cookie(&self) -> bool {
		self.expires < 0.0
	}

	/// Returns `true` when the cookie carries an expiry at or before `unix_secs`.
	pub fn is_expired_at(&self, unix_secs: f64) -> bool {
		!self.is_session_cookie() && self.expires <= unix_secs
	}
}
