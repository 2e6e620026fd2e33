//! `wak session show|clear`.

use chrono::{DateTime, Utc};
use wak::{CookieRecord, FileSessionStore, StoredSession};

use crate::cli::{SessionCommand, Settings};
use crate::error::Result;

pub fn run(command: SessionCommand, settings: &Settings) -> Result<()> {
	let store = settings.session_store();
	match command {
		SessionCommand::Show => show(&store),
		SessionCommand::Clear => clear(&store),
	}
}

fn show(store: &FileSessionStore) -> Result<()> {
	let path = store.path().display();
	match store.inspect() {
		StoredSession::Missing => println!("No session stored at {path}"),
		StoredSession::Empty => println!("Session file {path} holds no cookies; it will be ignored"),
		StoredSession::Malformed(reason) => println!("Session file {path} is malformed and will be ignored: {reason}"),
		StoredSession::Unreadable(reason) => println!("Session file {path} could not be read: {reason}"),
		StoredSession::Present(session) => {
			let now = Utc::now().timestamp() as f64;
			println!("Session file: {path}");
			println!("Cookies: {}", session.cookies().len());
			for cookie in session.cookies() {
				println!("  {:<24} {:<28} {}", cookie.name, cookie.domain, describe_expiry(cookie, now));
			}
		}
	}
	Ok(())
}

fn clear(store: &FileSessionStore) -> Result<()> {
	if store.clear()? {
		println!("Removed {}", store.path().display());
	} else {
		println!("No session file at {}", store.path().display());
	}
	Ok(())
}

fn describe_expiry(cookie: &CookieRecord, now: f64) -> String {
	if cookie.is_session_cookie() {
		return "session".to_string();
	}
	let when = DateTime::<Utc>::from_timestamp(cookie.expires as i64, 0)
		.map(|at| at.format("%Y-%m-%d %H:%M UTC").to_string())
		.unwrap_or_else(|| format!("{}", cookie.expires));
	if cookie.is_expired_at(now) { format!("expired {when}") } else { format!("expires {when}") }
}
