//! The persisted credential bundle.

use wak_protocol::CookieRecord;

/// A usable WhatsApp Web session: a non-empty, ordered cookie set.
///
/// An empty cookie list is not a session, so there is no way to construct
/// one from it.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
	cookies: Vec<CookieRecord>,
}

impl Session {
	/// Wraps `cookies`, or returns `None` when there are none.
	pub fn from_cookies(cookies: Vec<CookieRecord>) -> Option<Self> {
		if cookies.is_empty() { None } else { Some(Self { cookies }) }
	}

	pub fn cookies(&self) -> &[CookieRecord] {
		&self.cookies
	}

}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_cookie_list_is_not_a_session() {
		assert!(Session::from_cookies(Vec::new()).is_none());
	}

	#[test]
	fn keeps_cookie_order() {
		let session = Session::from_cookies(vec![CookieRecord::new("b", "2", "x.com"), CookieRecord::new("a", "1", "x.com")]).unwrap();
		let names: Vec<_> = session.cookies().iter().map(|c| c.name.as_str()).collect();
		assert_eq!(names, ["b", "a"]);
		assert_eq!(session.cookies().len(), 2);
	}
}
