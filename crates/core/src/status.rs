//! Published lifecycle status.
//!
//! The lifecycle driver is the only writer. Each transition replaces the
//! whole [`StatusSnapshot`] in a `watch` channel, so readers (HTTP handlers,
//! tests, the CLI) always see a consistent record without taking locks.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;

/// States of the session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
	Idle,
	Launching,
	AwaitingMarker,
	Ready,
	Degraded,
	Retrying,
}

impl LifecycleState {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Idle => "idle",
			Self::Launching => "launching",
			Self::AwaitingMarker => "awaiting_marker",
			Self::Ready => "ready",
			Self::Degraded => "degraded",
			Self::Retrying => "retrying",
		}
	}
}

impl std::fmt::Display for LifecycleState {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Immutable view of the lifecycle at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSnapshot {
	pub state: LifecycleState,
	/// `true` iff `state` is [`LifecycleState::Ready`].
	pub ready: bool,
	/// Message of the most recent failure, cleared on reaching `Ready`.
	pub last_error: Option<String>,
	pub updated_at: DateTime<Utc>,
}

impl StatusSnapshot {
	fn new(state: LifecycleState, last_error: Option<String>) -> Self {
		Self {
			state,
			ready: state == LifecycleState::Ready,
			last_error,
			updated_at: Utc::now(),
		}
	}
}

/// Write side of the status channel. Owned by the lifecycle driver.
#[derive(Debug)]
pub(crate) struct StatusPublisher {
	tx: watch::Sender<StatusSnapshot>,
}

impl StatusPublisher {
	pub(crate) fn new() -> Self {
		let (tx, _rx) = watch::channel(StatusSnapshot::new(LifecycleState::Idle, None));
		Self { tx }
	}

	pub(crate) fn reader(&self) -> StatusReader {
		StatusReader { rx: self.tx.subscribe() }
	}

	/// Moves to `state`, keeping the last recorded error.
	pub(crate) fn transition(&self, state: LifecycleState) {
		let last_error = self.tx.borrow().last_error.clone();
		self.tx.send_replace(StatusSnapshot::new(state, last_error));
	}

	/// Moves to `state` and records `error` as the latest failure.
	pub(crate) fn fail(&self, state: LifecycleState, error: &dyn std::error::Error) {
		self.tx.send_replace(StatusSnapshot::new(state, Some(error.to_string())));
	}

	pub(crate) fn set_ready(&self) {
		self.tx.send_replace(StatusSnapshot::new(LifecycleState::Ready, None));
	}
}

/// Cloneable read side of the status channel.
#[derive(Debug, Clone)]
pub struct StatusReader {
	rx: watch::Receiver<StatusSnapshot>,
}

impl StatusReader {
	pub fn snapshot(&self) -> StatusSnapshot {
		self.rx.borrow().clone()
	}

	pub fn is_ready(&self) -> bool {
		self.rx.borrow().ready
	}

	pub fn state(&self) -> LifecycleState {
		self.rx.borrow().state
	}

	/// Waits until a published snapshot satisfies `predicate` and returns it.
	///
	/// Returns immediately if the current snapshot already matches.
	pub async fn wait_for(&mut self, mut predicate: impl FnMut(&StatusSnapshot) -> bool) -> Option<StatusSnapshot> {
		self.rx.wait_for(|snapshot| predicate(snapshot)).await.ok().map(|snapshot| (*snapshot).clone())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::AutomationError;

	#[test]
	fn starts_idle_and_not_ready() {
		let publisher = StatusPublisher::new();
		let snapshot = publisher.reader().snapshot();
		assert_eq!(snapshot.state, LifecycleState::Idle);
		assert!(!snapshot.ready);
		assert!(snapshot.last_error.is_none());
	}

	#[test]
	fn ready_clears_last_error() {
		let publisher = StatusPublisher::new();
		let reader = publisher.reader();

		publisher.fail(LifecycleState::Retrying, &AutomationError::Closed);
		assert_eq!(reader.snapshot().last_error.as_deref(), Some("browser handle is closed"));

		publisher.transition(LifecycleState::Launching);
		assert_eq!(reader.state(), LifecycleState::Launching);
		assert!(reader.snapshot().last_error.is_some(), "error survives plain transitions");

		publisher.set_ready();
		let snapshot = reader.snapshot();
		assert!(snapshot.ready);
		assert!(snapshot.last_error.is_none());
	}

	#[test]
	fn only_ready_state_is_ready() {
		let publisher = StatusPublisher::new();
		let reader = publisher.reader();
		for state in [LifecycleState::Launching, LifecycleState::AwaitingMarker, LifecycleState::Degraded, LifecycleState::Retrying] {
			publisher.transition(state);
			assert!(!reader.is_ready(), "{state} must not report ready");
		}
	}

	#[tokio::test]
	async fn wait_for_sees_later_transitions() {
		let publisher = StatusPublisher::new();
		let mut reader = publisher.reader();

		let waiter = tokio::spawn(async move { reader.wait_for(|s| s.ready).await });
		publisher.transition(LifecycleState::Launching);
		publisher.set_ready();

		let snapshot = waiter.await.unwrap().unwrap();
		assert_eq!(snapshot.state, LifecycleState::Ready);
	}
}
