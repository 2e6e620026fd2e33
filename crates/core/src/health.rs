//! Keep-alive probing of a ready session.

use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

use crate::automation::AutomationHandle;
use crate::error::{AutomationError, LifecycleError};

/// Periodically probes a ready handle and reports the first failure.
#[derive(Debug, Clone, Copy)]
pub struct HealthMonitor {
	interval: Duration,
	probe_timeout: Duration,
}

impl HealthMonitor {
	pub fn new(interval: Duration, probe_timeout: Duration) -> Self {
		Self { interval, probe_timeout }
	}

	/// Runs one probe. Any failure is a [`LifecycleError::ConnectionLost`].
	pub async fn probe_once(&self, handle: &dyn AutomationHandle) -> Result<String, LifecycleError> {
		if handle.is_closed() {
			return Err(LifecycleError::ConnectionLost(AutomationError::Closed));
		}

		match tokio::time::timeout(self.probe_timeout, handle.probe()).await {
			Ok(Ok(title)) => Ok(title),
			Ok(Err(err)) => Err(LifecycleError::ConnectionLost(err)),
			Err(_) => Err(LifecycleError::ConnectionLost(AutomationError::Timeout(self.probe_timeout))),
		}
	}

	/// Probes every interval until a probe fails, then returns that failure.
	///
	/// The first probe runs one interval after the call. Probes never overlap,
	/// and dropping the future stops the ticker.
	pub async fn run(&self, handle: &dyn AutomationHandle) -> LifecycleError {
		let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
		ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

		loop {
			ticker.tick().await;
			match self.probe_once(handle).await {
				Ok(title) => debug!(target = "wak.health", %title, "keep-alive ping"),
				Err(err) => return err,
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::automation::AutomationEngine;
	use crate::detect::MarkerSet;
	use crate::fake::{FakeEngine, FakePage};

	fn monitor() -> HealthMonitor {
		HealthMonitor::new(Duration::from_secs(60), Duration::from_secs(10))
	}

	#[tokio::test(start_paused = true)]
	async fn healthy_probe_returns_title() {
		let (engine, controller) = FakeEngine::new(MarkerSet::default());
		controller.push(FakePage::ready());
		let handle = engine.launch(&Default::default()).await.unwrap();

		assert_eq!(monitor().probe_once(handle.as_ref()).await.unwrap(), "WhatsApp");
	}

	#[tokio::test(start_paused = true)]
	async fn closed_handle_is_connection_lost() {
		let (engine, controller) = FakeEngine::new(MarkerSet::default());
		controller.push(FakePage::ready());
		let handle = engine.launch(&Default::default()).await.unwrap();
		handle.close().await.unwrap();

		let err = monitor().probe_once(handle.as_ref()).await.unwrap_err();
		assert!(matches!(err, LifecycleError::ConnectionLost(AutomationError::Closed)));
		assert_eq!(controller.probes(), 0, "closed handles are not probed");
	}

	#[tokio::test(start_paused = true)]
	async fn hung_probe_times_out() {
		let (engine, controller) = FakeEngine::new(MarkerSet::default());
		controller.push(FakePage::ready().with_hanging_probe());
		let handle = engine.launch(&Default::default()).await.unwrap();

		let err = monitor().probe_once(handle.as_ref()).await.unwrap_err();
		assert!(matches!(err, LifecycleError::ConnectionLost(AutomationError::Timeout(_))));
	}

	#[tokio::test(start_paused = true)]
	async fn run_returns_on_first_failed_tick() {
		let (engine, controller) = FakeEngine::new(MarkerSet::default());
		controller.push(FakePage::ready().with_probe_failure_after(2));
		let handle = engine.launch(&Default::default()).await.unwrap();

		let start = Instant::now();
		let err = monitor().run(handle.as_ref()).await;
		assert!(err.is_connection_lost());
		assert_eq!(controller.probes(), 3);
		assert_eq!(start.elapsed(), Duration::from_secs(180));
	}
}
