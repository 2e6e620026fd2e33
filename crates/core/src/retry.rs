//! Delay policy applied after a failed initialization attempt.

use std::time::Duration;

/// How long to wait before the next initialization attempt.
///
/// There is no attempt cap: the lifecycle keeps retrying until shutdown,
/// since an operator may fix the environment (or drop in a fresh session
/// file) at any point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
	/// Same delay after every failure.
	Fixed { delay: Duration },
	/// `initial`, doubled per consecutive failure, never above `max`.
	Exponential { initial: Duration, max: Duration },
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self::Fixed {
			delay: Duration::from_secs(30),
		}
	}
}

impl RetryPolicy {
	/// Delay after the `consecutive_failures`-th failure in a row (1-based).
	pub fn delay_for(&self, consecutive_failures: u32) -> Duration {
		match *self {
			Self::Fixed { delay } => delay,
			Self::Exponential { initial, max } => {
				let exponent = consecutive_failures.saturating_sub(1).min(31);
				initial.saturating_mul(1u32 << exponent).min(max)
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn default_is_fixed_thirty_seconds() {
		let policy = RetryPolicy::default();
		for failures in [1, 2, 10, 1000] {
			assert_eq!(policy.delay_for(failures), Duration::from_secs(30));
		}
	}

	#[test]
	fn exponential_doubles_until_capped() {
		let policy = RetryPolicy::Exponential {
			initial: Duration::from_secs(5),
			max: Duration::from_secs(60),
		};
		let delays: Vec<_> = (1..=6).map(|n| policy.delay_for(n).as_secs()).collect();
		assert_eq!(delays, [5, 10, 20, 40, 60, 60]);
	}

	#[test]
	fn exponential_survives_huge_failure_counts() {
		let policy = RetryPolicy::Exponential {
			initial: Duration::from_secs(30),
			max: Duration::from_secs(600),
		};
		assert_eq!(policy.delay_for(u32::MAX), Duration::from_secs(600));
		assert_eq!(policy.delay_for(0), Duration::from_secs(30));
	}
}
