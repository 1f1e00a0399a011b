// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Retry with exponential backoff for collector deliveries.

use reqwest::StatusCode;
use std::time::Duration;
use tracing::warn;

/// Statuses a collector may return for a transient condition.
const TRANSIENT_STATUSES: [StatusCode; 6] = [
	StatusCode::TOO_MANY_REQUESTS,
	StatusCode::REQUEST_TIMEOUT,
	StatusCode::INTERNAL_SERVER_ERROR,
	StatusCode::BAD_GATEWAY,
	StatusCode::SERVICE_UNAVAILABLE,
	StatusCode::GATEWAY_TIMEOUT,
];

#[derive(Debug, Clone)]
pub struct RetryConfig {
	pub max_attempts: u32,
	pub base_delay: Duration,
	pub max_delay: Duration,
	pub backoff_factor: f64,
	pub jitter: bool,
}

impl RetryConfig {
	/// A config that makes exactly one attempt.
	pub fn none() -> Self {
		Self {
			max_attempts: 1,
			..Self::default()
		}
	}
}

impl Default for RetryConfig {
	fn default() -> Self {
		Self {
			max_attempts: 3,
			base_delay: Duration::from_millis(200),
			max_delay: Duration::from_secs(5),
			backoff_factor: 2.0,
			jitter: true,
		}
	}
}

/// Classifies an error as worth another attempt.
pub trait RetryableError {
	fn is_retryable(&self) -> bool;

	/// Server-requested wait before the next attempt, e.g. from `Retry-After`.
	fn retry_after(&self) -> Option<Duration> {
		None
	}
}

impl RetryableError for reqwest::Error {
	fn is_retryable(&self) -> bool {
		if self.is_timeout() || self.is_connect() {
			return true;
		}

		self
			.status()
			.map(|status| TRANSIENT_STATUSES.contains(&status))
			.unwrap_or(false)
	}
}

fn backoff_delay(cfg: &RetryConfig, attempt: u32) -> Duration {
	let exponential = cfg.base_delay.as_secs_f64() * cfg.backoff_factor.powi(attempt as i32);
	let capped = exponential.min(cfg.max_delay.as_secs_f64());

	if cfg.jitter {
		Duration::from_secs_f64(capped * (0.5 + fastrand::f64()))
	} else {
		Duration::from_secs_f64(capped)
	}
}

/// Runs `f` until it succeeds, returns a non-retryable error, or the attempt
/// budget is spent.
///
/// A `retry_after` hint replaces the computed backoff, capped at `max_delay`.
pub async fn retry<F, Fut, T, E>(cfg: &RetryConfig, mut f: F) -> Result<T, E>
where
	F: FnMut() -> Fut,
	Fut: std::future::Future<Output = Result<T, E>>,
	E: RetryableError + std::fmt::Debug,
{
	let mut attempt = 0;

	loop {
		let err = match f().await {
			Ok(value) => return Ok(value),
			Err(err) => err,
		};
		attempt += 1;

		if !err.is_retryable() {
			warn!(error = ?err, attempt, "delivery failed with non-retryable error");
			return Err(err);
		}

		if attempt >= cfg.max_attempts {
			warn!(
				error = ?err,
				attempt,
				max_attempts = cfg.max_attempts,
				"delivery retries exhausted"
			);
			return Err(err);
		}

		let delay = match err.retry_after() {
			Some(hint) => hint.min(cfg.max_delay),
			None => backoff_delay(cfg, attempt - 1),
		};
		warn!(
			error = ?err,
			attempt,
			delay_ms = delay.as_millis() as u64,
			"retrying delivery"
		);
		tokio::time::sleep(delay).await;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicU32, Ordering};
	use std::sync::Arc;

	#[derive(Debug)]
	struct FakeError {
		retryable: bool,
	}

	impl RetryableError for FakeError {
		fn is_retryable(&self) -> bool {
			self.retryable
		}
	}

	#[derive(Debug)]
	struct ThrottledError(Duration);

	impl RetryableError for ThrottledError {
		fn is_retryable(&self) -> bool {
			true
		}

		fn retry_after(&self) -> Option<Duration> {
			Some(self.0)
		}
	}

	fn fast_config(max_attempts: u32) -> RetryConfig {
		RetryConfig {
			max_attempts,
			base_delay: Duration::from_millis(1),
			max_delay: Duration::from_millis(5),
			backoff_factor: 2.0,
			jitter: false,
		}
	}

	#[tokio::test]
	async fn non_retryable_error_is_returned_after_one_attempt() {
		let attempts = Arc::new(AtomicU32::new(0));
		let counter = Arc::clone(&attempts);

		let result: Result<(), FakeError> = retry(&fast_config(5), || {
			let counter = Arc::clone(&counter);
			async move {
				counter.fetch_add(1, Ordering::SeqCst);
				Err(FakeError { retryable: false })
			}
		})
		.await;

		assert!(result.is_err());
		assert_eq!(attempts.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn retryable_error_stops_at_max_attempts() {
		let attempts = Arc::new(AtomicU32::new(0));
		let counter = Arc::clone(&attempts);

		let result: Result<(), FakeError> = retry(&fast_config(3), || {
			let counter = Arc::clone(&counter);
			async move {
				counter.fetch_add(1, Ordering::SeqCst);
				Err(FakeError { retryable: true })
			}
		})
		.await;

		assert!(result.is_err());
		assert_eq!(attempts.load(Ordering::SeqCst), 3);
	}

	#[tokio::test]
	async fn recovers_after_transient_failures() {
		let attempts = Arc::new(AtomicU32::new(0));
		let counter = Arc::clone(&attempts);

		let result: Result<u32, FakeError> = retry(&fast_config(4), || {
			let counter = Arc::clone(&counter);
			async move {
				let n = counter.fetch_add(1, Ordering::SeqCst);
				if n < 2 {
					Err(FakeError { retryable: true })
				} else {
					Ok(n)
				}
			}
		})
		.await;

		assert_eq!(result.unwrap(), 2);
		assert_eq!(attempts.load(Ordering::SeqCst), 3);
	}

	#[tokio::test]
	async fn none_config_makes_a_single_attempt() {
		let attempts = Arc::new(AtomicU32::new(0));
		let counter = Arc::clone(&attempts);

		let _: Result<(), FakeError> = retry(&RetryConfig::none(), || {
			let counter = Arc::clone(&counter);
			async move {
				counter.fetch_add(1, Ordering::SeqCst);
				Err(FakeError { retryable: true })
			}
		})
		.await;

		assert_eq!(attempts.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn waits_for_server_hint_instead_of_backoff() {
		let cfg = RetryConfig {
			max_delay: Duration::from_secs(1),
			..fast_config(2)
		};
		let started = std::time::Instant::now();

		let _: Result<(), ThrottledError> = retry(&cfg, || async {
			Err(ThrottledError(Duration::from_millis(60)))
		})
		.await;

		assert!(started.elapsed() >= Duration::from_millis(60));
	}

	#[tokio::test]
	async fn server_hint_is_capped_by_max_delay() {
		let started = std::time::Instant::now();

		let _: Result<(), ThrottledError> = retry(&fast_config(2), || async {
			Err(ThrottledError(Duration::from_secs(30)))
		})
		.await;

		assert!(started.elapsed() < Duration::from_secs(5));
	}

	#[test]
	fn backoff_is_capped_by_max_delay() {
		let cfg = RetryConfig {
			max_attempts: 10,
			base_delay: Duration::from_secs(1),
			max_delay: Duration::from_secs(4),
			backoff_factor: 10.0,
			jitter: false,
		};

		for attempt in 0..8 {
			assert!(backoff_delay(&cfg, attempt) <= Duration::from_secs(4));
		}
	}

	#[test]
	fn jitter_stays_within_half_to_one_and_a_half() {
		let cfg = RetryConfig {
			jitter: true,
			..fast_config(3)
		};
		let base = backoff_delay(&RetryConfig { jitter: false, ..cfg.clone() }, 1);

		for _ in 0..20 {
			let delay = backoff_delay(&cfg, 1);
			assert!(delay >= base.mul_f64(0.49));
			assert!(delay <= base.mul_f64(1.51));
		}
	}
}
