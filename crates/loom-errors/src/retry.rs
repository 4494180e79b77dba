// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Fixed retry schedule for report delivery.
//!
//! Every failure is treated the same: the transport does not distinguish
//! retryable from terminal failures, so each report gets exactly
//! `max_attempts` tries with a doubling delay between them.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Delivery attempts per report.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Delay before the first retry.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
	pub max_attempts: u32,
	pub base_delay: Duration,
}

impl Default for RetryConfig {
	fn default() -> Self {
		Self {
			max_attempts: DEFAULT_MAX_ATTEMPTS,
			base_delay: DEFAULT_BASE_DELAY,
		}
	}
}

/// `base_delay * 2^attempt`, where `attempt` counts failures so far minus one.
pub fn delay_for_attempt(cfg: &RetryConfig, attempt: u32) -> Duration {
	cfg.base_delay.saturating_mul(2u32.saturating_pow(attempt))
}

/// Runs `f` until it yields `Some` or the attempt budget is spent.
pub async fn retry<F, Fut, T>(cfg: &RetryConfig, mut f: F) -> Option<T>
where
	F: FnMut(u32) -> Fut,
	Fut: Future<Output = Option<T>>,
{
	let max_attempts = cfg.max_attempts.max(1);
	let mut attempt = 0;

	loop {
		attempt += 1;
		if let Some(result) = f(attempt).await {
			return Some(result);
		}

		if attempt >= max_attempts {
			warn!(
				attempt = attempt,
				max_attempts = max_attempts,
				"max delivery attempts exhausted"
			);
			return None;
		}

		let delay = delay_for_attempt(cfg, attempt - 1);
		warn!(
			attempt = attempt,
			max_attempts = max_attempts,
			delay_ms = delay.as_millis(),
			"retrying delivery"
		);
		tokio::time::sleep(delay).await;
	}
}
