// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Bounded delivery queue with retry and background draining.
//!
//! Pushing never blocks: once the queue holds `max_queue_size` reports,
//! further pushes are rejected and the queued reports are kept (drop-newest).
//! Draining is FIFO and one report at a time; each report gets the fixed
//! retry budget and is dropped for good if every attempt fails. A report
//! being delivered still counts towards `max_queue_size` and [`len`].
//!
//! [`len`]: DeliveryQueue::len

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use loom_errors_core::Report;
use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::retry::{retry, RetryConfig};
use crate::transport::Transport;

#[derive(Debug, Clone)]
pub struct QueueConfig {
	pub max_queue_size: usize,
	/// Interval between background drains when nothing is pushed.
	pub flush_interval: Duration,
	pub retry: RetryConfig,
	/// Upper bound on the final flush in [`DeliveryQueue::stop`].
	pub shutdown_grace: Duration,
}

impl QueueConfig {
	pub fn from_config(config: &Config) -> Self {
		Self {
			max_queue_size: config.max_queue_size(),
			flush_interval: config.flush_interval(),
			retry: config.retry().clone(),
			shutdown_grace: config.shutdown_grace(),
		}
	}
}

impl Default for QueueConfig {
	fn default() -> Self {
		Self::from_config(&Config::default())
	}
}

/// What one flush did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushSummary {
	pub delivered: usize,
	pub dropped: usize,
}

pub struct DeliveryQueue {
	config: QueueConfig,
	transport: Arc<dyn Transport>,
	entries: Mutex<VecDeque<Report>>,
	/// Serialises drains so FIFO order holds across the worker and callers.
	drain: AsyncMutex<()>,
	stopped: AtomicBool,
	wake: Notify,
	worker: Mutex<Option<JoinHandle<()>>>,
}

impl DeliveryQueue {
	pub fn new(config: QueueConfig, transport: Arc<dyn Transport>) -> Self {
		Self {
			config,
			transport,
			entries: Mutex::new(VecDeque::new()),
			drain: AsyncMutex::new(()),
			stopped: AtomicBool::new(false),
			wake: Notify::new(),
			worker: Mutex::new(None),
		}
	}

	/// Queues `report` for delivery. Returns `false` when the queue is full
	/// or stopped; the report is then discarded.
	pub fn push(&self, report: Report) -> bool {
		if self.stopped.load(Ordering::SeqCst) {
			warn!(class = %report.class(), "delivery queue stopped, dropping error report");
			return false;
		}

		{
			let mut entries = self.entries.lock();
			if entries.len() >= self.config.max_queue_size {
				warn!(
					class = %report.class(),
					queue_len = entries.len(),
					max_queue_size = self.config.max_queue_size,
					"delivery queue full, dropping error report"
				);
				return false;
			}
			entries.push_back(report);
		}

		self.wake.notify_one();
		true
	}

	pub fn len(&self) -> usize {
		self.entries.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.lock().is_empty()
	}

	pub fn is_stopped(&self) -> bool {
		self.stopped.load(Ordering::SeqCst)
	}

	/// Delivers every queued report in arrival order and returns once the
	/// queue is empty. A no-op on an empty queue.
	pub async fn flush(&self) -> FlushSummary {
		let _drain = self.drain.lock().await;
		let mut summary = FlushSummary::default();

		loop {
			// The report keeps its slot until delivery finishes, so the
			// bound and the grace-period accounting both include it.
			let next = self.entries.lock().front().cloned();
			let Some(report) = next else {
				break;
			};

			let delivered = self.deliver(&report).await;
			self.entries.lock().pop_front();

			if delivered {
				summary.delivered += 1;
			} else {
				error!(
					class = %report.class(),
					attempts = self.config.retry.max_attempts,
					"giving up on error report"
				);
				summary.dropped += 1;
			}
		}

		if summary != FlushSummary::default() {
			debug!(
				delivered = summary.delivered,
				dropped = summary.dropped,
				"delivery queue flushed"
			);
		}
		summary
	}

	async fn deliver(&self, report: &Report) -> bool {
		retry(&self.config.retry, |_| self.transport.send(report))
			.await
			.is_some()
	}

	/// Starts the background drain task on the current Tokio runtime.
	pub fn spawn(self: &Arc<Self>) {
		let queue = Arc::clone(self);
		let handle = tokio::spawn(async move {
			queue.run().await;
		});
		if let Some(previous) = self.worker.lock().replace(handle) {
			previous.abort();
		}
	}

	async fn run(&self) {
		debug!(
			flush_interval_secs = self.config.flush_interval.as_secs(),
			max_queue_size = self.config.max_queue_size,
			"starting error delivery worker"
		);

		loop {
			tokio::select! {
				_ = tokio::time::sleep(self.config.flush_interval) => {}
				_ = self.wake.notified() => {}
			}

			if self.is_stopped() {
				break;
			}
			self.flush().await;
		}

		debug!("error delivery worker stopped");
	}

	/// Stops accepting reports, performs a final flush bounded by the
	/// shutdown grace period and stops the worker. Reports still queued when
	/// the grace period runs out, including one mid-delivery, are dropped and
	/// counted in the summary.
	pub async fn stop(&self) -> FlushSummary {
		if self.stopped.swap(true, Ordering::SeqCst) {
			return FlushSummary::default();
		}
		self.wake.notify_one();

		let summary = match tokio::time::timeout(self.config.shutdown_grace, self.flush()).await {
			Ok(summary) => summary,
			Err(_) => {
				let remaining = {
					let mut entries = self.entries.lock();
					let remaining = entries.len();
					entries.clear();
					remaining
				};
				warn!(
					remaining = remaining,
					grace_secs = self.config.shutdown_grace.as_secs(),
					"shutdown grace period elapsed, dropping queued error reports"
				);
				FlushSummary {
					delivered: 0,
					dropped: remaining,
				}
			}
		};

		let worker = self.worker.lock().take();
		if let Some(handle) = worker {
			handle.abort();
			let _ = handle.await;
		}

		info!(
			delivered = summary.delivered,
			dropped = summary.dropped,
			"error delivery queue stopped"
		);
		summary
	}
}

impl std::fmt::Debug for DeliveryQueue {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("DeliveryQueue")
			.field("config", &self.config)
			.field("len", &self.len())
			.field("stopped", &self.is_stopped())
			.finish_non_exhaustive()
	}
}
