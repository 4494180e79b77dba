// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The notifier: configuration, ambient scope and the capture pipeline.
//!
//! `notify` runs ignore check, report build, before-notify hooks and then
//! exactly one of: test capture, queue push, or inline send.

use std::sync::Arc;

use loom_errors_core::{IgnoreFilter, Report};
use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::builder::ReportBuilder;
use crate::config::Config;
use crate::error::Result;
use crate::fault::Fault;
use crate::hooks::run_hooks;
use crate::panic_hook;
use crate::queue::{DeliveryQueue, FlushSummary, QueueConfig};
use crate::scope::{NotifyOptions, Scope};
use crate::transport::{HttpTransport, IngestResponse, Transport};

/// What happened to a notified fault.
#[derive(Debug, Clone, PartialEq)]
pub enum Notified {
	/// Not configured, or configured with `enabled = false`.
	Disabled,
	/// Matched an ignore pattern; no report was built.
	Ignored,
	/// A before-notify hook vetoed the report.
	Aborted,
	/// Diverted into the test-capture buffer.
	Captured,
	/// Accepted by the delivery queue.
	Queued,
	/// Rejected by a full or stopped delivery queue.
	Dropped,
	/// Delivered inline.
	Sent(IngestResponse),
	/// Inline delivery failed; details were logged.
	Failed,
}

impl Notified {
	pub fn response(&self) -> Option<&IngestResponse> {
		match self {
			Notified::Sent(response) => Some(response),
			_ => None,
		}
	}

	pub fn into_response(self) -> Option<IngestResponse> {
		match self {
			Notified::Sent(response) => Some(response),
			_ => None,
		}
	}
}

struct Engine {
	config: Arc<Config>,
	ignore: IgnoreFilter,
	builder: ReportBuilder,
	transport: Arc<dyn Transport>,
	queue: Option<Arc<DeliveryQueue>>,
}

#[derive(Default)]
struct Shared {
	engine: RwLock<Option<Arc<Engine>>>,
	capture: Mutex<Option<Vec<Report>>>,
	pending_fatal: Mutex<Option<Fault>>,
}

/// Handle to the error notifier.
///
/// Clones share everything, including the ambient [`Scope`].
/// [`Notifier::fork`] shares configuration, queue and capture buffer but
/// starts with an empty scope, so concurrent requests or jobs never see
/// each other's context.
#[derive(Clone, Default)]
pub struct Notifier {
	shared: Arc<Shared>,
	scope: Arc<RwLock<Scope>>,
}

impl Notifier {
	/// An unconfigured notifier; `notify` is a no-op until
	/// [`Notifier::configure`] is called.
	pub fn new() -> Self {
		Self::default()
	}

	/// Configures (or reconfigures) with the HTTP transport.
	pub fn configure(&self, config: Config) -> Result<()> {
		let transport = Arc::new(HttpTransport::new(&config)?);
		self.configure_with_transport(config, transport)
	}

	/// Configures with a custom transport. When async sending is on and a
	/// Tokio runtime is current, the queue's background worker is started.
	/// A previous configuration's queue is stopped in the background.
	pub fn configure_with_transport(
		&self,
		config: Config,
		transport: Arc<dyn Transport>,
	) -> Result<()> {
		let config = Arc::new(config);
		let ignore = IgnoreFilter::new(config.ignore_patterns())?;
		let builder = ReportBuilder::new(Arc::clone(&config));

		let queue = if config.async_send() {
			let queue = Arc::new(DeliveryQueue::new(
				QueueConfig::from_config(&config),
				Arc::clone(&transport),
			));
			if Handle::try_current().is_ok() {
				queue.spawn();
			}
			Some(queue)
		} else {
			None
		};

		info!(
			endpoint = %config.endpoint(),
			environment = %config.environment(),
			enabled = config.enabled(),
			async_send = config.async_send(),
			"error notifier configured"
		);

		let engine = Arc::new(Engine {
			config,
			ignore,
			builder,
			transport,
			queue,
		});
		let previous = self.shared.engine.write().replace(engine);

		if let Some(queue) = previous.and_then(|engine| engine.queue.clone()) {
			match Handle::try_current() {
				Ok(handle) => {
					handle.spawn(async move {
						queue.stop().await;
					});
				}
				Err(_) if !queue.is_empty() => {
					warn!(
						queue_len = queue.len(),
						"reconfigured outside a runtime, dropping queued error reports"
					);
				}
				Err(_) => {}
			}
		}

		Ok(())
	}

	pub fn is_configured(&self) -> bool {
		self.shared.engine.read().is_some()
	}

	/// The active configuration, if any.
	pub fn config(&self) -> Option<Arc<Config>> {
		self
			.shared
			.engine
			.read()
			.as_ref()
			.map(|engine| Arc::clone(&engine.config))
	}

	/// A handle sharing this notifier's configuration with a fresh scope.
	pub fn fork(&self) -> Self {
		Self {
			shared: Arc::clone(&self.shared),
			scope: Arc::new(RwLock::new(Scope::new())),
		}
	}

	/// Merges into the ambient context.
	pub fn set_context(&self, context: Map<String, Value>) {
		self.scope.write().set_context(context);
	}

	pub fn set_user(&self, user: Map<String, Value>) {
		self.scope.write().set_user(user);
	}

	pub fn set_request(&self, request: Map<String, Value>) {
		self.scope.write().set_request(request);
	}

	pub fn context(&self) -> Map<String, Value> {
		self.scope.read().context().clone()
	}

	pub fn user(&self) -> Map<String, Value> {
		self.scope.read().user().clone()
	}

	pub fn request(&self) -> Map<String, Value> {
		self.scope.read().request().clone()
	}

	/// Resets context, user and request.
	pub fn clear(&self) {
		self.scope.write().clear();
	}

	/// Reports `fault`. Never fails; the outcome says what happened.
	///
	/// With async sending on this only pushes to the queue and does not
	/// wait on the network.
	pub async fn notify(&self, fault: &Fault, options: NotifyOptions) -> Notified {
		self.dispatch(fault, options, false).await
	}

	/// Like [`Notifier::notify`] but always delivers inline, bypassing the
	/// queue, and returns the server's response.
	pub async fn notify_sync(
		&self,
		fault: &Fault,
		options: NotifyOptions,
	) -> Option<IngestResponse> {
		self.dispatch(fault, options, true).await.into_response()
	}

	async fn dispatch(&self, fault: &Fault, options: NotifyOptions, inline: bool) -> Notified {
		let Some(engine) = self.engine() else {
			debug!(class = %fault.class_name(), "error notifier not configured, skipping");
			return Notified::Disabled;
		};
		if !engine.config.enabled() {
			return Notified::Disabled;
		}

		if let Some(pattern) = engine.ignore.matching_pattern(fault.identity()) {
			debug!(class = %fault.class_name(), pattern = %pattern, "ignoring fault");
			return Notified::Ignored;
		}

		let parts = self.scope.read().merge(options);
		let report = engine.builder.build(fault, parts);

		let outcome = run_hooks(engine.config.before_notify(), report);
		for failure in &outcome.failures {
			warn!(hook = %failure.hook, error = %failure.error, "before-notify hook failed");
		}
		let Some(report) = outcome.report else {
			debug!(
				class = %fault.class_name(),
				hook = ?outcome.aborted_by,
				"error report aborted by before-notify hook"
			);
			return Notified::Aborted;
		};

		{
			let mut capture = self.shared.capture.lock();
			if let Some(buffer) = capture.as_mut() {
				buffer.push(report);
				return Notified::Captured;
			}
		}

		match (&engine.queue, inline) {
			(Some(queue), false) => {
				if queue.push(report) {
					Notified::Queued
				} else {
					Notified::Dropped
				}
			}
			_ => match engine.transport.send(&report).await {
				Some(response) => Notified::Sent(response),
				None => Notified::Failed,
			},
		}
	}

	fn engine(&self) -> Option<Arc<Engine>> {
		self.shared.engine.read().clone()
	}

	/// Diverts reports into an in-memory buffer instead of delivering them.
	pub fn start_test_capture(&self) {
		*self.shared.capture.lock() = Some(Vec::new());
	}

	pub fn is_capturing(&self) -> bool {
		self.shared.capture.lock().is_some()
	}

	/// Drains the capture buffer, leaving capture mode on.
	pub fn take_captured(&self) -> Vec<Report> {
		self
			.shared
			.capture
			.lock()
			.as_mut()
			.map(std::mem::take)
			.unwrap_or_default()
	}

	/// Leaves capture mode, returning whatever was still buffered.
	pub fn stop_test_capture(&self) -> Vec<Report> {
		self.shared.capture.lock().take().unwrap_or_default()
	}

	/// Waits until every queued report has been delivered or dropped.
	pub async fn flush(&self) -> FlushSummary {
		match self.engine().and_then(|engine| engine.queue.clone()) {
			Some(queue) => queue.flush().await,
			None => FlushSummary::default(),
		}
	}

	/// Final flush (bounded by the shutdown grace period), then stops the
	/// queue. Later async notifies are dropped.
	pub async fn stop(&self) -> FlushSummary {
		match self.engine().and_then(|engine| engine.queue.clone()) {
			Some(queue) => queue.stop().await,
			None => FlushSummary::default(),
		}
	}

	/// Records a fault that took the process down; reported by
	/// [`Notifier::shutdown`].
	pub fn record_fatal(&self, fault: Fault) {
		*self.shared.pending_fatal.lock() = Some(fault);
	}

	pub fn has_pending_fatal(&self) -> bool {
		self.shared.pending_fatal.lock().is_some()
	}

	/// End-of-process hook: reports any pending fatal fault, then stops.
	pub async fn shutdown(&self) -> FlushSummary {
		let pending = self.shared.pending_fatal.lock().take();
		if let Some(fault) = pending {
			info!(class = %fault.class_name(), "reporting fatal fault at shutdown");
			self.notify(&fault, NotifyOptions::default()).await;
		}
		self.stop().await
	}

	/// Installs a panic hook recording panics as pending fatal faults. The
	/// previously installed hook still runs.
	pub fn install_panic_hook(&self) {
		panic_hook::install(self.clone());
	}
}

impl std::fmt::Debug for Notifier {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Notifier")
			.field("configured", &self.is_configured())
			.field("capturing", &self.is_capturing())
			.finish_non_exhaustive()
	}
}
