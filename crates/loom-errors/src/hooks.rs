// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Before-notify hooks.
//!
//! Hooks run in registration order against the built report. Each returns a
//! [`HookDecision`]; an `Err` or a panic counts as [`HookDecision::Continue`]
//! and the failure is recorded in the [`HookChainOutcome`] instead of being
//! propagated.

use std::cell::Cell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use loom_errors_core::Report;
use thiserror::Error;

/// What a hook wants done with the report.
#[derive(Debug, Clone, PartialEq)]
pub enum HookDecision {
	Continue,
	Abort,
	/// Continue with a modified copy.
	Replace(Report),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct HookError(pub String);

impl HookError {
	pub fn new(message: impl Into<String>) -> Self {
		Self(message.into())
	}
}

thread_local! {
	static IN_HOOK: Cell<bool> = const { Cell::new(false) };
}

/// True while a before-notify hook runs on this thread. Panics raised there
/// are caught by the chain and must not be recorded as fatal.
pub(crate) fn in_hook() -> bool {
	IN_HOOK.with(Cell::get)
}

/// Restores the previous `IN_HOOK` value, also when the hook unwinds.
struct HookMarker(bool);

impl HookMarker {
	fn enter() -> Self {
		Self(IN_HOOK.with(|flag| flag.replace(true)))
	}
}

impl Drop for HookMarker {
	fn drop(&mut self) {
		IN_HOOK.with(|flag| flag.set(self.0));
	}
}

type HookFn = dyn Fn(&Report) -> Result<HookDecision, HookError> + Send + Sync;

/// A named before-notify hook.
#[derive(Clone)]
pub struct BeforeNotifyHook {
	name: String,
	func: Arc<HookFn>,
}

impl BeforeNotifyHook {
	pub fn new<F>(name: impl Into<String>, func: F) -> Self
	where
		F: Fn(&Report) -> Result<HookDecision, HookError> + Send + Sync + 'static,
	{
		Self {
			name: name.into(),
			func: Arc::new(func),
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	fn call(&self, report: &Report) -> Result<HookDecision, HookError> {
		let _marker = HookMarker::enter();
		match panic::catch_unwind(AssertUnwindSafe(|| (self.func)(report))) {
			Ok(result) => result,
			Err(payload) => Err(HookError(format!(
				"hook panicked: {}",
				panic_message(&*payload)
			))),
		}
	}
}

impl fmt::Debug for BeforeNotifyHook {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("BeforeNotifyHook")
			.field("name", &self.name)
			.finish_non_exhaustive()
	}
}

/// A hook that failed and was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookFailure {
	pub hook: String,
	pub error: HookError,
}

/// Result of running the whole chain.
#[derive(Debug, Clone, PartialEq)]
pub struct HookChainOutcome {
	/// The report to deliver, `None` if a hook aborted.
	pub report: Option<Report>,
	pub aborted_by: Option<String>,
	pub failures: Vec<HookFailure>,
}

impl HookChainOutcome {
	pub fn is_aborted(&self) -> bool {
		self.report.is_none()
	}
}

pub fn run_hooks(hooks: &[BeforeNotifyHook], report: Report) -> HookChainOutcome {
	let mut report = report;
	let mut failures = Vec::new();

	for hook in hooks {
		match hook.call(&report) {
			Ok(HookDecision::Continue) => {}
			Ok(HookDecision::Replace(replacement)) => report = report.substitute(replacement),
			Ok(HookDecision::Abort) => {
				return HookChainOutcome {
					report: None,
					aborted_by: Some(hook.name.clone()),
					failures,
				};
			}
			Err(error) => failures.push(HookFailure {
				hook: hook.name.clone(),
				error,
			}),
		}
	}

	HookChainOutcome {
		report: Some(report),
		aborted_by: None,
		failures,
	}
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
	if let Some(s) = payload.downcast_ref::<&str>() {
		s.to_string()
	} else if let Some(s) = payload.downcast_ref::<String>() {
		s.clone()
	} else {
		"Box<dyn Any>".to_string()
	}
}
