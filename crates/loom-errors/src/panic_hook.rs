// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Panic hook integration.

use crate::fault::Fault;
use crate::hooks;
use crate::notifier::Notifier;

/// Install a panic hook that records the panic as the notifier's pending
/// fatal fault.
///
/// Nothing is sent from inside the hook; the fault is reported when the host
/// calls [`Notifier::shutdown`]. The previously installed hook is called
/// afterwards. Panics inside before-notify hooks are caught by the hook
/// chain and are not recorded.
pub(crate) fn install(notifier: Notifier) {
	let default_hook = std::panic::take_hook();

	std::panic::set_hook(Box::new(move |info| {
		if hooks::in_hook() {
			default_hook(info);
			return;
		}

		let fault = Fault::from_panic(info);
		tracing::debug!(message = %fault.message(), "recorded panic as fatal fault");
		notifier.record_fatal(fault);

		default_hook(info);
	}));
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn panic_becomes_pending_fatal() {
		let notifier = Notifier::new();
		install(notifier.clone());

		let result = std::thread::spawn(|| panic!("worker exploded")).join();
		assert!(result.is_err());
		let _ = std::panic::take_hook();

		assert!(notifier.has_pending_fatal());
	}
}
