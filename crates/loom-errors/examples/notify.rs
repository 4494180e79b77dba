// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Example: report a few faults with the loom-errors SDK.
//!
//! Run with:
//!   LOOM_ERRORS_API_KEY=... cargo run --example notify -p loom-errors
//!
//! Set `RUST_LOG=loom_errors=debug` to see delivery logs.

use loom_errors::{
	BeforeNotifyHook, ConfigBuilder, Fault, HookDecision, Notified, Notifier, NotifyOptions,
};
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
#[error("payment provider unavailable")]
struct PaymentError(#[source] std::io::Error);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	tracing_subscriber::fmt()
		.with_env_filter(
			EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("loom_errors=info")),
		)
		.init();

	let config = ConfigBuilder::from_env()?
		.environment("development")
		.app_name("notify-example")
		.revision(env!("CARGO_PKG_VERSION"))
		.filter_keys(["card_token"])
		.before_notify(BeforeNotifyHook::new("skip-healthchecks", |report| {
			if report.request().get("url").and_then(|u| u.as_str()) == Some("/healthz") {
				Ok(HookDecision::Abort)
			} else {
				Ok(HookDecision::Continue)
			}
		}))
		.build();

	if let Err(e) = config.validate() {
		println!("Configuration invalid ({e}); set LOOM_ERRORS_API_KEY");
		return Ok(());
	}

	let notifier = Notifier::new();
	notifier.configure(config)?;
	notifier.install_panic_hook();

	// One scope per unit of work.
	let request = notifier.fork();
	request.set_request(
		json!({"url": "/checkout", "method": "POST", "session": {"cart": 3}})
			.as_object()
			.cloned()
			.unwrap_or_default(),
	);
	request.set_user(
		json!({"id": "user_123", "email": "user@example.com"})
			.as_object()
			.cloned()
			.unwrap_or_default(),
	);

	let error = PaymentError(std::io::Error::from(std::io::ErrorKind::TimedOut));
	let outcome = request
		.notify(
			&Fault::from_error(&error),
			NotifyOptions::new()
				.context("card_token", "tok_visa")
				.context("amount_cents", 1299)
				.tag("checkout"),
		)
		.await;
	println!("Payment error: {outcome:?}");

	// Peer hang-ups are ignored by default.
	let hangup = std::io::Error::from(std::io::ErrorKind::BrokenPipe);
	let outcome = request
		.notify(&Fault::from_error(&hangup), NotifyOptions::new())
		.await;
	assert_eq!(outcome, Notified::Ignored);
	println!("Broken pipe: {outcome:?}");

	let response = request
		.notify_sync(
			&Fault::new("InventoryMismatch", "stock went negative"),
			NotifyOptions::new().fingerprint("inventory"),
		)
		.await;
	match response.and_then(|r| r.id().map(str::to_string)) {
		Some(id) => println!("Inventory mismatch reported as {id}"),
		None => println!("Inventory mismatch was not delivered"),
	}

	let summary = notifier.shutdown().await;
	println!(
		"Shutdown: {} delivered, {} dropped",
		summary.delivered, summary.dropped
	);

	Ok(())
}
