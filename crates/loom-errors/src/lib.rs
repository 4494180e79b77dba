// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error notifier SDK for Rust applications.
//!
//! Captures faults, turns them into sanitized reports and delivers them to
//! the Loom errors ingestion endpoint without blocking or crashing the host.
//!
//! # Quick Start
//!
//! ```ignore
//! use loom_errors::{Config, Fault, Notifier, NotifyOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let notifier = Notifier::new();
//!     notifier.configure(
//!         Config::builder()
//!             .api_key("your_api_key")
//!             .environment("production")
//!             .revision(env!("CARGO_PKG_VERSION"))
//!             .build(),
//!     )?;
//!     notifier.install_panic_hook();
//!
//!     // Per request or job: fork, then attach ambient data.
//!     let scope = notifier.fork();
//!     scope.set_context(serde_json::json!({"order_id": 42}).as_object().cloned().unwrap_or_default());
//!
//!     if let Err(e) = place_order() {
//!         scope
//!             .notify(&Fault::from_error(&e), NotifyOptions::new().tag("checkout"))
//!             .await;
//!     }
//!
//!     notifier.shutdown().await;
//!     Ok(())
//! }
//!
//! fn place_order() -> Result<(), std::io::Error> {
//!     Ok(())
//! }
//! ```
//!
//! # Pipeline
//!
//! `notify` checks the ignore patterns, builds a [`Report`] (sanitizing
//! context, user and request data), runs the before-notify hooks, then
//! either captures the report (test mode), pushes it to the bounded
//! [`DeliveryQueue`] (async sending) or sends it inline.
//!
//! # Environment
//!
//! [`ConfigBuilder::from_env`] reads `LOOM_ERRORS_API_KEY` (or
//! `LOOM_ERRORS_API_KEY_FILE`), `LOOM_ERRORS_ENDPOINT`,
//! `LOOM_ERRORS_ENVIRONMENT`, `LOOM_ERRORS_PROXY` and `LOOM_ERRORS_DEBUG`.

pub mod builder;
pub mod config;
pub mod env;
pub mod error;
pub mod fault;
pub mod hooks;
pub mod notifier;
mod panic_hook;
pub mod queue;
pub mod retry;
pub mod scope;
mod stack;
pub mod transport;

pub use builder::{ReportBuilder, ReportParts};
pub use config::{Config, ConfigBuilder};
pub use env::ApiKey;
pub use error::{ConfigError, ErrorsSdkError, Result, TransportError};
pub use fault::Fault;
pub use hooks::{BeforeNotifyHook, HookChainOutcome, HookDecision, HookError, HookFailure};
pub use notifier::{Notified, Notifier};
pub use queue::{DeliveryQueue, FlushSummary, QueueConfig};
pub use retry::RetryConfig;
pub use scope::{NotifyOptions, Scope};
pub use transport::{HttpTransport, IngestResponse, Transport};

pub use loom_errors_core::{
	displayable, opaque, serializable, FaultIdentity, Frame, IgnoreFilter, NotifierInfo, Report,
	SanitizeFilter, DEFAULT_FILTER_KEYS, DEFAULT_IGNORE_PATTERNS,
};
