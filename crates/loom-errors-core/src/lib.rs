// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for the Loom error notifier.
//!
//! This crate holds the I/O-free half of the notifier and is shared by the
//! `loom-errors` SDK and its tests:
//!
//! - [`Report`]: the immutable, sanitized record of one captured fault and
//!   its JSON wire payload
//! - [`SanitizeFilter`]: depth-bounded recursive redaction of key/value data
//! - [`IgnoreFilter`]: pre-compiled type-name and glob ignore rules
//! - [`FaultIdentity`] and [`Frame`]: what the filters and the report need to
//!   know about a fault

pub mod error;
pub mod frame;
pub mod identity;
pub mod ignore;
pub mod report;
pub mod sanitize;

pub use error::{CoreError, Result};
pub use frame::{normalize_path, Frame, PROJECT_ROOT_PLACEHOLDER};
pub use identity::FaultIdentity;
pub use ignore::{IgnoreFilter, DEFAULT_IGNORE_PATTERNS};
pub use report::{
	NotifierInfo, Report, ELLIPSIS, MAX_BACKTRACE_LINES, MAX_MESSAGE_LENGTH,
};
pub use sanitize::{
	displayable, opaque, serializable, SanitizeFilter, DEFAULT_FILTER_KEYS, DEPTH_MARKER,
	FILTERED, MAX_DEPTH, MAX_STRING_LENGTH,
};

shadow_rs::shadow!(build);

/// SDK name reported in the notifier metadata and the User-Agent.
pub const SDK_NAME: &str = "loom-errors-rust";
/// SDK version reported in the notifier metadata and the User-Agent.
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");
/// Language reported in the notifier metadata.
pub const SDK_LANGUAGE: &str = "rust";

/// Compiler version the SDK was built with, e.g. `rustc 1.82.0 (f6e511eec 2024-10-15)`.
pub fn rust_version() -> &'static str {
	build::RUST_VERSION
}

/// User-Agent sent with every delivery: `{sdk-name}/{version}`.
pub fn user_agent() -> String {
	format!("{SDK_NAME}/{SDK_VERSION}")
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn user_agent_has_name_and_version() {
		let ua = user_agent();
		let parts: Vec<&str> = ua.split('/').collect();
		assert_eq!(parts, vec![SDK_NAME, SDK_VERSION]);
	}

	#[test]
	fn rust_version_is_present() {
		assert!(!rust_version().is_empty());
	}
}
