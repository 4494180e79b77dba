// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the notifier core.

use thiserror::Error;

/// Errors raised while preparing reports or compiling filters.
#[derive(Debug, Error)]
pub enum CoreError {
	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),

	#[error("invalid ignore pattern {pattern:?}: {source}")]
	InvalidPattern {
		pattern: String,
		#[source]
		source: regex::Error,
	},
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
