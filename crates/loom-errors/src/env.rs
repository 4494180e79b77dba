// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Environment variable fallbacks for notifier configuration.
//!
//! The API key also honours the `*_FILE` convention used by Docker secrets
//! and Kubernetes: if `LOOM_ERRORS_API_KEY_FILE` is set, the key is read from
//! that path instead of `LOOM_ERRORS_API_KEY`.

use std::fmt;
use std::fs;
use std::path::PathBuf;

use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

pub const API_KEY_VAR: &str = "LOOM_ERRORS_API_KEY";
pub const ENDPOINT_VAR: &str = "LOOM_ERRORS_ENDPOINT";
pub const ENVIRONMENT_VAR: &str = "LOOM_ERRORS_ENVIRONMENT";
pub const PROXY_VAR: &str = "LOOM_ERRORS_PROXY";
pub const DEBUG_VAR: &str = "LOOM_ERRORS_DEBUG";

/// The redaction placeholder printed instead of the key.
pub const REDACTED: &str = "[REDACTED]";

/// Ingestion API key. Debug/Display are redacted and the memory is zeroed
/// on drop; call [`ApiKey::expose`] to read it.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct ApiKey(String);

impl ApiKey {
	pub fn new(key: impl Into<String>) -> Self {
		Self(key.into())
	}

	pub fn expose(&self) -> &str {
		&self.0
	}

	pub fn is_empty(&self) -> bool {
		self.0.trim().is_empty()
	}
}

impl fmt::Debug for ApiKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("ApiKey").field(&REDACTED).finish()
	}
}

impl fmt::Display for ApiKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(REDACTED)
	}
}

/// Errors that can occur when loading secrets from environment variables.
#[derive(Debug, Error)]
pub enum SecretEnvError {
	/// Failed to read the secret file.
	#[error("failed to read secret file at {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	/// The secret file path was empty.
	#[error("secret file path in {var} is empty")]
	EmptyPath { var: String },
}

/// Load a secret using the `VAR` / `VAR_FILE` convention.
///
/// `{var}_FILE` takes precedence; a single trailing newline is stripped from
/// file contents. Returns `Ok(None)` when neither is set.
pub fn load_secret<F>(lookup: &F, var: &str) -> Result<Option<ApiKey>, SecretEnvError>
where
	F: Fn(&str) -> Option<String>,
{
	let file_var = format!("{var}_FILE");

	if let Some(path_str) = lookup(&file_var) {
		if path_str.is_empty() {
			return Err(SecretEnvError::EmptyPath { var: file_var });
		}

		let path = PathBuf::from(&path_str);
		let content = fs::read_to_string(&path).map_err(|e| SecretEnvError::Io {
			path: path.clone(),
			source: e,
		})?;

		let secret = content.strip_suffix('\n').unwrap_or(&content).to_string();
		return Ok(Some(ApiKey::new(secret)));
	}

	Ok(lookup(var).filter(|v| !v.is_empty()).map(ApiKey::new))
}

/// Non-empty string value of `var`.
pub fn string<F>(lookup: &F, var: &str) -> Option<String>
where
	F: Fn(&str) -> Option<String>,
{
	lookup(var)
		.map(|v| v.trim().to_string())
		.filter(|v| !v.is_empty())
}

/// Boolean value of `var`: `1`, `true`, `yes`, `on` (any case) are true,
/// `0`, `false`, `no`, `off` are false, anything else is unset.
pub fn flag<F>(lookup: &F, var: &str) -> Option<bool>
where
	F: Fn(&str) -> Option<String>,
{
	let value = string(lookup, var)?;
	match value.to_lowercase().as_str() {
		"1" | "true" | "yes" | "on" => Some(true),
		"0" | "false" | "no" | "off" => Some(false),
		_ => None,
	}
}

/// Reads the real process environment.
pub fn process_env(var: &str) -> Option<String> {
	std::env::var(var).ok()
}
