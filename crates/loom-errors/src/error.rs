// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the error notifier SDK.

use std::path::PathBuf;

use thiserror::Error;

use crate::env::SecretEnvError;

/// Result type alias for SDK operations.
pub type Result<T> = std::result::Result<T, ErrorsSdkError>;

/// Errors raised while setting the notifier up.
///
/// Nothing on the capture path (`notify`, `flush`, `shutdown`) returns these;
/// delivery problems are logged instead.
#[derive(Debug, Error)]
pub enum ErrorsSdkError {
	/// Failed to build the HTTP client.
	#[error("failed to build HTTP client: {0}")]
	TransportBuild(#[from] reqwest::Error),

	/// The configured CA bundle could not be read or parsed.
	#[error("failed to load CA certificate from {path}: {message}")]
	CaCertificate { path: PathBuf, message: String },

	/// An ignore pattern could not be compiled.
	#[error(transparent)]
	Core(#[from] loom_errors_core::CoreError),

	/// Loading a secret from the environment failed.
	#[error(transparent)]
	SecretEnv(#[from] SecretEnvError),
}

/// Problems reported by [`Config::validate`](crate::Config::validate).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
	#[error("API key is required")]
	MissingApiKey,

	#[error("invalid endpoint URL {0:?}")]
	InvalidEndpoint(String),
}

/// Why a single delivery attempt failed.
#[derive(Debug, Error)]
pub enum TransportError {
	#[error("invalid credentials")]
	InvalidCredentials,

	#[error("validation error: {body}")]
	Validation { body: String },

	#[error("rate limited, retry after {retry_after_secs:?} seconds")]
	RateLimited { retry_after_secs: Option<u64> },

	#[error("server error (status {status}): {body}")]
	Server { status: u16, body: String },

	#[error("HTTP error (status {status}): {body}")]
	Http { status: u16, body: String },

	#[error("unexpected response body: {0}")]
	UnexpectedBody(String),

	#[error("HTTP request failed: {0}")]
	Request(#[from] reqwest::Error),

	#[error("failed to encode payload: {0}")]
	Encoding(#[from] serde_json::Error),
}

impl TransportError {
	/// Status-based classification of a non-201 response.
	pub fn from_status(status: u16, body: String, retry_after_secs: Option<u64>) -> Self {
		match status {
			401 => TransportError::InvalidCredentials,
			422 => TransportError::Validation { body },
			429 => TransportError::RateLimited { retry_after_secs },
			s if s >= 500 => TransportError::Server { status: s, body },
			s => TransportError::Http { status: s, body },
		}
	}
}
