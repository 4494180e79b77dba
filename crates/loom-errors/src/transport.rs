// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Single-attempt report delivery over HTTP.

use std::fs;

use async_trait::async_trait;
use loom_errors_core::{user_agent, Report};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Certificate, Client, Proxy, StatusCode};
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::env::ApiKey;
use crate::error::{ErrorsSdkError, Result, TransportError};

/// Header carrying the ingestion API key.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Decoded body of a successful (201) ingestion response.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IngestResponse {
	pub body: Map<String, Value>,
}

impl IngestResponse {
	/// Server-assigned id, when the response carries one.
	pub fn id(&self) -> Option<&str> {
		self.body.get("id").and_then(Value::as_str)
	}
}

/// Delivers one report per call. Implementations never fail outward: every
/// problem is logged and surfaces as `None`.
#[async_trait]
pub trait Transport: Send + Sync {
	async fn send(&self, report: &Report) -> Option<IngestResponse>;
}

/// [`Transport`] posting JSON to `{endpoint}/ingest/v1/errors`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
	client: Client,
	url: String,
	api_key: Option<ApiKey>,
	debug: bool,
}

impl HttpTransport {
	pub fn new(config: &Config) -> Result<Self> {
		let mut builder = Client::builder()
			.user_agent(user_agent())
			.timeout(config.timeout())
			.connect_timeout(config.connect_timeout())
			.danger_accept_invalid_certs(!config.tls_verify());

		if let Some(proxy) = config.proxy() {
			builder = builder.proxy(Proxy::all(proxy)?);
		}

		if let Some(path) = config.tls_ca_path() {
			let pem = fs::read(path).map_err(|e| ErrorsSdkError::CaCertificate {
				path: path.to_path_buf(),
				message: e.to_string(),
			})?;
			let cert = Certificate::from_pem(&pem).map_err(|e| ErrorsSdkError::CaCertificate {
				path: path.to_path_buf(),
				message: e.to_string(),
			})?;
			builder = builder.add_root_certificate(cert);
		}

		Ok(Self {
			client: builder.build()?,
			url: config.ingest_url(),
			api_key: config.api_key().cloned(),
			debug: config.debug(),
		})
	}

	pub fn url(&self) -> &str {
		&self.url
	}

	/// One POST, classified. 201 with a JSON object body is the only success.
	pub async fn try_send(
		&self,
		report: &Report,
	) -> std::result::Result<IngestResponse, TransportError> {
		let body = report.to_json()?;
		let size = body.len();

		let mut request = self
			.client
			.post(&self.url)
			.header(CONTENT_TYPE, "application/json")
			.header(CONTENT_LENGTH, size);
		if let Some(key) = &self.api_key {
			request = request.header(API_KEY_HEADER, key.expose());
		}

		if self.debug {
			info!(url = %self.url, class = %report.class(), bytes = size, "sending error report");
		} else {
			debug!(url = %self.url, class = %report.class(), "sending error report");
		}

		let response = request.body(body).send().await?;
		let status = response.status();

		if status == StatusCode::CREATED {
			let text = response.text().await?;
			return match serde_json::from_str::<Value>(&text) {
				Ok(Value::Object(body)) => Ok(IngestResponse { body }),
				_ => Err(TransportError::UnexpectedBody(text)),
			};
		}

		let retry_after = response
			.headers()
			.get(RETRY_AFTER)
			.and_then(|v| v.to_str().ok())
			.and_then(|s| s.trim().parse().ok());
		let text = response.text().await.unwrap_or_default();
		Err(TransportError::from_status(status.as_u16(), text, retry_after))
	}
}

#[async_trait]
impl Transport for HttpTransport {
	async fn send(&self, report: &Report) -> Option<IngestResponse> {
		match self.try_send(report).await {
			Ok(response) => {
				if self.debug {
					info!(class = %report.class(), id = ?response.id(), "error report delivered");
				} else {
					debug!(class = %report.class(), id = ?response.id(), "error report delivered");
				}
				Some(response)
			}
			Err(e) => {
				log_failure(report, &e);
				None
			}
		}
	}
}

fn log_failure(report: &Report, e: &TransportError) {
	match e {
		TransportError::InvalidCredentials => {
			error!(class = %report.class(), "error report rejected: invalid credentials");
		}
		TransportError::Validation { body } => {
			error!(class = %report.class(), body = %body, "error report rejected: validation error");
		}
		TransportError::RateLimited { retry_after_secs } => {
			warn!(class = %report.class(), retry_after_secs = ?retry_after_secs, "error report rate limited");
		}
		TransportError::Server { status, body } => {
			warn!(class = %report.class(), status = status, body = %body, "error report failed: server error");
		}
		TransportError::Encoding(err) => {
			error!(class = %report.class(), error = %err, "failed to encode error report");
		}
		other => {
			warn!(class = %report.class(), error = %other, "error report delivery failed");
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn response_id() {
		let Value::Object(body) = json!({"id": "err_1", "status": "accepted"}) else {
			unreachable!()
		};
		assert_eq!(IngestResponse { body }.id(), Some("err_1"));
		assert_eq!(IngestResponse::default().id(), None);
	}

	#[test]
	fn builds_from_config() {
		let config = Config::builder()
			.api_key("k")
			.endpoint("https://errors.example/")
			.proxy("http://proxy.example:3128")
			.tls_verify(false)
			.build();
		let transport = HttpTransport::new(&config).unwrap();
		assert_eq!(transport.url(), "https://errors.example/ingest/v1/errors");
	}

	#[test]
	fn unreadable_ca_bundle_is_an_error() {
		let config = Config::builder()
			.tls_ca_path("/nonexistent/loom/ca.pem")
			.build();
		assert!(matches!(
			HttpTransport::new(&config),
			Err(ErrorsSdkError::CaCertificate { .. })
		));
	}
}
