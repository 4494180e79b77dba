// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The report: one captured fault, ready for delivery.
//!
//! A [`Report`] is immutable once built. The `with_*` methods consume the
//! report and return a new one, which is how before-notify hooks substitute a
//! modified copy without shared mutation.
//!
//! Wire format (`POST /ingest/v1/errors`):
//!
//! ```json
//! {
//!   "error": { "class", "message", "backtrace": [...], "occurred_at",
//!              "fingerprint"?, "tags"?: [...] },
//!   "context": { "environment", ...extra keys },
//!   "notifier": { "name", "version", "language", "language_version",
//!                 "app_name"?, "revision"? },
//!   "request"?: { ... },
//!   "user"?: { ... }
//! }
//! ```

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::sanitize::truncate;
use crate::{rust_version, SDK_LANGUAGE, SDK_NAME, SDK_VERSION};

/// Longest message (in characters) kept before truncation.
pub const MAX_MESSAGE_LENGTH: usize = 1024;
/// Most backtrace lines a report carries, origin line included.
pub const MAX_BACKTRACE_LINES: usize = 50;
/// Appended to truncated strings.
pub const ELLIPSIS: &str = "...";

/// Identity of the SDK (and optionally the host app) that produced a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotifierInfo {
	pub name: String,
	pub version: String,
	pub language: String,
	pub language_version: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub app_name: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub revision: Option<String>,
}

impl NotifierInfo {
	/// The fixed SDK identity.
	pub fn sdk() -> Self {
		Self {
			name: SDK_NAME.to_string(),
			version: SDK_VERSION.to_string(),
			language: SDK_LANGUAGE.to_string(),
			language_version: rust_version().to_string(),
			app_name: None,
			revision: None,
		}
	}

	pub fn with_app_name(mut self, app_name: Option<String>) -> Self {
		self.app_name = app_name;
		self
	}

	pub fn with_revision(mut self, revision: Option<String>) -> Self {
		self.revision = revision;
		self
	}
}

impl Default for NotifierInfo {
	fn default() -> Self {
		Self::sdk()
	}
}

/// Immutable record of a single captured fault.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
	class: String,
	message: String,
	backtrace: Vec<String>,
	fingerprint: Option<String>,
	tags: Vec<String>,
	context: Map<String, Value>,
	request: Map<String, Value>,
	user: Map<String, Value>,
	environment: String,
	occurred_at: DateTime<Utc>,
	notifier: NotifierInfo,
}

impl Report {
	/// Starts a report stamped with the current UTC time. The message is
	/// capped at [`MAX_MESSAGE_LENGTH`] characters.
	pub fn new(
		class: impl Into<String>,
		message: impl AsRef<str>,
		environment: impl Into<String>,
		notifier: NotifierInfo,
	) -> Self {
		Self {
			class: class.into(),
			message: truncate(message.as_ref(), MAX_MESSAGE_LENGTH),
			backtrace: Vec::new(),
			fingerprint: None,
			tags: Vec::new(),
			context: Map::new(),
			request: Map::new(),
			user: Map::new(),
			environment: environment.into(),
			occurred_at: Utc::now(),
			notifier,
		}
	}

	/// Replaces the backtrace, keeping at most [`MAX_BACKTRACE_LINES`] lines.
	pub fn with_backtrace(mut self, mut lines: Vec<String>) -> Self {
		lines.truncate(MAX_BACKTRACE_LINES);
		self.backtrace = lines;
		self
	}

	pub fn with_fingerprint(mut self, fingerprint: Option<String>) -> Self {
		self.fingerprint = fingerprint.filter(|f| !f.is_empty());
		self
	}

	pub fn with_tags(mut self, tags: Vec<String>) -> Self {
		self.tags = tags;
		self
	}

	/// Appends a tag unless already present.
	pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
		let tag = tag.into();
		if !self.tags.contains(&tag) {
			self.tags.push(tag);
		}
		self
	}

	pub fn with_context(mut self, context: Map<String, Value>) -> Self {
		self.context = context;
		self
	}

	pub fn with_request(mut self, request: Map<String, Value>) -> Self {
		self.request = request;
		self
	}

	pub fn with_user(mut self, user: Map<String, Value>) -> Self {
		self.user = user;
		self
	}

	#[cfg(test)]
	pub(crate) fn with_occurred_at(mut self, occurred_at: DateTime<Utc>) -> Self {
		self.occurred_at = occurred_at;
		self
	}

	/// Returns `replacement` stamped with this report's build time, for
	/// hooks that substitute a report. The timestamp never moves after build.
	pub fn substitute(&self, mut replacement: Report) -> Report {
		replacement.occurred_at = self.occurred_at;
		replacement
	}

	pub fn class(&self) -> &str {
		&self.class
	}

	pub fn message(&self) -> &str {
		&self.message
	}

	pub fn backtrace(&self) -> &[String] {
		&self.backtrace
	}

	pub fn fingerprint(&self) -> Option<&str> {
		self.fingerprint.as_deref()
	}

	pub fn tags(&self) -> &[String] {
		&self.tags
	}

	pub fn context(&self) -> &Map<String, Value> {
		&self.context
	}

	pub fn request(&self) -> &Map<String, Value> {
		&self.request
	}

	pub fn user(&self) -> &Map<String, Value> {
		&self.user
	}

	pub fn environment(&self) -> &str {
		&self.environment
	}

	pub fn occurred_at(&self) -> DateTime<Utc> {
		self.occurred_at
	}

	pub fn notifier(&self) -> &NotifierInfo {
		&self.notifier
	}

	/// The serializable wire payload for this report.
	pub fn to_payload(&self) -> Payload<'_> {
		let mut context = Map::with_capacity(self.context.len() + 1);
		context.insert(
			"environment".to_string(),
			Value::String(self.environment.clone()),
		);
		for (key, value) in &self.context {
			if key != "environment" {
				context.insert(key.clone(), value.clone());
			}
		}

		Payload {
			error: ErrorPayload {
				class: &self.class,
				message: &self.message,
				backtrace: &self.backtrace,
				occurred_at: self
					.occurred_at
					.to_rfc3339_opts(SecondsFormat::Millis, true),
				fingerprint: self.fingerprint.as_deref(),
				tags: &self.tags,
			},
			context,
			notifier: &self.notifier,
			request: &self.request,
			user: &self.user,
		}
	}

	/// JSON body bytes for delivery.
	pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
		serde_json::to_vec(&self.to_payload())
	}
}

/// Top-level wire payload.
#[derive(Debug, Serialize)]
pub struct Payload<'a> {
	pub error: ErrorPayload<'a>,
	pub context: Map<String, Value>,
	pub notifier: &'a NotifierInfo,
	#[serde(skip_serializing_if = "Map::is_empty")]
	pub request: &'a Map<String, Value>,
	#[serde(skip_serializing_if = "Map::is_empty")]
	pub user: &'a Map<String, Value>,
}

/// The `error` object of the wire payload.
#[derive(Debug, Serialize)]
pub struct ErrorPayload<'a> {
	pub class: &'a str,
	pub message: &'a str,
	pub backtrace: &'a [String],
	pub occurred_at: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub fingerprint: Option<&'a str>,
	#[serde(skip_serializing_if = "<[String]>::is_empty")]
	pub tags: &'a [String],
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn report() -> Report {
		Report::new("RuntimeError", "boom", "staging", NotifierInfo::sdk())
	}

	fn payload(report: &Report) -> Value {
		serde_json::from_slice(&report.to_json().unwrap()).unwrap()
	}

	#[test]
	fn payload_has_error_context_and_notifier() {
		let mut context = Map::new();
		context.insert("order_id".to_string(), json!(123));
		let report = report()
			.with_backtrace(vec!["src/main.rs:3".to_string()])
			.with_context(context);

		let body = payload(&report);
		assert_eq!(body["error"]["class"], "RuntimeError");
		assert_eq!(body["error"]["message"], "boom");
		assert_eq!(body["error"]["backtrace"], json!(["src/main.rs:3"]));
		assert_eq!(body["context"]["order_id"], 123);
		assert_eq!(body["context"]["environment"], "staging");
		assert_eq!(body["notifier"]["name"], SDK_NAME);
		assert_eq!(body["notifier"]["language"], "rust");
	}

	#[test]
	fn optional_sections_are_omitted_when_empty() {
		let body = payload(&report());
		assert!(body.get("request").is_none());
		assert!(body.get("user").is_none());
		assert!(body["error"].get("fingerprint").is_none());
		assert!(body["error"].get("tags").is_none());
		assert!(body["notifier"].get("app_name").is_none());
	}

	#[test]
	fn optional_sections_are_present_when_set() {
		let mut user = Map::new();
		user.insert("id".to_string(), json!("u_1"));
		let report = report()
			.with_fingerprint(Some("checkout".to_string()))
			.with_tags(vec!["billing".to_string()])
			.with_user(user);

		let body = payload(&report);
		assert_eq!(body["error"]["fingerprint"], "checkout");
		assert_eq!(body["error"]["tags"], json!(["billing"]));
		assert_eq!(body["user"]["id"], "u_1");
	}

	#[test]
	fn configured_environment_wins_over_context_key() {
		let mut context = Map::new();
		context.insert("environment".to_string(), json!("spoofed"));
		let body = payload(&report().with_context(context));
		assert_eq!(body["context"]["environment"], "staging");
	}

	#[test]
	fn message_is_capped() {
		let long = "m".repeat(MAX_MESSAGE_LENGTH * 2);
		let report = Report::new("E", &long, "test", NotifierInfo::sdk());
		assert_eq!(
			report.message().chars().count(),
			MAX_MESSAGE_LENGTH + ELLIPSIS.len()
		);
		assert!(report.message().ends_with(ELLIPSIS));
	}

	#[test]
	fn backtrace_is_capped() {
		let lines = (0..MAX_BACKTRACE_LINES + 25)
			.map(|i| format!("src/lib.rs:{i}"))
			.collect();
		let report = report().with_backtrace(lines);
		assert_eq!(report.backtrace().len(), MAX_BACKTRACE_LINES);
		assert_eq!(report.backtrace()[0], "src/lib.rs:0");
	}

	#[test]
	fn occurred_at_is_utc_iso8601() {
		let at = DateTime::parse_from_rfc3339("2025-03-01T12:30:45.250Z")
			.unwrap()
			.with_timezone(&Utc);
		let body = payload(&report().with_occurred_at(at));
		assert_eq!(body["error"]["occurred_at"], "2025-03-01T12:30:45.250Z");
	}

	#[test]
	fn substitute_keeps_build_time() {
		let at = DateTime::parse_from_rfc3339("2025-03-01T12:30:45Z")
			.unwrap()
			.with_timezone(&Utc);
		let original = report().with_occurred_at(at);
		let replaced = original.substitute(Report::new("Other", "m", "test", NotifierInfo::sdk()));
		assert_eq!(replaced.class(), "Other");
		assert_eq!(replaced.occurred_at(), at);
	}

	#[test]
	fn with_tag_deduplicates() {
		let report = report().with_tag("a").with_tag("a").with_tag("b");
		assert_eq!(report.tags(), ["a".to_string(), "b".to_string()]);
	}

	#[test]
	fn empty_fingerprint_is_dropped() {
		assert!(report().with_fingerprint(Some(String::new())).fingerprint().is_none());
	}

	#[test]
	fn notifier_carries_app_metadata() {
		let info = NotifierInfo::sdk()
			.with_app_name(Some("shop".to_string()))
			.with_revision(Some("abc123".to_string()));
		let body = payload(&Report::new("E", "m", "test", info));
		assert_eq!(body["notifier"]["app_name"], "shop");
		assert_eq!(body["notifier"]["revision"], "abc123");
		assert_eq!(body["notifier"]["version"], SDK_VERSION);
	}
}
