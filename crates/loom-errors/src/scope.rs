// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Ambient per-lifecycle state and per-call notify options.

use std::fmt::Display;

use loom_errors_core::{displayable, serializable};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::builder::ReportParts;

/// Context, user and request data accumulated over one unit of work
/// (a request, a job). Each forked [`Notifier`](crate::Notifier) owns one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scope {
	context: Map<String, Value>,
	user: Map<String, Value>,
	request: Map<String, Value>,
}

impl Scope {
	pub fn new() -> Self {
		Self::default()
	}

	/// Merges `context` into the existing context, overwriting on conflict.
	pub fn set_context(&mut self, context: Map<String, Value>) {
		self.context.extend(context);
	}

	pub fn set_user(&mut self, user: Map<String, Value>) {
		self.user = user;
	}

	pub fn set_request(&mut self, request: Map<String, Value>) {
		self.request = request;
	}

	pub fn context(&self) -> &Map<String, Value> {
		&self.context
	}

	pub fn user(&self) -> &Map<String, Value> {
		&self.user
	}

	pub fn request(&self) -> &Map<String, Value> {
		&self.request
	}

	pub fn clear(&mut self) {
		self.context.clear();
		self.user.clear();
		self.request.clear();
	}

	/// Combines ambient state with per-call options. Call-time context and
	/// request keys win on conflict; a call-time user replaces the ambient
	/// user entirely.
	pub fn merge(&self, options: NotifyOptions) -> ReportParts {
		let mut context = self.context.clone();
		context.extend(options.context);

		let user = options.user.unwrap_or_else(|| self.user.clone());

		let mut request = self.request.clone();
		request.extend(options.request);

		ReportParts {
			context,
			user,
			request,
			fingerprint: options.fingerprint,
			tags: options.tags,
		}
	}
}

/// Per-call additions to a notify.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotifyOptions {
	pub context: Map<String, Value>,
	pub user: Option<Map<String, Value>>,
	pub request: Map<String, Value>,
	pub fingerprint: Option<String>,
	pub tags: Vec<String>,
}

impl NotifyOptions {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.context.insert(key.into(), value.into());
		self
	}

	/// Adds a context entry from any serializable value. Values that fail
	/// to serialize become an `[OBJECT: TypeName]` tag.
	pub fn context_serialize<T>(self, key: impl Into<String>, value: &T) -> Self
	where
		T: Serialize + ?Sized,
	{
		self.context(key, serializable(value))
	}

	/// Adds a context entry from a value's string form, length-truncated.
	pub fn context_display<T>(self, key: impl Into<String>, value: &T) -> Self
	where
		T: Display + ?Sized,
	{
		self.context(key, displayable(value))
	}

	pub fn user(mut self, user: Map<String, Value>) -> Self {
		self.user = Some(user);
		self
	}

	pub fn request(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.request.insert(key.into(), value.into());
		self
	}

	/// Groups reports under a caller-chosen key instead of the server's
	/// default grouping.
	pub fn fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
		self.fingerprint = Some(fingerprint.into());
		self
	}

	pub fn tag(mut self, tag: impl Into<String>) -> Self {
		let tag = tag.into();
		if !self.tags.contains(&tag) {
			self.tags.push(tag);
		}
		self
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn map(value: Value) -> Map<String, Value> {
		match value {
			Value::Object(map) => map,
			_ => panic!("expected object"),
		}
	}

	#[test]
	fn set_context_merges() {
		let mut scope = Scope::new();
		scope.set_context(map(json!({"a": 1, "b": 1})));
		scope.set_context(map(json!({"b": 2})));
		assert_eq!(Value::Object(scope.context().clone()), json!({"a": 1, "b": 2}));
	}

	#[test]
	fn clear_resets_everything() {
		let mut scope = Scope::new();
		scope.set_context(map(json!({"a": 1})));
		scope.set_user(map(json!({"id": 1})));
		scope.set_request(map(json!({"url": "/"})));
		scope.clear();
		assert_eq!(scope, Scope::new());
	}

	#[test]
	fn call_time_context_overrides_ambient() {
		let mut scope = Scope::new();
		scope.set_context(map(json!({"order": 1, "shop": "a"})));
		let options = NotifyOptions::new().context("order", 2);

		let parts = scope.merge(options);
		assert_eq!(Value::Object(parts.context), json!({"order": 2, "shop": "a"}));
	}

	#[test]
	fn call_time_user_replaces_ambient_wholesale() {
		let mut scope = Scope::new();
		scope.set_user(map(json!({"id": 1, "email": "a@example.com"})));

		let parts = scope.merge(NotifyOptions::new());
		assert_eq!(parts.user.len(), 2);

		let parts = scope.merge(NotifyOptions::new().user(map(json!({"id": 2}))));
		assert_eq!(Value::Object(parts.user), json!({"id": 2}));
	}

	#[test]
	fn request_merges_key_wise() {
		let mut scope = Scope::new();
		scope.set_request(map(json!({"url": "/a", "method": "GET"})));
		let options = NotifyOptions::new().request("url", "/b");

		let parts = scope.merge(options);
		assert_eq!(Value::Object(parts.request), json!({"url": "/b", "method": "GET"}));
	}

	#[test]
	fn fingerprint_and_tags_pass_through() {
		let parts = Scope::new().merge(NotifyOptions::new().fingerprint("checkout").tag("billing"));
		assert_eq!(parts.fingerprint.as_deref(), Some("checkout"));
		assert_eq!(parts.tags, vec!["billing".to_string()]);
	}

	#[test]
	fn context_accepts_serializable_and_displayable_values() {
		#[derive(serde::Serialize)]
		struct Order {
			id: u32,
			total_cents: u64,
		}

		struct NotData;
		impl Serialize for NotData {
			fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
				Err(serde::ser::Error::custom("not data"))
			}
		}

		let addr: std::net::IpAddr = "10.0.0.1".parse().unwrap();
		let options = NotifyOptions::new()
			.context_serialize("order", &Order {
				id: 7,
				total_cents: 1299,
			})
			.context_serialize("conn", &NotData)
			.context_display("peer", &addr);

		let parts = Scope::new().merge(options);
		assert_eq!(
			Value::Object(parts.context),
			json!({
				"order": {"id": 7, "total_cents": 1299},
				"conn": "[OBJECT: NotData]",
				"peer": "10.0.0.1"
			})
		);
	}

	#[test]
	fn tags_are_deduplicated() {
		let options = NotifyOptions::new().tag("a").tag("a").tag("b");
		assert_eq!(options.tags, vec!["a".to_string(), "b".to_string()]);
	}
}
