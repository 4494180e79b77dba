// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Turns a [`Fault`] plus merged ambient data into a sanitized [`Report`].

use std::sync::Arc;

use loom_errors_core::{normalize_path, NotifierInfo, Report, SanitizeFilter};
use serde_json::{Map, Value};

use crate::config::Config;
use crate::fault::Fault;

/// Request key dropped when session data is excluded.
pub const SESSION_KEY: &str = "session";

/// Input to [`ReportBuilder::build`] besides the fault itself.
#[derive(Debug, Clone, Default)]
pub struct ReportParts {
	pub context: Map<String, Value>,
	pub user: Map<String, Value>,
	pub request: Map<String, Value>,
	pub fingerprint: Option<String>,
	pub tags: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ReportBuilder {
	config: Arc<Config>,
	sanitizer: SanitizeFilter,
	notifier: NotifierInfo,
}

impl ReportBuilder {
	pub fn new(config: Arc<Config>) -> Self {
		let sanitizer = SanitizeFilter::new(config.filter_keys());
		let notifier = NotifierInfo::sdk()
			.with_app_name(config.app_name().map(str::to_string))
			.with_revision(config.revision().map(str::to_string));
		Self {
			config,
			sanitizer,
			notifier,
		}
	}

	pub fn sanitizer(&self) -> &SanitizeFilter {
		&self.sanitizer
	}

	pub fn build(&self, fault: &Fault, parts: ReportParts) -> Report {
		let mut context = parts.context;
		if !fault.causes().is_empty() {
			context.insert(
				"causes".to_string(),
				Value::Array(fault.causes().iter().cloned().map(Value::String).collect()),
			);
		}
		let mut context = self.sanitizer.filter(&context);
		if self.config.include_environment() {
			context.insert("env".to_string(), Value::Object(self.environment_dump()));
		}

		let user = if self.config.include_user() {
			self.sanitizer.filter(&parts.user)
		} else {
			Map::new()
		};

		let request = if self.config.include_request() {
			let mut request = parts.request;
			if !self.config.include_session() {
				request.remove(SESSION_KEY);
			}
			self.sanitizer.filter(&request)
		} else {
			Map::new()
		};

		Report::new(
			fault.class_name(),
			fault.message(),
			self.config.environment(),
			self.notifier.clone(),
		)
		.with_backtrace(self.backtrace(fault))
		.with_fingerprint(parts.fingerprint)
		.with_tags(parts.tags)
		.with_context(context)
		.with_user(user)
		.with_request(request)
	}

	/// Origin line first, then the captured frames.
	fn backtrace(&self, fault: &Fault) -> Vec<String> {
		let root = self.config.root_path();
		let mut lines = Vec::with_capacity(fault.frames().len() + 1);
		if let Some((file, line)) = fault.origin() {
			lines.push(format!("{}:{line}", normalize_path(file, root)));
		}
		lines.extend(fault.frames().iter().map(|frame| frame.format(root)));
		lines
	}

	fn environment_dump(&self) -> Map<String, Value> {
		let vars: Map<String, Value> = std::env::vars_os()
			.map(|(key, value)| {
				(
					key.to_string_lossy().into_owned(),
					Value::String(value.to_string_lossy().into_owned()),
				)
			})
			.collect();
		self.sanitizer.filter(&vars)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use loom_errors_core::{Frame, FILTERED, MAX_BACKTRACE_LINES};
	use serde_json::json;

	fn map(value: Value) -> Map<String, Value> {
		match value {
			Value::Object(map) => map,
			_ => panic!("expected object"),
		}
	}

	fn builder(config: Config) -> ReportBuilder {
		ReportBuilder::new(Arc::new(config))
	}

	fn fault() -> Fault {
		Fault::new("RuntimeError", "boom")
			.with_origin("/srv/app/src/main.rs", 12)
			.with_frames(vec![
				Frame::from_symbol("/srv/app/src/orders.rs", 40, "app::orders::create")
			])
	}

	#[test]
	fn origin_is_first_backtrace_line() {
		let config = Config::builder().root_path("/srv/app").build();
		let report = builder(config).build(&fault(), ReportParts::default());
		assert_eq!(
			report.backtrace(),
			[
				"[PROJECT_ROOT]/src/main.rs:12".to_string(),
				"[PROJECT_ROOT]/src/orders.rs:40 in app::orders::create".to_string(),
			]
		);
	}

	#[test]
	fn backtrace_is_capped() {
		let frames = (0..MAX_BACKTRACE_LINES * 2)
			.map(|i| Frame::new("src/lib.rs", i as u32, "f"))
			.collect();
		let report = builder(Config::default()).build(
			&fault().with_frames(frames),
			ReportParts::default(),
		);
		assert_eq!(report.backtrace().len(), MAX_BACKTRACE_LINES);
	}

	#[test]
	fn all_maps_are_sanitized() {
		let parts = ReportParts {
			context: map(json!({"order": 1, "api_key": "k"})),
			user: map(json!({"id": 1, "password": "p"})),
			request: map(json!({"url": "/", "headers": {"Authorization": "Bearer x"}})),
			..Default::default()
		};
		let report = builder(Config::default()).build(&fault(), parts);
		assert_eq!(report.context()["api_key"], FILTERED);
		assert_eq!(report.context()["order"], 1);
		assert_eq!(report.user()["password"], FILTERED);
		assert_eq!(report.request()["headers"]["Authorization"], FILTERED);
	}

	#[test]
	fn extra_filter_keys_apply() {
		let config = Config::builder().filter_keys(["order"]).build();
		let parts = ReportParts {
			context: map(json!({"order_id": 1})),
			..Default::default()
		};
		let report = builder(config).build(&fault(), parts);
		assert_eq!(report.context()["order_id"], FILTERED);
	}

	#[test]
	fn inclusion_flags_empty_their_maps() {
		let config = Config::builder()
			.include_user(false)
			.include_request(false)
			.build();
		let parts = ReportParts {
			user: map(json!({"id": 1})),
			request: map(json!({"url": "/"})),
			..Default::default()
		};
		let report = builder(config).build(&fault(), parts);
		assert!(report.user().is_empty());
		assert!(report.request().is_empty());
	}

	#[test]
	fn session_is_stripped_when_excluded() {
		let config = Config::builder().include_session(false).build();
		let parts = ReportParts {
			request: map(json!({"url": "/", "session": {"cart": 3}})),
			..Default::default()
		};
		let report = builder(config).build(&fault(), parts);
		assert!(report.request().get(SESSION_KEY).is_none());
		assert_eq!(report.request()["url"], "/");
	}

	#[test]
	fn environment_dump_is_opt_in() {
		let report = builder(Config::default()).build(&fault(), ReportParts::default());
		assert!(report.context().get("env").is_none());

		let config = Config::builder().include_environment(true).build();
		let report = builder(config).build(&fault(), ReportParts::default());
		assert!(report.context()["env"].is_object());
	}

	#[derive(Debug, thiserror::Error)]
	#[error("could not load order")]
	struct LoadError(#[source] std::io::Error);

	#[test]
	fn causes_land_in_context() {
		let error = LoadError(std::io::Error::from(std::io::ErrorKind::NotFound));
		let report = builder(Config::default())
			.build(&Fault::from_error(&error), ReportParts::default());
		assert_eq!(report.context()["causes"], json!(["entity not found"]));
	}

	#[test]
	fn carries_environment_and_app_metadata() {
		let config = Config::builder()
			.environment("staging")
			.app_name("shop")
			.revision("abc123")
			.build();
		let parts = ReportParts {
			fingerprint: Some("checkout".to_string()),
			tags: vec!["billing".to_string()],
			..Default::default()
		};
		let report = builder(config).build(&fault(), parts);
		assert_eq!(report.environment(), "staging");
		assert_eq!(report.notifier().app_name.as_deref(), Some("shop"));
		assert_eq!(report.notifier().revision.as_deref(), Some("abc123"));
		assert_eq!(report.fingerprint(), Some("checkout"));
		assert_eq!(report.tags(), ["billing".to_string()]);
	}
}
