// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Notifier configuration.
//!
//! A [`Config`] is assembled once with [`ConfigBuilder`] and then shared
//! read-only (`Arc<Config>`). Filter keys and ignore patterns are the fixed
//! defaults merged with any extras given to the builder; they cannot change
//! after [`ConfigBuilder::build`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use loom_errors_core::{DEFAULT_FILTER_KEYS, DEFAULT_IGNORE_PATTERNS};

use crate::env::{self, ApiKey};
use crate::error::{ConfigError, Result};
use crate::hooks::BeforeNotifyHook;
use crate::retry::RetryConfig;

/// Default ingestion endpoint base URL.
pub const DEFAULT_ENDPOINT: &str = "https://errors.loom.dev";
/// Default environment label.
pub const DEFAULT_ENVIRONMENT: &str = "production";
/// Default bound on queued reports awaiting delivery.
pub const DEFAULT_MAX_QUEUE_SIZE: usize = 100;

/// Immutable notifier configuration.
#[derive(Debug, Clone)]
pub struct Config {
	api_key: Option<ApiKey>,
	endpoint: String,
	environment: String,
	enabled: bool,
	async_send: bool,
	max_queue_size: usize,
	timeout: Duration,
	connect_timeout: Duration,
	proxy: Option<String>,
	tls_verify: bool,
	tls_ca_path: Option<PathBuf>,
	include_request: bool,
	include_session: bool,
	include_environment: bool,
	include_user: bool,
	app_name: Option<String>,
	revision: Option<String>,
	root_path: Option<String>,
	filter_keys: Vec<String>,
	ignore_patterns: Vec<String>,
	before_notify: Vec<BeforeNotifyHook>,
	debug: bool,
	flush_interval: Duration,
	shutdown_grace: Duration,
	retry: RetryConfig,
}

impl Config {
	pub fn builder() -> ConfigBuilder {
		ConfigBuilder::new()
	}

	/// Explicit validation query. Configuring a notifier never fails on these;
	/// the host decides what an invalid configuration means.
	pub fn validate(&self) -> std::result::Result<(), ConfigError> {
		match &self.api_key {
			Some(key) if !key.is_empty() => {}
			_ => return Err(ConfigError::MissingApiKey),
		}

		match reqwest::Url::parse(&self.endpoint) {
			Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
			_ => Err(ConfigError::InvalidEndpoint(self.endpoint.clone())),
		}
	}

	pub fn is_valid(&self) -> bool {
		self.validate().is_ok()
	}

	pub fn api_key(&self) -> Option<&ApiKey> {
		self.api_key.as_ref()
	}

	pub fn endpoint(&self) -> &str {
		&self.endpoint
	}

	/// `{endpoint}/ingest/v1/errors`
	pub fn ingest_url(&self) -> String {
		format!("{}/ingest/v1/errors", self.endpoint.trim_end_matches('/'))
	}

	pub fn environment(&self) -> &str {
		&self.environment
	}

	pub fn enabled(&self) -> bool {
		self.enabled
	}

	pub fn async_send(&self) -> bool {
		self.async_send
	}

	pub fn max_queue_size(&self) -> usize {
		self.max_queue_size
	}

	pub fn timeout(&self) -> Duration {
		self.timeout
	}

	pub fn connect_timeout(&self) -> Duration {
		self.connect_timeout
	}

	pub fn proxy(&self) -> Option<&str> {
		self.proxy.as_deref()
	}

	pub fn tls_verify(&self) -> bool {
		self.tls_verify
	}

	pub fn tls_ca_path(&self) -> Option<&Path> {
		self.tls_ca_path.as_deref()
	}

	pub fn include_request(&self) -> bool {
		self.include_request
	}

	pub fn include_session(&self) -> bool {
		self.include_session
	}

	pub fn include_environment(&self) -> bool {
		self.include_environment
	}

	pub fn include_user(&self) -> bool {
		self.include_user
	}

	pub fn app_name(&self) -> Option<&str> {
		self.app_name.as_deref()
	}

	pub fn revision(&self) -> Option<&str> {
		self.revision.as_deref()
	}

	pub fn root_path(&self) -> Option<&str> {
		self.root_path.as_deref()
	}

	pub fn filter_keys(&self) -> &[String] {
		&self.filter_keys
	}

	pub fn ignore_patterns(&self) -> &[String] {
		&self.ignore_patterns
	}

	pub fn before_notify(&self) -> &[BeforeNotifyHook] {
		&self.before_notify
	}

	pub fn debug(&self) -> bool {
		self.debug
	}

	pub fn flush_interval(&self) -> Duration {
		self.flush_interval
	}

	pub fn shutdown_grace(&self) -> Duration {
		self.shutdown_grace
	}

	pub fn retry(&self) -> &RetryConfig {
		&self.retry
	}
}

impl Default for Config {
	fn default() -> Self {
		ConfigBuilder::new().build()
	}
}

/// Builder for [`Config`].
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
	api_key: Option<ApiKey>,
	endpoint: Option<String>,
	environment: Option<String>,
	enabled: bool,
	async_send: bool,
	max_queue_size: usize,
	timeout: Duration,
	connect_timeout: Duration,
	proxy: Option<String>,
	tls_verify: bool,
	tls_ca_path: Option<PathBuf>,
	include_request: bool,
	include_session: bool,
	include_environment: bool,
	include_user: bool,
	app_name: Option<String>,
	revision: Option<String>,
	root_path: Option<String>,
	extra_filter_keys: Vec<String>,
	extra_ignore_patterns: Vec<String>,
	default_ignore_patterns: bool,
	before_notify: Vec<BeforeNotifyHook>,
	debug: bool,
	flush_interval: Duration,
	shutdown_grace: Duration,
	retry: RetryConfig,
}

impl ConfigBuilder {
	/// Creates a new builder with default settings.
	pub fn new() -> Self {
		Self {
			api_key: None,
			endpoint: None,
			environment: None,
			enabled: true,
			async_send: true,
			max_queue_size: DEFAULT_MAX_QUEUE_SIZE,
			timeout: Duration::from_secs(10),
			connect_timeout: Duration::from_secs(5),
			proxy: None,
			tls_verify: true,
			tls_ca_path: None,
			include_request: true,
			include_session: true,
			include_environment: false,
			include_user: true,
			app_name: None,
			revision: None,
			root_path: None,
			extra_filter_keys: Vec::new(),
			extra_ignore_patterns: Vec::new(),
			default_ignore_patterns: true,
			before_notify: Vec::new(),
			debug: false,
			flush_interval: Duration::from_secs(5),
			shutdown_grace: Duration::from_secs(10),
			retry: RetryConfig::default(),
		}
	}

	/// Seeds the builder from `LOOM_ERRORS_*` environment variables. Setters
	/// called afterwards override these values.
	pub fn from_env() -> Result<Self> {
		Self::from_lookup(env::process_env)
	}

	/// Like [`ConfigBuilder::from_env`] with a custom variable source.
	pub fn from_lookup<F>(lookup: F) -> Result<Self>
	where
		F: Fn(&str) -> Option<String>,
	{
		let mut builder = Self::new();
		builder.api_key = env::load_secret(&lookup, env::API_KEY_VAR)?;
		builder.endpoint = env::string(&lookup, env::ENDPOINT_VAR);
		builder.environment = env::string(&lookup, env::ENVIRONMENT_VAR);
		builder.proxy = env::string(&lookup, env::PROXY_VAR);
		if let Some(debug) = env::flag(&lookup, env::DEBUG_VAR) {
			builder.debug = debug;
		}
		Ok(builder)
	}

	pub fn api_key(mut self, key: impl Into<String>) -> Self {
		self.api_key = Some(ApiKey::new(key));
		self
	}

	/// Ingestion endpoint base URL, e.g. `https://errors.loom.dev`.
	pub fn endpoint(mut self, url: impl Into<String>) -> Self {
		self.endpoint = Some(url.into());
		self
	}

	/// Environment label, e.g. `production`, `staging`.
	pub fn environment(mut self, env: impl Into<String>) -> Self {
		self.environment = Some(env.into());
		self
	}

	pub fn enabled(mut self, enabled: bool) -> Self {
		self.enabled = enabled;
		self
	}

	/// Queue reports for background delivery instead of sending inline.
	pub fn async_send(mut self, async_send: bool) -> Self {
		self.async_send = async_send;
		self
	}

	pub fn max_queue_size(mut self, size: usize) -> Self {
		self.max_queue_size = size;
		self
	}

	pub fn timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;
		self
	}

	pub fn connect_timeout(mut self, timeout: Duration) -> Self {
		self.connect_timeout = timeout;
		self
	}

	pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
		self.proxy = Some(proxy.into());
		self
	}

	pub fn tls_verify(mut self, verify: bool) -> Self {
		self.tls_verify = verify;
		self
	}

	/// PEM bundle of extra root certificates.
	pub fn tls_ca_path(mut self, path: impl Into<PathBuf>) -> Self {
		self.tls_ca_path = Some(path.into());
		self
	}

	pub fn include_request(mut self, include: bool) -> Self {
		self.include_request = include;
		self
	}

	/// Keep the `session` entry of request data.
	pub fn include_session(mut self, include: bool) -> Self {
		self.include_session = include;
		self
	}

	/// Attach a sanitized dump of the process environment to the context.
	pub fn include_environment(mut self, include: bool) -> Self {
		self.include_environment = include;
		self
	}

	pub fn include_user(mut self, include: bool) -> Self {
		self.include_user = include;
		self
	}

	pub fn app_name(mut self, name: impl Into<String>) -> Self {
		self.app_name = Some(name.into());
		self
	}

	/// Release or commit the host application was built from.
	pub fn revision(mut self, revision: impl Into<String>) -> Self {
		self.revision = Some(revision.into());
		self
	}

	/// Local path prefix replaced with `[PROJECT_ROOT]` in backtraces.
	pub fn root_path(mut self, path: impl Into<String>) -> Self {
		self.root_path = Some(path.into());
		self
	}

	/// Extra filter keys, appended to [`DEFAULT_FILTER_KEYS`].
	pub fn filter_keys<I, S>(mut self, keys: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.extra_filter_keys.extend(keys.into_iter().map(Into::into));
		self
	}

	/// Extra ignore patterns, appended to [`DEFAULT_IGNORE_PATTERNS`].
	pub fn ignore_patterns<I, S>(mut self, patterns: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self
			.extra_ignore_patterns
			.extend(patterns.into_iter().map(Into::into));
		self
	}

	/// Turn the default ignore patterns off (on by default).
	pub fn default_ignore_patterns(mut self, enabled: bool) -> Self {
		self.default_ignore_patterns = enabled;
		self
	}

	/// Registers a before-notify hook; hooks run in registration order.
	pub fn before_notify(mut self, hook: BeforeNotifyHook) -> Self {
		self.before_notify.push(hook);
		self
	}

	pub fn debug(mut self, debug: bool) -> Self {
		self.debug = debug;
		self
	}

	/// How often the background worker drains the queue without a push.
	pub fn flush_interval(mut self, interval: Duration) -> Self {
		self.flush_interval = interval;
		self
	}

	/// Upper bound on the final flush during shutdown.
	pub fn shutdown_grace(mut self, grace: Duration) -> Self {
		self.shutdown_grace = grace;
		self
	}

	/// First retry delay; it doubles on every further attempt.
	pub fn retry_base_delay(mut self, delay: Duration) -> Self {
		self.retry.base_delay = delay;
		self
	}

	pub fn build(self) -> Config {
		let mut filter_keys: Vec<String> = Vec::new();
		for key in DEFAULT_FILTER_KEYS
			.iter()
			.map(|k| k.to_string())
			.chain(self.extra_filter_keys)
		{
			let key = key.trim().to_lowercase();
			if !key.is_empty() && !filter_keys.contains(&key) {
				filter_keys.push(key);
			}
		}

		let mut ignore_patterns: Vec<String> = Vec::new();
		let defaults: &[&str] = if self.default_ignore_patterns {
			DEFAULT_IGNORE_PATTERNS
		} else {
			&[]
		};
		for pattern in defaults
			.iter()
			.map(|p| p.to_string())
			.chain(self.extra_ignore_patterns)
		{
			let pattern = pattern.trim().to_string();
			if !pattern.is_empty() && !ignore_patterns.contains(&pattern) {
				ignore_patterns.push(pattern);
			}
		}

		Config {
			api_key: self.api_key,
			endpoint: self
				.endpoint
				.unwrap_or_else(|| DEFAULT_ENDPOINT.to_string())
				.trim_end_matches('/')
				.to_string(),
			environment: self
				.environment
				.unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string()),
			enabled: self.enabled,
			async_send: self.async_send,
			max_queue_size: self.max_queue_size,
			timeout: self.timeout,
			connect_timeout: self.connect_timeout,
			proxy: self.proxy,
			tls_verify: self.tls_verify,
			tls_ca_path: self.tls_ca_path,
			include_request: self.include_request,
			include_session: self.include_session,
			include_environment: self.include_environment,
			include_user: self.include_user,
			app_name: self.app_name,
			revision: self.revision,
			root_path: self.root_path,
			filter_keys,
			ignore_patterns,
			before_notify: self.before_notify,
			debug: self.debug,
			flush_interval: self.flush_interval,
			shutdown_grace: self.shutdown_grace,
			retry: self.retry,
		}
	}
}

impl Default for ConfigBuilder {
	fn default() -> Self {
		Self::new()
	}
}
