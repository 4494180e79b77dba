// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Sensitive-data redaction for report context, user and request data.
//!
//! [`SanitizeFilter`] walks nested JSON objects and arrays and replaces the
//! value of every key whose lowercase form contains a configured filter key
//! with [`FILTERED`]. Recursion stops at [`MAX_DEPTH`]; anything deeper
//! collapses to [`DEPTH_MARKER`], so self-similar or maliciously nested input
//! always terminates. Long strings are cut at [`MAX_STRING_LENGTH`] characters
//! and suffixed with [`ELLIPSIS`].

use std::fmt::Display;

use serde::Serialize;
use serde_json::{Map, Value};

pub use crate::report::ELLIPSIS;

/// Replaces the value of any filtered key.
pub const FILTERED: &str = "[FILTERED]";
/// Replaces any value nested deeper than [`MAX_DEPTH`].
pub const DEPTH_MARKER: &str = "[DEPTH]";
/// Deepest nesting level that is still walked.
pub const MAX_DEPTH: usize = 10;
/// Longest string (in characters) kept before truncation.
pub const MAX_STRING_LENGTH: usize = 2048;

/// Substrings that mark a key as sensitive unless the host opts out.
pub const DEFAULT_FILTER_KEYS: &[&str] = &[
	"password",
	"password_confirmation",
	"secret",
	"token",
	"api_key",
	"access_token",
	"authorization",
	"cookie",
	"credit_card",
	"card_number",
	"cvv",
	"ssn",
];

/// Recursive, depth-bounded redaction filter.
///
/// Filter keys are lowercased once at construction and never change.
#[derive(Debug, Clone)]
pub struct SanitizeFilter {
	keys: Vec<String>,
}

impl SanitizeFilter {
	/// Builds a filter from an explicit key list (case-insensitive substrings).
	pub fn new<I, S>(keys: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let mut lowered: Vec<String> = Vec::new();
		for key in keys {
			let key = key.as_ref().trim().to_lowercase();
			if !key.is_empty() && !lowered.contains(&key) {
				lowered.push(key);
			}
		}
		Self { keys: lowered }
	}

	/// Filter using [`DEFAULT_FILTER_KEYS`] only.
	pub fn with_defaults() -> Self {
		Self::new(DEFAULT_FILTER_KEYS)
	}

	pub fn keys(&self) -> &[String] {
		&self.keys
	}

	/// True if `key` contains any filter key, ignoring case.
	pub fn is_filtered(&self, key: &str) -> bool {
		let lower = key.to_lowercase();
		self.keys.iter().any(|k| lower.contains(k.as_str()))
	}

	/// Returns a sanitized copy of `map`. Never fails.
	pub fn filter(&self, map: &Map<String, Value>) -> Map<String, Value> {
		self.filter_map(map, 0)
	}

	/// Sanitizes an arbitrary value as if it were nested at the top level.
	pub fn filter_value(&self, value: &Value) -> Value {
		self.sanitize(value, 0)
	}

	fn filter_map(&self, map: &Map<String, Value>, depth: usize) -> Map<String, Value> {
		let mut out = Map::with_capacity(map.len());
		for (key, value) in map {
			let sanitized = if self.is_filtered(key) {
				Value::String(FILTERED.to_string())
			} else {
				self.sanitize(value, depth + 1)
			};
			out.insert(key.clone(), sanitized);
		}
		out
	}

	fn sanitize(&self, value: &Value, depth: usize) -> Value {
		if depth > MAX_DEPTH {
			return Value::String(DEPTH_MARKER.to_string());
		}

		match value {
			Value::Object(map) => Value::Object(self.filter_map(map, depth)),
			Value::Array(items) => Value::Array(
				items
					.iter()
					.map(|item| self.sanitize(item, depth + 1))
					.collect(),
			),
			Value::String(s) => Value::String(truncate(s, MAX_STRING_LENGTH)),
			Value::Null | Value::Bool(_) | Value::Number(_) => value.clone(),
		}
	}
}

impl Default for SanitizeFilter {
	fn default() -> Self {
		Self::with_defaults()
	}
}

/// Cuts `s` to `max` characters and appends [`ELLIPSIS`] when it was longer.
pub fn truncate(s: &str, max: usize) -> String {
	match s.char_indices().nth(max) {
		Some((idx, _)) => format!("{}{ELLIPSIS}", &s[..idx]),
		None => s.to_string(),
	}
}

/// Placeholder for a value that cannot be represented as data, e.g.
/// `[OBJECT: Connection]`.
pub fn opaque<T: ?Sized>() -> Value {
	let name = std::any::type_name::<T>();
	let base = name.split('<').next().unwrap_or(name);
	let short = base.rsplit("::").next().unwrap_or(base);
	Value::String(format!("[OBJECT: {short}]"))
}

/// Converts any serializable value to data, falling back to the
/// [`opaque`] tag when serialization fails.
pub fn serializable<T: Serialize + ?Sized>(value: &T) -> Value {
	serde_json::to_value(value).unwrap_or_else(|_| opaque::<T>())
}

/// Uses a value's string conversion, length-truncated.
pub fn displayable<T: Display + ?Sized>(value: &T) -> Value {
	Value::String(truncate(&value.to_string(), MAX_STRING_LENGTH))
}
