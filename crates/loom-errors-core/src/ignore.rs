// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Ignore rules deciding whether a fault is reported at all.
//!
//! A pattern matches a fault when any of these hold, checked in order:
//!
//! 1. it equals the fully qualified type name
//! 2. it names an ancestor type
//! 3. it equals the short type name
//! 4. it contains `*` or `|` and, read as a glob (`*` = any run of
//!    characters, `|` = alternation), matches the fully qualified or short name
//!
//! Globs are compiled once when the filter is built.

use regex::Regex;

use crate::error::{CoreError, Result};
use crate::identity::FaultIdentity;

/// Faults that are never worth reporting by default: peers hanging up.
pub const DEFAULT_IGNORE_PATTERNS: &[&str] = &["BrokenPipe", "ConnectionReset"];

#[derive(Debug, Clone)]
struct IgnorePattern {
	raw: String,
	glob: Option<Regex>,
}

impl IgnorePattern {
	fn compile(raw: &str) -> Result<Self> {
		let glob = if raw.contains('*') || raw.contains('|') {
			Some(compile_glob(raw)?)
		} else {
			None
		};
		Ok(Self {
			raw: raw.to_string(),
			glob,
		})
	}

	fn matches(&self, identity: &FaultIdentity) -> bool {
		if self.raw == identity.class_name()
			|| identity.descends_from(&self.raw)
			|| self.raw == identity.short_name()
		{
			return true;
		}

		match &self.glob {
			Some(glob) => glob.is_match(identity.class_name()) || glob.is_match(identity.short_name()),
			None => false,
		}
	}
}

fn compile_glob(pattern: &str) -> Result<Regex> {
	let alternatives: Vec<String> = pattern
		.split('|')
		.map(|alt| regex::escape(alt.trim()).replace(r"\*", ".*"))
		.collect();
	let source = format!("^(?:{})$", alternatives.join("|"));
	Regex::new(&source).map_err(|source| CoreError::InvalidPattern {
		pattern: pattern.to_string(),
		source,
	})
}

/// Pre-compiled set of ignore patterns, immutable once built.
#[derive(Debug, Clone, Default)]
pub struct IgnoreFilter {
	patterns: Vec<IgnorePattern>,
}

impl IgnoreFilter {
	pub fn new<I, S>(patterns: I) -> Result<Self>
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let patterns = patterns
			.into_iter()
			.map(|p| p.as_ref().trim().to_string())
			.filter(|p| !p.is_empty())
			.map(|p| IgnorePattern::compile(&p))
			.collect::<Result<Vec<_>>>()?;
		Ok(Self { patterns })
	}

	/// Filter that ignores nothing.
	pub fn empty() -> Self {
		Self::default()
	}

	pub fn is_empty(&self) -> bool {
		self.patterns.is_empty()
	}

	pub fn patterns(&self) -> impl Iterator<Item = &str> {
		self.patterns.iter().map(|p| p.raw.as_str())
	}

	pub fn should_ignore(&self, identity: &FaultIdentity) -> bool {
		self.matching_pattern(identity).is_some()
	}

	/// First pattern that matches `identity`, if any.
	pub fn matching_pattern(&self, identity: &FaultIdentity) -> Option<&str> {
		self
			.patterns
			.iter()
			.find(|p| p.matches(identity))
			.map(|p| p.raw.as_str())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	fn runtime_exception() -> FaultIdentity {
		FaultIdentity::new("app::errors::RuntimeException").with_ancestor("app::errors::Exception")
	}

	#[test]
	fn empty_filter_ignores_nothing() {
		let filter = IgnoreFilter::empty();
		assert!(!filter.should_ignore(&FaultIdentity::new("anything")));
		assert!(IgnoreFilter::new(Vec::<String>::new()).unwrap().is_empty());
	}

	#[test]
	fn exact_fully_qualified_match() {
		let filter = IgnoreFilter::new(["app::errors::RuntimeException"]).unwrap();
		assert!(filter.should_ignore(&runtime_exception()));
	}

	#[test]
	fn ancestor_match_covers_derived_types() {
		let filter = IgnoreFilter::new(["Exception"]).unwrap();
		assert!(filter.should_ignore(&FaultIdentity::new("Exception")));
		assert!(filter.should_ignore(&runtime_exception()));
		assert!(!filter.should_ignore(&FaultIdentity::new("app::errors::Panic")));
	}

	#[test]
	fn short_name_match() {
		let filter = IgnoreFilter::new(["RuntimeException"]).unwrap();
		assert!(filter.should_ignore(&runtime_exception()));
	}

	#[test]
	fn plain_pattern_is_not_a_substring_match() {
		let filter = IgnoreFilter::new(["Runtime"]).unwrap();
		assert!(!filter.should_ignore(&runtime_exception()));
	}

	#[test]
	fn star_glob_matches_suffix() {
		let filter = IgnoreFilter::new(["*Exception"]).unwrap();
		assert!(filter.should_ignore(&FaultIdentity::new("TimeoutException")));
		assert!(filter.should_ignore(&runtime_exception()));
		assert!(!filter.should_ignore(&FaultIdentity::new("ExceptionHandlerError")));
	}

	#[test]
	fn alternation_glob() {
		let filter = IgnoreFilter::new(["NotFound|Forbidden"]).unwrap();
		assert!(filter.should_ignore(&FaultIdentity::new("http::NotFound")));
		assert!(filter.should_ignore(&FaultIdentity::new("Forbidden")));
		assert!(!filter.should_ignore(&FaultIdentity::new("Unauthorized")));
	}

	#[test]
	fn glob_metacharacters_are_literal() {
		let filter = IgnoreFilter::new(["app::*.Error"]).unwrap();
		assert!(filter.should_ignore(&FaultIdentity::new("app::db.Error")));
		assert!(!filter.should_ignore(&FaultIdentity::new("app::dbXError")));
	}

	#[test]
	fn first_matching_pattern_is_reported() {
		let filter = IgnoreFilter::new(["Nope", "*Exception", "RuntimeException"]).unwrap();
		assert_eq!(filter.matching_pattern(&runtime_exception()), Some("*Exception"));
	}

	#[test]
	fn blank_patterns_are_dropped() {
		let filter = IgnoreFilter::new(["", "  "]).unwrap();
		assert!(filter.is_empty());
	}

	#[test]
	fn default_patterns_ignore_hangups() {
		let filter = IgnoreFilter::new(DEFAULT_IGNORE_PATTERNS).unwrap();
		let hangup = FaultIdentity::new("std::io::Error").with_ancestor("BrokenPipe");
		assert!(filter.should_ignore(&hangup));
		assert!(!filter.should_ignore(&FaultIdentity::new("std::io::Error")));
	}

	proptest! {
		#[test]
		fn star_suffix_matches_any_prefix(prefix in "[A-Za-z:_]{0,20}") {
			let filter = IgnoreFilter::new(["*Exception"]).unwrap();
			let identity = FaultIdentity::new(format!("{prefix}Exception"));
			prop_assert!(filter.should_ignore(&identity));
		}

		#[test]
		fn names_are_never_ignored_by_empty_filter(name in "[A-Za-z:_]{1,30}") {
			prop_assert!(!IgnoreFilter::empty().should_ignore(&FaultIdentity::new(name)));
		}
	}
}
