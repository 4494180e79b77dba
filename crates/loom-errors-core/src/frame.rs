// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Stack frames and backtrace line formatting.

use serde::{Deserialize, Serialize};

/// Replaces the configured project root in reported file paths.
pub const PROJECT_ROOT_PLACEHOLDER: &str = "[PROJECT_ROOT]";

/// Separator between a frame's qualifier (module/type path) and its function.
const QUALIFIER_SEPARATOR: &str = "::";

/// A single stack frame, already demangled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
	pub file: String,
	pub line: u32,
	/// Module or type path the function lives in; `None` for a bare function.
	pub qualifier: Option<String>,
	pub function: String,
}

impl Frame {
	pub fn new(file: impl Into<String>, line: u32, function: impl Into<String>) -> Self {
		Self {
			file: file.into(),
			line,
			qualifier: None,
			function: function.into(),
		}
	}

	pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
		self.qualifier = Some(qualifier.into());
		self
	}

	/// Builds a frame from a fully qualified symbol such as
	/// `my_app::handlers::create_order`, splitting at the last `::`.
	pub fn from_symbol(file: impl Into<String>, line: u32, symbol: &str) -> Self {
		let (qualifier, function) = split_symbol(symbol);
		Self {
			file: file.into(),
			line,
			qualifier,
			function,
		}
	}

	/// `<file>:<line> in <qualifier>::<function>`, with the file path
	/// normalized against `root`.
	pub fn format(&self, root: Option<&str>) -> String {
		let file = normalize_path(&self.file, root);
		match &self.qualifier {
			Some(qualifier) if !qualifier.is_empty() => format!(
				"{file}:{} in {qualifier}{QUALIFIER_SEPARATOR}{}",
				self.line, self.function
			),
			_ => format!("{file}:{} in {}", self.line, self.function),
		}
	}
}

/// Replaces a leading `root` in `path` with [`PROJECT_ROOT_PLACEHOLDER`].
pub fn normalize_path(path: &str, root: Option<&str>) -> String {
	match root {
		Some(root) if !root.is_empty() => match path.strip_prefix(root) {
			Some(rest) => format!("{PROJECT_ROOT_PLACEHOLDER}{rest}"),
			None => path.to_string(),
		},
		_ => path.to_string(),
	}
}

fn split_symbol(symbol: &str) -> (Option<String>, String) {
	// Generic arguments may contain `::` themselves; split outside of them.
	let mut depth = 0usize;
	let mut split_at = None;
	let bytes = symbol.as_bytes();
	let mut i = 0;
	while i < bytes.len() {
		match bytes[i] {
			b'<' => depth += 1,
			b'>' => depth = depth.saturating_sub(1),
			b':' if depth == 0 && bytes.get(i + 1) == Some(&b':') => {
				split_at = Some(i);
				i += 1;
			}
			_ => {}
		}
		i += 1;
	}

	match split_at {
		Some(idx) => (
			Some(symbol[..idx].to_string()),
			symbol[idx + QUALIFIER_SEPARATOR.len()..].to_string(),
		),
		None => (None, symbol.to_string()),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn formats_qualified_frame() {
		let frame = Frame::new("/srv/app/src/orders.rs", 42, "create").with_qualifier("app::orders");
		assert_eq!(
			frame.format(None),
			"/srv/app/src/orders.rs:42 in app::orders::create"
		);
	}

	#[test]
	fn formats_bare_function_without_separator() {
		let frame = Frame::new("src/main.rs", 7, "main");
		assert_eq!(frame.format(None), "src/main.rs:7 in main");
	}

	#[test]
	fn normalizes_root_prefix() {
		let frame = Frame::new("/srv/app/src/orders.rs", 42, "create");
		assert_eq!(
			frame.format(Some("/srv/app")),
			"[PROJECT_ROOT]/src/orders.rs:42 in create"
		);
	}

	#[test]
	fn leaves_paths_outside_root_untouched() {
		assert_eq!(
			normalize_path("/usr/lib/rustlib/src/lib.rs", Some("/srv/app")),
			"/usr/lib/rustlib/src/lib.rs"
		);
		assert_eq!(normalize_path("src/lib.rs", Some("")), "src/lib.rs");
	}

	#[test]
	fn splits_symbol_at_last_separator() {
		let frame = Frame::from_symbol("src/lib.rs", 1, "my_app::handlers::process");
		assert_eq!(frame.qualifier.as_deref(), Some("my_app::handlers"));
		assert_eq!(frame.function, "process");
	}

	#[test]
	fn split_ignores_separators_inside_generics() {
		let frame = Frame::from_symbol(
			"src/lib.rs",
			1,
			"<alloc::vec::Vec<T> as core::ops::Drop>::drop",
		);
		assert_eq!(
			frame.qualifier.as_deref(),
			Some("<alloc::vec::Vec<T> as core::ops::Drop>")
		);
		assert_eq!(frame.function, "drop");
	}

	#[test]
	fn bare_symbol_has_no_qualifier() {
		let frame = Frame::from_symbol("src/main.rs", 3, "main");
		assert!(frame.qualifier.is_none());
		assert_eq!(frame.function, "main");
	}
}
