// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Type identity of a captured fault.

/// What the ignore rules know about a fault: its fully qualified type name,
/// the short (unqualified) name, and every ancestor type it is an instance of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaultIdentity {
	class_name: String,
	short_name: String,
	ancestors: Vec<String>,
}

impl FaultIdentity {
	pub fn new(class_name: impl Into<String>) -> Self {
		let class_name = class_name.into();
		let short_name = short_name_of(&class_name).to_string();
		Self {
			class_name,
			short_name,
			ancestors: Vec::new(),
		}
	}

	/// Records an ancestor type. Ancestry is transitive, so callers add the
	/// whole chain (parent, grandparent, ...).
	pub fn with_ancestor(mut self, ancestor: impl Into<String>) -> Self {
		let ancestor = ancestor.into();
		if !self.ancestors.contains(&ancestor) {
			self.ancestors.push(ancestor);
		}
		self
	}

	pub fn class_name(&self) -> &str {
		&self.class_name
	}

	pub fn short_name(&self) -> &str {
		&self.short_name
	}

	pub fn ancestors(&self) -> &[String] {
		&self.ancestors
	}

	/// True if `name` is one of this fault's ancestors, by fully qualified or
	/// short name.
	pub fn descends_from(&self, name: &str) -> bool {
		self
			.ancestors
			.iter()
			.any(|ancestor| ancestor == name || short_name_of(ancestor) == name)
	}
}

/// `std::io::Error` -> `Error`, `my_app::Wrapper<io::Error>` -> `Wrapper`.
fn short_name_of(class_name: &str) -> &str {
	let base = match class_name.find('<') {
		Some(idx) => &class_name[..idx],
		None => class_name,
	};
	match base.rfind("::") {
		Some(idx) => &base[idx + 2..],
		None => base,
	}
}
