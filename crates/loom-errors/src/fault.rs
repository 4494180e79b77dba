// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Captured faults, the input to [`Notifier::notify`](crate::Notifier::notify).

use std::error::Error;
use std::panic::{Location, PanicHookInfo};

use loom_errors_core::{FaultIdentity, Frame};

use crate::hooks::panic_message;
use crate::stack::capture_frames;

/// Class name given to faults captured from panics.
pub const PANIC_CLASS: &str = "panic";

/// A fault as seen at the capture site: its type identity, message, origin
/// and the stack it was raised on.
#[derive(Debug, Clone, PartialEq)]
pub struct Fault {
	identity: FaultIdentity,
	message: String,
	origin: Option<(String, u32)>,
	frames: Vec<Frame>,
	causes: Vec<String>,
}

impl Fault {
	/// A fault of the named class, originating at the caller.
	#[track_caller]
	pub fn new(class: impl Into<String>, message: impl Into<String>) -> Self {
		let location = Location::caller();
		Self {
			identity: FaultIdentity::new(class),
			message: message.into(),
			origin: Some((location.file().to_string(), location.line())),
			frames: capture_frames(),
			causes: Vec::new(),
		}
	}

	/// A fault describing `error`: its Rust type name, its `Display` message
	/// and the messages of its `source()` chain.
	///
	/// `std::io::Error`s also carry their [`ErrorKind`](std::io::ErrorKind)
	/// as an ancestor, so patterns such as `BrokenPipe` match them.
	#[track_caller]
	pub fn from_error<E>(error: &E) -> Self
	where
		E: Error + 'static,
	{
		let location = Location::caller();
		let mut identity = FaultIdentity::new(std::any::type_name::<E>());

		let dyn_error: &(dyn Error + 'static) = error;
		if let Some(io) = dyn_error.downcast_ref::<std::io::Error>() {
			identity = identity.with_ancestor(format!("{:?}", io.kind()));
		}

		let mut causes = Vec::new();
		let mut source = dyn_error.source();
		while let Some(cause) = source {
			causes.push(cause.to_string());
			source = cause.source();
		}

		Self {
			identity,
			message: error.to_string(),
			origin: Some((location.file().to_string(), location.line())),
			frames: capture_frames(),
			causes,
		}
	}

	/// A fault for a panic in progress.
	pub fn from_panic(info: &PanicHookInfo<'_>) -> Self {
		Self {
			identity: FaultIdentity::new(PANIC_CLASS),
			message: panic_message(info.payload()),
			origin: info
				.location()
				.map(|location| (location.file().to_string(), location.line())),
			frames: capture_frames(),
			causes: Vec::new(),
		}
	}

	/// Declares that this fault's type derives from `ancestor`.
	pub fn with_ancestor(mut self, ancestor: impl Into<String>) -> Self {
		self.identity = self.identity.with_ancestor(ancestor);
		self
	}

	pub fn with_origin(mut self, file: impl Into<String>, line: u32) -> Self {
		self.origin = Some((file.into(), line));
		self
	}

	/// Replaces the captured stack, e.g. with frames from another runtime.
	pub fn with_frames(mut self, frames: Vec<Frame>) -> Self {
		self.frames = frames;
		self
	}

	pub fn identity(&self) -> &FaultIdentity {
		&self.identity
	}

	pub fn class_name(&self) -> &str {
		self.identity.class_name()
	}

	pub fn message(&self) -> &str {
		&self.message
	}

	pub fn origin(&self) -> Option<(&str, u32)> {
		self
			.origin
			.as_ref()
			.map(|(file, line)| (file.as_str(), *line))
	}

	pub fn frames(&self) -> &[Frame] {
		&self.frames
	}

	pub fn causes(&self) -> &[String] {
		&self.causes
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fmt;
	use std::io;

	#[derive(Debug)]
	struct CheckoutError {
		source: io::Error,
	}

	impl fmt::Display for CheckoutError {
		fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
			f.write_str("checkout failed")
		}
	}

	impl Error for CheckoutError {
		fn source(&self) -> Option<&(dyn Error + 'static)> {
			Some(&self.source)
		}
	}

	#[test]
	fn new_records_caller_as_origin() {
		let line = line!() + 1;
		let fault = Fault::new("RuntimeError", "boom");
		assert_eq!(fault.class_name(), "RuntimeError");
		assert_eq!(fault.message(), "boom");
		let (file, origin_line) = fault.origin().unwrap();
		assert!(file.ends_with("fault.rs"));
		assert_eq!(origin_line, line);
	}

	#[test]
	fn from_error_uses_type_name_and_source_chain() {
		let error = CheckoutError {
			source: io::Error::new(io::ErrorKind::TimedOut, "db timed out"),
		};
		let fault = Fault::from_error(&error);
		assert!(fault.class_name().ends_with("CheckoutError"));
		assert_eq!(fault.identity().short_name(), "CheckoutError");
		assert_eq!(fault.message(), "checkout failed");
		assert_eq!(fault.causes(), ["db timed out".to_string()]);
	}

	#[test]
	fn io_errors_carry_their_kind() {
		let error = io::Error::from(io::ErrorKind::BrokenPipe);
		let fault = Fault::from_error(&error);
		assert!(fault.identity().descends_from("BrokenPipe"));
	}

	#[test]
	fn builder_methods() {
		let fault = Fault::new("E", "m")
			.with_ancestor("Base")
			.with_origin("src/app.rs", 7)
			.with_frames(vec![Frame::new("src/app.rs", 7, "run")]);
		assert!(fault.identity().descends_from("Base"));
		assert_eq!(fault.origin(), Some(("src/app.rs", 7)));
		assert_eq!(fault.frames().len(), 1);
	}
}
