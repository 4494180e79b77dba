// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Stack capture for faults.

use backtrace::Backtrace;
use loom_errors_core::Frame;
use rustc_demangle::demangle;

/// Frames from these prefixes are capture machinery, not the fault site.
const MACHINERY_PREFIXES: &[&str] = &[
	"backtrace::",
	"<backtrace::",
	"loom_errors::",
	"<loom_errors::",
	"std::panicking::",
	"std::panic::",
	"core::panicking::",
	"rust_begin_unwind",
	"__rust_",
];

/// Captures the current stack as frames, innermost first, skipping the
/// leading capture/panic machinery and frames without source locations.
pub fn capture_frames() -> Vec<Frame> {
	let backtrace = Backtrace::new();
	let mut frames = Vec::new();

	for frame in backtrace.frames() {
		for symbol in frame.symbols() {
			let (Some(file), Some(line)) = (symbol.filename(), symbol.lineno()) else {
				continue;
			};
			let Some(name) = symbol.name().and_then(|n| n.as_str().map(symbol_name)) else {
				continue;
			};
			frames.push(Frame::from_symbol(file.to_string_lossy(), line, &name));
		}
	}

	skip_machinery(frames)
}

/// Demangled symbol without the trailing hash.
fn symbol_name(raw: &str) -> String {
	format!("{:#}", demangle(raw))
}

fn symbol_path(frame: &Frame) -> String {
	match &frame.qualifier {
		Some(qualifier) => format!("{qualifier}::{}", frame.function),
		None => frame.function.clone(),
	}
}

fn is_machinery(symbol: &str) -> bool {
	MACHINERY_PREFIXES
		.iter()
		.any(|prefix| symbol.starts_with(prefix))
}

fn skip_machinery(frames: Vec<Frame>) -> Vec<Frame> {
	frames
		.into_iter()
		.skip_while(|frame| is_machinery(&symbol_path(frame)))
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn strips_hash_when_demangling() {
		assert_eq!(
			symbol_name("_ZN8my_crate4main17h0123456789abcdefE"),
			"my_crate::main"
		);
		assert_eq!(symbol_name("plain_c_symbol"), "plain_c_symbol");
	}

	#[test]
	fn machinery_frames_are_recognised() {
		assert!(is_machinery("backtrace::capture::Backtrace::new"));
		assert!(is_machinery("loom_errors::fault::Fault::new"));
		assert!(is_machinery("std::panicking::begin_panic_handler"));
		assert!(!is_machinery("my_app::handlers::checkout"));
		assert!(!is_machinery("tokio::runtime::Runtime::block_on"));
	}

	#[test]
	fn only_leading_machinery_is_skipped() {
		let frames = vec![
			Frame::from_symbol("bt.rs", 1, "backtrace::capture::Backtrace::new"),
			Frame::from_symbol("fault.rs", 2, "loom_errors::fault::Fault::new"),
			Frame::from_symbol("main.rs", 3, "my_app::main"),
			Frame::from_symbol("notify.rs", 4, "loom_errors::notifier::Notifier::notify"),
		];

		let kept = skip_machinery(frames);
		assert_eq!(kept.len(), 2);
		assert_eq!(kept[0].function, "main");
		assert_eq!(kept[1].line, 4);
	}

	#[test]
	fn capture_does_not_panic() {
		// Frame content depends on debug info availability.
		let _frames = capture_frames();
	}
}
