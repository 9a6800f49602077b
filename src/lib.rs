#![doc(html_root_url = "https://docs.rs/delta-dom/0.0.1")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

pub mod arg;
pub mod build;
pub mod context;
pub mod dom;
pub mod hydrate;
pub mod insert;
pub mod memory;
pub mod property;
pub mod tree;
pub mod web;

pub use arg::{is_multi_expression, Arg, Call, Func, Prop, PropValue, Props};
pub use context::{Context, Dispose, Reactive, Static};
pub use dom::{Dom, Handler};
pub use insert::{InsertionPoint, Phase};
pub use tree::{Delta, VNode};

/// Page content as it may appear in log messages.
pub(crate) fn shown(text: &str) -> &str {
	if cfg!(feature = "dangerous-logging") {
		text
	} else {
		"[redacted]"
	}
}
