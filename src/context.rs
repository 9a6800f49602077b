use crate::{arg::PropValue, dom::Dom};
use core::fmt::{self, Debug, Formatter};
use hashbrown::HashMap;
use std::rc::Rc;
use tracing::trace;

/// Disposes a subscription.
pub type Dispose = Box<dyn FnOnce()>;

/// A custom property binding, applied for `$name` keys.
pub type Binding<D> = Rc<dyn Fn(&<D as Dom>::Node, &PropValue<D>)>;

/// The reactive scheduler hydration and insertion subscribe to.
///
/// Dependency tracking, batching and disposal policy are up to the implementation.
pub trait Reactive {
	/// Calls `callback` once right away (on the caller's stack), then again whenever its dependencies change.
	///
	/// At most one callback body may run at a time.
	/// Implementations must not hold internal borrows while running a callback, as callbacks subscribe recursively.
	fn subscribe(&self, callback: Box<dyn FnMut()>) -> Dispose;

	/// Ties `cleanup` to the lifetime of the currently running reactive scope.
	fn cleanup(&self, cleanup: Box<dyn FnOnce()>);
}

/// A [`Reactive`] that never re-runs anything, for hydrating static content.
#[derive(Debug, Default, Clone, Copy)]
pub struct Static;
impl Reactive for Static {
	fn subscribe(&self, mut callback: Box<dyn FnMut()>) -> Dispose {
		callback();
		Box::new(|| ())
	}

	fn cleanup(&self, _cleanup: Box<dyn FnOnce()>) {
		trace!("Static scope: Cleanup will never run.");
	}
}

/// The shared state of the builders, the hydration reconciler and all insertion points created by them.
///
/// Build, hydrate and insert through an [`Rc<Context>`], as subscriptions keep [weak](`std::rc::Weak`) references to it.
/// Callbacks that run after the [`Context`] was dropped do nothing.
pub struct Context<D: Dom> {
	pub(crate) dom: D,
	pub(crate) reactive: Rc<dyn Reactive>,
	pub(crate) bindings: HashMap<String, Binding<D>>,
}

impl<D: Dom> Context<D> {
	#[must_use]
	pub fn new(dom: D, reactive: Rc<dyn Reactive>) -> Self {
		Self {
			dom,
			reactive,
			bindings: HashMap::new(),
		}
	}

	/// Registers a binding for properties named `$name`.
	#[must_use]
	pub fn with_binding(mut self, name: impl Into<String>, binding: impl 'static + Fn(&D::Node, &PropValue<D>)) -> Self {
		self.bindings.insert(name.into(), Rc::new(binding));
		self
	}

	pub fn dom(&self) -> &D {
		&self.dom
	}

	pub(crate) fn subscribe(self: &Rc<Self>, mut callback: impl 'static + FnMut(&Rc<Self>)) -> Dispose {
		let context = Rc::downgrade(self);
		self.reactive.subscribe(Box::new(move || match context.upgrade() {
			Some(context) => callback(&context),
			None => trace!("Context dropped. Skipping reactive callback."),
		}))
	}
}

impl<D: Dom> Debug for Context<D> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Context")
			.field("bindings", &self.bindings.keys().collect::<Vec<_>>())
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use core::cell::Cell;

	#[test]
	fn static_runs_exactly_once() {
		let count = Rc::new(Cell::new(0));
		let dispose = Static.subscribe(Box::new({
			let count = Rc::clone(&count);
			move || count.set(count.get() + 1)
		}));
		assert_eq!(count.get(), 1);
		dispose();
		assert_eq!(count.get(), 1);
	}
}
