#![allow(dead_code)]

use delta_dom::{Dispose, Reactive};
use std::{cell::RefCell, rc::Rc};

type Callback = Rc<RefCell<Box<dyn FnMut()>>>;

/// A [`Reactive`] that re-runs subscriptions only when told to.
#[derive(Default)]
pub struct ManualReactive {
	callbacks: Rc<RefCell<Vec<Option<Callback>>>>,
	cleanups: RefCell<Vec<Box<dyn FnOnce()>>>,
}

impl ManualReactive {
	pub fn new() -> Rc<Self> {
		Rc::default()
	}

	/// Re-runs each subscription that existed when this was called, in subscription order.
	pub fn rerun(&self) {
		let count = self.callbacks.borrow().len();
		for i in 0..count {
			let callback = self.callbacks.borrow()[i].clone();
			if let Some(callback) = callback {
				(callback.borrow_mut())()
			}
		}
	}

	pub fn live_subscriptions(&self) -> usize {
		self.callbacks.borrow().iter().filter(|c| c.is_some()).count()
	}

	pub fn run_cleanups(&self) {
		let cleanups: Vec<_> = self.cleanups.borrow_mut().drain(..).collect();
		for cleanup in cleanups {
			cleanup()
		}
	}
}

impl Reactive for ManualReactive {
	fn subscribe(&self, callback: Box<dyn FnMut()>) -> Dispose {
		let callback: Callback = Rc::new(RefCell::new(callback));
		let index = {
			let mut callbacks = self.callbacks.borrow_mut();
			callbacks.push(Some(Rc::clone(&callback)));
			callbacks.len() - 1
		};
		(callback.borrow_mut())();

		let callbacks = Rc::downgrade(&self.callbacks);
		Box::new(move || {
			if let Some(callbacks) = callbacks.upgrade() {
				callbacks.borrow_mut()[index] = None
			}
		})
	}

	fn cleanup(&self, cleanup: Box<dyn FnOnce()>) {
		self.cleanups.borrow_mut().push(cleanup)
	}
}
