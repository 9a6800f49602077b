//! Applies property bags to elements.

use crate::{
	arg::{Prop, PropValue, Props},
	context::Context,
	dom::Dom,
};
use std::rc::Rc;
use tracing::{error, trace, warn};

/// Applies a single nested (`style` or `attrs`) entry.
type ApplyNested<D> = fn(&Context<D>, &<D as Dom>::Node, &str, PropValue<D>);

impl<D: Dom> Context<D> {
	pub(crate) fn apply_prop(self: &Rc<Self>, element: &D::Node, name: String, prop: Prop<D>, is_svg: bool) {
		match prop {
			Prop::Static(value) => self.apply_property(&name, value, element, is_svg),
			Prop::Computed(compute) => {
				let element = element.clone();
				self.subscribe(move |context| context.apply_property(&name, compute(), &element, is_svg));
			}
			Prop::Ref(reference) => reference(element),
		}
	}

	/// Applies one property to `element`. Idempotent for values that are already reflected on it.
	///
	/// - `class`/`className` set the class name,
	/// - `data-…` and `aria-…` are attributes,
	/// - `on…` install (or with [`PropValue::Null`] remove) an event handler, with a `Capture` suffix selecting the capture phase,
	/// - `style` takes either CSS text or [nested](`PropValue::Nested`) style properties,
	/// - `attrs` takes nested attributes,
	/// - `$name` calls the [binding](`Context::with_binding`) registered as `name`,
	/// - anything else is assigned as property.
	pub fn apply_property(self: &Rc<Self>, name: &str, value: PropValue<D>, element: &D::Node, is_svg: bool) {
		let dom = &self.dom;
		if name == "class" || name == "className" {
			dom.set_class_name(element, &value.attribute_text().unwrap_or_default(), is_svg)
		} else if name.starts_with("data-") || name.starts_with("aria-") {
			set_attribute(self, element, name, value)
		} else if name.starts_with("on") {
			self.set_handler(element, name, value)
		} else if name == "style" {
			match value {
				PropValue::Nested(props) => self.apply_nested(element, props, set_style_property),
				value => dom.set_style_text(element, &value.attribute_text().unwrap_or_default()),
			}
		} else if name == "attrs" {
			match value {
				PropValue::Nested(props) => self.apply_nested(element, props, set_attribute),
				value => warn!("Expected nested attributes, found {:?}. Ignoring.", value),
			}
		} else if let Some(binding) = name.strip_prefix('$') {
			match self.bindings.get(binding) {
				Some(binding) => binding(element, &value),
				None => warn!("No binding registered for {:?}. Ignoring.", name),
			}
		} else if let Err(error) = dom.set_property(element, name, &value) {
			error!("Failed to set property {:?} to {:?}: {:?}", name, value, error)
		}
	}

	fn apply_nested(self: &Rc<Self>, element: &D::Node, props: Props<D>, apply: ApplyNested<D>) {
		for (name, prop) in props.0 {
			match prop {
				Prop::Static(value) => apply(self, element, &name, value),
				Prop::Computed(compute) => {
					let element = element.clone();
					self.subscribe(move |context| apply(context, &element, &name, compute()));
				}
				Prop::Ref(reference) => reference(element),
			}
		}
	}

	fn set_handler(self: &Rc<Self>, element: &D::Node, name: &str, value: PropValue<D>) {
		let (name, capture) = match name.strip_suffix("Capture") {
			Some(name) => (name, true),
			None => (name, false),
		};
		let lowercase = name.to_ascii_lowercase();
		let event = if self.dom.is_native_event(element, &lowercase) { &lowercase[2..] } else { &name[2..] }.to_owned();

		let handler = match value {
			PropValue::Handler(handler) => Some(handler),
			PropValue::Null | PropValue::Bool(false) => None,
			value => {
				warn!("Expected event handler for {:?}, found {:?}. Removing the handler instead.", event, value);
				None
			}
		};
		let installed = handler.is_some();
		if let Err(error) = self.dom.set_event_handler(element, &event, capture, handler) {
			return error!("Failed to set {:?} handler: {:?}", event, error);
		}
		trace!(capture, installed, "Set {:?} handler.", event);

		if installed {
			let context = Rc::downgrade(self);
			let element = element.clone();
			self.reactive.cleanup(Box::new(move || {
				if let Some(context) = context.upgrade() {
					if let Err(error) = context.dom.set_event_handler(&element, &event, capture, None) {
						error!("Failed to remove {:?} handler: {:?}", event, error)
					}
				}
			}))
		}
	}
}

fn set_attribute<D: Dom>(context: &Context<D>, element: &D::Node, name: &str, value: PropValue<D>) {
	let result = match value.attribute_text() {
		Some(text) => context.dom.set_attribute(element, name, &text),
		None => context.dom.remove_attribute(element, name),
	};
	if let Err(error) = result {
		error!("Failed to set attribute {:?}: {:?}", name, error)
	}
}

fn set_style_property<D: Dom>(context: &Context<D>, element: &D::Node, name: &str, value: PropValue<D>) {
	if let Err(error) = context.dom.set_style_property(element, name, &value.attribute_text().unwrap_or_default()) {
		error!("Failed to set style property {:?}: {:?}", name, error)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{
		context::Static,
		memory::{MemoryDom, MemoryEvent},
	};
	use core::cell::Cell;

	fn context() -> Rc<Context<MemoryDom>> {
		Rc::new(Context::new(MemoryDom::new(), Rc::new(Static)))
	}

	#[test]
	fn routes_by_name() {
		let cx = context();
		let dom = cx.dom();
		let element = dom.element("input");
		cx.apply_props(
			&element,
			Props::new()
				.with("class", "wide")
				.with("aria-label", "Name")
				.with("style", Props::new().with("color", "red"))
				.with("attrs", Props::new().with("autocomplete", "off"))
				.with("value", "Ada"),
			false,
		);
		assert_eq!(dom.attribute(&element, "class").as_deref(), Some("wide"));
		assert_eq!(dom.attribute(&element, "aria-label").as_deref(), Some("Name"));
		assert_eq!(dom.attribute(&element, "autocomplete").as_deref(), Some("off"));
		assert_eq!(dom.style(&element, "color").as_deref(), Some("red"));
		assert_eq!(dom.property(&element, "value").as_deref(), Some("Ada"));
	}

	#[test]
	fn replacing_a_handler_keeps_the_listener() {
		let cx = context();
		let dom = cx.dom();
		let button = dom.element("button");
		let clicks = Rc::new(Cell::new(0));

		for step in 1..=2 {
			let clicks = Rc::clone(&clicks);
			cx.apply_props(&button, Props::new().handler("onClick", move |_: &MemoryEvent| clicks.set(clicks.get() + step)), false);
		}
		assert_eq!(dom.listener_registrations(), 1);

		dom.dispatch(&button, "click");
		assert_eq!(clicks.get(), 2);

		cx.apply_property("onClick", PropValue::Null, &button, false);
		dom.dispatch(&button, "click");
		assert_eq!(clicks.get(), 2);
	}

	#[test]
	fn bindings_and_refs() {
		let seen = Rc::new(Cell::new(false));
		let cx = Rc::new(Context::new(MemoryDom::new(), Rc::new(Static)).with_binding("focus", {
			let seen = Rc::clone(&seen);
			move |_, value: &PropValue<MemoryDom>| seen.set(matches!(value, PropValue::Bool(true)))
		}));
		let element = cx.dom().element("input");
		let referenced = Rc::new(Cell::new(false));
		cx.apply_props(
			&element,
			Props::new().with("$focus", true).reference({
				let referenced = Rc::clone(&referenced);
				move |_| referenced.set(true)
			}),
			false,
		);
		assert!(seen.get());
		assert!(referenced.get());
	}
}
