//! [`Dom`] for the browser, via [`web_sys`].
//!
//! Per-node annotations live in [`WeakMap`]s and a [`WeakSet`] keyed by the nodes themselves,
//! so they are collected along with them and never show up as properties.
//!
//! All event listeners share one [`Closure`], bound to a handler slot index per (element, event) pair.

use crate::{
	arg::PropValue,
	dom::{Dom, Handler},
};
use core::{
	cell::RefCell,
	convert::TryFrom,
	fmt::{self, Debug, Formatter},
};
use js_sys::{Function, Map, Object, Reflect, WeakMap, WeakSet};
use std::rc::Rc;
use tracing::{error, trace, trace_span};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};

const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";

struct Slot {
	handler: Handler<WebDom>,
	listener: Function,
	capture: bool,
}

type Slots = Rc<RefCell<Vec<Option<Slot>>>>;

pub struct WebDom {
	document: web_sys::Document,
	cursors: WeakMap,
	pinned: WeakSet,
	/// Element → [`Map`] of event name → slot index.
	listeners: WeakMap,
	slots: Slots,
	free_slots: RefCell<Vec<usize>>,
	common_handler: Closure<dyn Fn(JsValue, web_sys::Event)>,
}

impl WebDom {
	#[must_use]
	pub fn new(document: web_sys::Document) -> Self {
		let slots: Slots = Rc::default();
		Self {
			document,
			cursors: WeakMap::new(),
			pinned: WeakSet::new(),
			listeners: WeakMap::new(),
			common_handler: Closure::wrap(Box::new({
				let slots = Rc::clone(&slots);
				move |slot: JsValue, event: web_sys::Event| {
					let span = trace_span!("common_handler", slot = ?&slot, event = ?&event);
					let _enter = span.enter();

					#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
					let handler = slot
						.as_f64()
						.and_then(|slot| slots.borrow().get(slot as usize).and_then(|slot| slot.as_ref().map(|slot| Rc::clone(&slot.handler))));
					match handler {
						Some(handler) => handler(&event),
						None => trace!("Handler slot is empty. Ignoring event."),
					}
				}
			}) as Box<dyn Fn(JsValue, web_sys::Event)>),
			slots,
			free_slots: RefCell::default(),
		}
	}

	pub fn document(&self) -> &web_sys::Document {
		&self.document
	}

	fn element<'a>(node: &'a web_sys::Node) -> Result<&'a web_sys::Element, JsValue> {
		node.dyn_ref::<web_sys::Element>().ok_or_else(|| JsValue::from_str("Expected an element."))
	}

	fn style(node: &web_sys::Node) -> Option<web_sys::CssStyleDeclaration> {
		if let Some(element) = node.dyn_ref::<web_sys::HtmlElement>() {
			Some(element.style())
		} else {
			node.dyn_ref::<web_sys::SvgElement>().map(web_sys::SvgElement::style)
		}
	}

	#[allow(clippy::cast_precision_loss)]
	fn bound_handler(&self, index: usize) -> Function {
		self.common_handler
			.as_ref()
			.unchecked_ref::<Function>()
			.bind1(&JsValue::UNDEFINED, &JsValue::from_f64(index as f64))
			.unchecked_into::<Function>()
	}

	#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss, clippy::cast_sign_loss)]
	fn add_listener(&self, element: &web_sys::Element, event: &str, capture: bool, handler: Handler<Self>) -> Result<(), JsValue> {
		let listeners = match self.listeners.get(element.unchecked_ref::<Object>()).dyn_into::<Map>() {
			Ok(listeners) => listeners,
			Err(_) => {
				let listeners = Map::new();
				self.listeners.set(element.unchecked_ref::<Object>(), &listeners);
				listeners
			}
		};

		if let Some(index) = listeners.get(&JsValue::from_str(event)).as_f64().map(|index| index as usize) {
			if let Some(slot) = self.slots.borrow_mut().get_mut(index).and_then(Option::as_mut) {
				slot.handler = handler;
				trace!(index, "Replaced handler for {:?}.", event);
				return Ok(());
			}
		}

		let reused = self.free_slots.borrow_mut().pop();
		let index = reused.unwrap_or_else(|| self.slots.borrow().len());
		let listener = self.bound_handler(index);
		let mut options = web_sys::AddEventListenerOptions::new();
		options.capture(capture);
		if let Err(error) = element.add_event_listener_with_callback_and_add_event_listener_options(event, &listener, &options) {
			if let Some(index) = reused {
				self.free_slots.borrow_mut().push(index)
			}
			return Err(error);
		}

		let slot = Some(Slot { handler, listener, capture });
		let mut slots = self.slots.borrow_mut();
		if index < slots.len() {
			slots[index] = slot
		} else {
			slots.push(slot)
		}
		listeners.set(&JsValue::from_str(event), &JsValue::from_f64(index as f64));
		trace!(capture, index, "Added listener for {:?}.", event);
		Ok(())
	}

	fn remove_listener(&self, element: &web_sys::Element, event: &str) -> Result<(), JsValue> {
		let listeners = match self.listeners.get(element.unchecked_ref::<Object>()).dyn_into::<Map>() {
			Ok(listeners) => listeners,
			Err(_) => return Ok(()),
		};
		let key = JsValue::from_str(event);
		#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
		let index = match listeners.get(&key).as_f64() {
			Some(index) => index as usize,
			None => return Ok(()),
		};
		listeners.delete(&key);

		let slot = self.slots.borrow_mut().get_mut(index).and_then(Option::take);
		if let Some(slot) = slot {
			self.free_slots.borrow_mut().push(index);
			element.remove_event_listener_with_callback_and_bool(event, &slot.listener, slot.capture)?;
			trace!(index, "Removed listener for {:?}.", event);
		}
		Ok(())
	}
}

/// Converts a byte offset into `data` to UTF-16 code units.
fn utf16_offset(data: &str, offset: usize) -> Result<u32, JsValue> {
	let head = data.get(..offset).ok_or_else(|| JsValue::from_str("Split offset is not on a character boundary."))?;
	u32::try_from(head.encode_utf16().count()).map_err(|_| JsValue::from_str("Split offset out of range."))
}

fn js_value(value: &PropValue<WebDom>) -> Result<JsValue, JsValue> {
	Ok(match value {
		PropValue::Null => JsValue::NULL,
		&PropValue::Bool(value) => JsValue::from_bool(value),
		&PropValue::Number(number) => JsValue::from_f64(number),
		PropValue::Str(text) => JsValue::from_str(text),
		PropValue::Handler(_) | PropValue::Nested(_) => return Err(JsValue::from_str("Value can't be assigned as property.")),
	})
}

impl Dom for WebDom {
	type Node = web_sys::Node;
	type Event = web_sys::Event;
	type Error = JsValue;

	fn create_element(&self, tag: &str, is_svg: bool) -> Result<web_sys::Node, JsValue> {
		let element = if is_svg {
			self.document.create_element_ns(Some(SVG_NAMESPACE), tag)?
		} else {
			self.document.create_element(tag)?
		};
		Ok(element.into())
	}

	fn create_text(&self, data: &str) -> web_sys::Node {
		self.document.create_text_node(data).into()
	}

	fn create_fragment(&self) -> web_sys::Node {
		self.document.create_document_fragment().into()
	}

	fn first_child(&self, node: &web_sys::Node) -> Option<web_sys::Node> {
		node.first_child()
	}

	fn last_child(&self, node: &web_sys::Node) -> Option<web_sys::Node> {
		node.last_child()
	}

	fn next_sibling(&self, node: &web_sys::Node) -> Option<web_sys::Node> {
		node.next_sibling()
	}

	fn previous_sibling(&self, node: &web_sys::Node) -> Option<web_sys::Node> {
		node.previous_sibling()
	}

	fn parent_node(&self, node: &web_sys::Node) -> Option<web_sys::Node> {
		node.parent_node()
	}

	fn is_text(&self, node: &web_sys::Node) -> bool {
		node.node_type() == web_sys::Node::TEXT_NODE
	}

	fn tag_name(&self, node: &web_sys::Node) -> Option<String> {
		node.dyn_ref::<web_sys::Element>().map(web_sys::Element::tag_name)
	}

	fn text_data(&self, node: &web_sys::Node) -> Option<String> {
		if self.is_text(node) {
			node.dyn_ref::<web_sys::CharacterData>().map(web_sys::CharacterData::data)
		} else {
			None
		}
	}

	fn set_text_data(&self, node: &web_sys::Node, data: &str) {
		match node.dyn_ref::<web_sys::CharacterData>() {
			Some(text) => text.set_data(data),
			None => error!("Expected character data, found {:?}.", node),
		}
	}

	fn split_text(&self, node: &web_sys::Node, offset: usize) -> Result<web_sys::Node, JsValue> {
		let text = node.dyn_ref::<web_sys::Text>().ok_or_else(|| JsValue::from_str("Expected a text node."))?;
		let offset = utf16_offset(&text.data(), offset)?;
		Ok(text.split_text(offset)?.into())
	}

	fn insert_before(&self, parent: &web_sys::Node, child: &web_sys::Node, reference: Option<&web_sys::Node>) -> Result<(), JsValue> {
		parent.insert_before(child, reference).map(drop)
	}

	fn remove_child(&self, parent: &web_sys::Node, child: &web_sys::Node) -> Result<(), JsValue> {
		parent.remove_child(child).map(drop)
	}

	fn set_text_content(&self, node: &web_sys::Node, text: &str) {
		node.set_text_content(Some(text))
	}

	fn set_class_name(&self, element: &web_sys::Node, class: &str, is_svg: bool) {
		let result = Self::element(element).and_then(|element| {
			if is_svg {
				element.set_attribute("class", class)
			} else {
				element.set_class_name(class);
				Ok(())
			}
		});
		if let Err(error) = result {
			error!("Failed to set class name: {:?}", error)
		}
	}

	fn set_attribute(&self, element: &web_sys::Node, name: &str, value: &str) -> Result<(), JsValue> {
		Self::element(element)?.set_attribute(name, value)
	}

	fn remove_attribute(&self, element: &web_sys::Node, name: &str) -> Result<(), JsValue> {
		Self::element(element)?.remove_attribute(name)
	}

	fn set_style_text(&self, element: &web_sys::Node, css: &str) {
		match Self::style(element) {
			Some(style) => style.set_css_text(css),
			None => error!("Expected a styled element, found {:?}.", element),
		}
	}

	fn set_style_property(&self, element: &web_sys::Node, name: &str, value: &str) -> Result<(), JsValue> {
		Self::style(element)
			.ok_or_else(|| JsValue::from_str("Expected a styled element."))?
			.set_property(name, value)
	}

	fn set_property(&self, element: &web_sys::Node, name: &str, value: &PropValue<Self>) -> Result<(), JsValue> {
		Reflect::set(element, &JsValue::from_str(name), &js_value(value)?).map(drop)
	}

	fn is_native_event(&self, element: &web_sys::Node, on_name: &str) -> bool {
		Reflect::has(element, &JsValue::from_str(on_name)).unwrap_or(false)
	}

	fn set_event_handler(&self, element: &web_sys::Node, event: &str, capture: bool, handler: Option<Handler<Self>>) -> Result<(), JsValue> {
		let element = Self::element(element)?;
		match handler {
			Some(handler) => self.add_listener(element, event, capture, handler),
			None => self.remove_listener(element, event),
		}
	}

	#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
	fn hydration_cursor(&self, element: &web_sys::Node) -> usize {
		self.cursors.get(element.unchecked_ref::<Object>()).as_f64().map_or(0, |cursor| cursor as usize)
	}

	#[allow(clippy::cast_precision_loss)]
	fn set_hydration_cursor(&self, element: &web_sys::Node, cursor: usize) {
		self.cursors.set(element.unchecked_ref::<Object>(), &JsValue::from_f64(cursor as f64));
	}

	fn is_pinned(&self, text: &web_sys::Node) -> bool {
		self.pinned.has(text.unchecked_ref::<Object>())
	}

	fn pin(&self, text: &web_sys::Node) {
		self.pinned.add(text.unchecked_ref::<Object>());
	}
}

impl Debug for WebDom {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("WebDom")
			.field("document", &self.document)
			.field("handler_slots", &self.slots.borrow().len())
			.field("free_slots", &self.free_slots.borrow().len())
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	use super::utf16_offset;

	#[test]
	fn offsets_count_utf16_units() {
		assert_eq!(utf16_offset("abc", 2).ok(), Some(2));
		assert_eq!(utf16_offset("ä😀x", 6).ok(), Some(3));
		assert!(utf16_offset("ä", 1).is_err());
	}
}
