//! An in-process document, for rendering without a browser and for tests.

use crate::{
	arg::PropValue,
	dom::{Dom, Handler},
};
use core::{
	cell::{Cell, RefCell},
	fmt::{self, Debug, Formatter},
};
use hashbrown::HashMap;
use tracing::trace;

/// A handle to a node of a [`MemoryDom`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoryNode(usize);

#[derive(Debug, Clone)]
pub struct MemoryEvent {
	pub name: String,
	pub target: MemoryNode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
	NotAnElement(MemoryNode),
	NotText(MemoryNode),
	NotAChild { parent: MemoryNode, child: MemoryNode },
	/// Would make a node its own ancestor, or give a text node children.
	HierarchyRequest { parent: MemoryNode, child: MemoryNode },
	InvalidOffset(usize),
	Unsupported(&'static str),
}

#[derive(Debug)]
enum Kind {
	Element {
		tag: String,
		is_svg: bool,
		attributes: Vec<(String, String)>,
		properties: Vec<(String, String)>,
		style: Vec<(String, String)>,
	},
	Text(String),
	Fragment,
}

#[derive(Debug)]
struct NodeData {
	kind: Kind,
	parent: Option<usize>,
	children: Vec<usize>,
	cursor: usize,
	pinned: bool,
}

const NATIVE_EVENTS: &[&str] = &[
	"onblur", "onchange", "onclick", "oncontextmenu", "ondblclick", "onfocus", "oninput", "onkeydown", "onkeypress", "onkeyup", "onload",
	"onmousedown", "onmouseenter", "onmouseleave", "onmousemove", "onmouseout", "onmouseover", "onmouseup", "onpointerdown",
	"onpointerup", "onreset", "onscroll", "onsubmit", "ontouchend", "ontouchstart", "onwheel",
];

/// An arena of nodes. Nodes are never freed before the [`MemoryDom`] itself.
#[derive(Default)]
pub struct MemoryDom {
	nodes: RefCell<Vec<NodeData>>,
	handlers: RefCell<HashMap<(usize, String), Handler<MemoryDom>>>,
	listener_registrations: Cell<usize>,
	mutations: Cell<usize>,
}

impl MemoryDom {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	fn alloc(&self, kind: Kind) -> MemoryNode {
		let mut nodes = self.nodes.borrow_mut();
		nodes.push(NodeData {
			kind,
			parent: None,
			children: Vec::new(),
			cursor: 0,
			pinned: false,
		});
		MemoryNode(nodes.len() - 1)
	}

	fn mutated(&self) {
		self.mutations.set(self.mutations.get() + 1)
	}

	/// How often the tree, its text or its attributes were changed so far.
	///
	/// Node creation and the side tables (cursor, pins) don't count.
	pub fn mutation_count(&self) -> usize {
		self.mutations.get()
	}

	/// How often an event listener was registered, as opposed to a handler being replaced.
	pub fn listener_registrations(&self) -> usize {
		self.listener_registrations.get()
	}

	/// Creates an HTML element.
	pub fn element(&self, tag: &str) -> MemoryNode {
		self.alloc(Kind::Element {
			tag: tag.to_owned(),
			is_svg: false,
			attributes: Vec::new(),
			properties: Vec::new(),
			style: Vec::new(),
		})
	}

	pub fn text(&self, data: &str) -> MemoryNode {
		self.alloc(Kind::Text(data.to_owned()))
	}

	pub fn append(&self, parent: &MemoryNode, child: &MemoryNode) -> Result<(), MemoryError> {
		self.insert_before(parent, child, None)
	}

	pub fn children(&self, node: &MemoryNode) -> Vec<MemoryNode> {
		self.nodes.borrow()[node.0].children.iter().copied().map(MemoryNode).collect()
	}

	pub fn attribute(&self, element: &MemoryNode, name: &str) -> Option<String> {
		match &self.nodes.borrow()[element.0].kind {
			Kind::Element { attributes, .. } => lookup(attributes, name),
			_ => None,
		}
	}

	pub fn property(&self, element: &MemoryNode, name: &str) -> Option<String> {
		match &self.nodes.borrow()[element.0].kind {
			Kind::Element { properties, .. } => lookup(properties, name),
			_ => None,
		}
	}

	pub fn style(&self, element: &MemoryNode, name: &str) -> Option<String> {
		match &self.nodes.borrow()[element.0].kind {
			Kind::Element { style, .. } => lookup(style, name),
			_ => None,
		}
	}

	/// Calls the handler for `name` on `target`, if there is one.
	pub fn dispatch(&self, target: &MemoryNode, name: &str) -> bool {
		let handler = self.handlers.borrow().get(&(target.0, name.to_owned())).cloned();
		match handler {
			Some(handler) => {
				handler(&MemoryEvent {
					name: name.to_owned(),
					target: *target,
				});
				true
			}
			None => false,
		}
	}

	/// Serializes `node` as HTML. Attributes appear in insertion order, properties and style properties are omitted.
	pub fn to_html(&self, node: &MemoryNode) -> String {
		let mut html = String::new();
		self.write_html(node.0, &mut html);
		html
	}

	fn write_html(&self, index: usize, html: &mut String) {
		let nodes = self.nodes.borrow();
		let node = &nodes[index];
		match &node.kind {
			Kind::Text(data) => html.push_str(&escape(data, false)),
			Kind::Fragment => (),
			Kind::Element { tag, attributes, .. } => {
				html.push('<');
				html.push_str(tag);
				for (name, value) in attributes {
					html.push_str(&format!(" {}=\"{}\"", name, escape(value, true)));
				}
				html.push('>');
			}
		}
		let children = node.children.clone();
		let closing = match &node.kind {
			Kind::Element { tag, .. } => Some(tag.clone()),
			_ => None,
		};
		drop(nodes);

		for child in children {
			self.write_html(child, html)
		}
		if let Some(tag) = closing {
			html.push_str(&format!("</{}>", tag))
		}
	}

	fn with_element<T>(&self, element: &MemoryNode, f: impl FnOnce(&mut Vec<(String, String)>, &mut Vec<(String, String)>, &mut Vec<(String, String)>) -> T) -> Result<T, MemoryError> {
		match &mut self.nodes.borrow_mut()[element.0].kind {
			Kind::Element { attributes, properties, style, .. } => Ok(f(attributes, properties, style)),
			_ => Err(MemoryError::NotAnElement(*element)),
		}
	}

	fn is_ancestor_or_self(&self, candidate: usize, of: usize) -> bool {
		let nodes = self.nodes.borrow();
		let mut current = Some(of);
		while let Some(index) = current {
			if index == candidate {
				return true;
			}
			current = nodes[index].parent;
		}
		false
	}

	fn detach(&self, child: usize) {
		let mut nodes = self.nodes.borrow_mut();
		if let Some(parent) = nodes[child].parent.take() {
			nodes[parent].children.retain(|&c| c != child);
		}
	}
}

fn lookup(entries: &[(String, String)], name: &str) -> Option<String> {
	entries.iter().find(|(n, _)| n == name).map(|(_, v)| v.clone())
}

fn upsert(entries: &mut Vec<(String, String)>, name: &str, value: &str) {
	match entries.iter_mut().find(|(n, _)| n == name) {
		Some((_, v)) => *v = value.to_owned(),
		None => entries.push((name.to_owned(), value.to_owned())),
	}
}

fn escape(text: &str, attribute: bool) -> String {
	let mut escaped = String::with_capacity(text.len());
	for c in text.chars() {
		match c {
			'&' => escaped.push_str("&amp;"),
			'<' => escaped.push_str("&lt;"),
			'>' => escaped.push_str("&gt;"),
			'"' if attribute => escaped.push_str("&quot;"),
			c => escaped.push(c),
		}
	}
	escaped
}

impl Dom for MemoryDom {
	type Node = MemoryNode;
	type Event = MemoryEvent;
	type Error = MemoryError;

	fn create_element(&self, tag: &str, is_svg: bool) -> Result<MemoryNode, MemoryError> {
		let element = self.element(tag);
		if let Kind::Element { is_svg: svg, .. } = &mut self.nodes.borrow_mut()[element.0].kind {
			*svg = is_svg
		}
		Ok(element)
	}

	fn create_text(&self, data: &str) -> MemoryNode {
		self.text(data)
	}

	fn create_fragment(&self) -> MemoryNode {
		self.alloc(Kind::Fragment)
	}

	fn first_child(&self, node: &MemoryNode) -> Option<MemoryNode> {
		self.nodes.borrow()[node.0].children.first().copied().map(MemoryNode)
	}

	fn last_child(&self, node: &MemoryNode) -> Option<MemoryNode> {
		self.nodes.borrow()[node.0].children.last().copied().map(MemoryNode)
	}

	fn next_sibling(&self, node: &MemoryNode) -> Option<MemoryNode> {
		let nodes = self.nodes.borrow();
		let siblings = &nodes[nodes[node.0].parent?].children;
		let position = siblings.iter().position(|&c| c == node.0)?;
		siblings.get(position + 1).copied().map(MemoryNode)
	}

	fn previous_sibling(&self, node: &MemoryNode) -> Option<MemoryNode> {
		let nodes = self.nodes.borrow();
		let siblings = &nodes[nodes[node.0].parent?].children;
		let position = siblings.iter().position(|&c| c == node.0)?;
		position.checked_sub(1).map(|p| MemoryNode(siblings[p]))
	}

	fn parent_node(&self, node: &MemoryNode) -> Option<MemoryNode> {
		self.nodes.borrow()[node.0].parent.map(MemoryNode)
	}

	fn is_text(&self, node: &MemoryNode) -> bool {
		matches!(self.nodes.borrow()[node.0].kind, Kind::Text(_))
	}

	fn tag_name(&self, node: &MemoryNode) -> Option<String> {
		match &self.nodes.borrow()[node.0].kind {
			Kind::Element { tag, is_svg: false, .. } => Some(tag.to_ascii_uppercase()),
			Kind::Element { tag, is_svg: true, .. } => Some(tag.clone()),
			_ => None,
		}
	}

	fn text_data(&self, node: &MemoryNode) -> Option<String> {
		match &self.nodes.borrow()[node.0].kind {
			Kind::Text(data) => Some(data.clone()),
			_ => None,
		}
	}

	fn set_text_data(&self, node: &MemoryNode, data: &str) {
		if let Kind::Text(current) = &mut self.nodes.borrow_mut()[node.0].kind {
			*current = data.to_owned();
		}
		self.mutated()
	}

	fn split_text(&self, node: &MemoryNode, offset: usize) -> Result<MemoryNode, MemoryError> {
		let tail = {
			let mut nodes = self.nodes.borrow_mut();
			match &mut nodes[node.0].kind {
				Kind::Text(data) if data.is_char_boundary(offset) => data.split_off(offset),
				Kind::Text(_) => return Err(MemoryError::InvalidOffset(offset)),
				_ => return Err(MemoryError::NotText(*node)),
			}
		};
		self.mutated();
		let tail = self.text(&tail);
		if let Some(parent) = self.parent_node(node) {
			let next = self.next_sibling(node);
			self.insert_before(&parent, &tail, next.as_ref())?;
		}
		Ok(tail)
	}

	fn insert_before(&self, parent: &MemoryNode, child: &MemoryNode, reference: Option<&MemoryNode>) -> Result<(), MemoryError> {
		if matches!(self.nodes.borrow()[parent.0].kind, Kind::Text(_)) || self.is_ancestor_or_self(child.0, parent.0) {
			return Err(MemoryError::HierarchyRequest { parent: *parent, child: *child });
		}
		if let Some(reference) = reference {
			if self.nodes.borrow()[reference.0].parent != Some(parent.0) {
				return Err(MemoryError::NotAChild { parent: *parent, child: *reference });
			}
		}

		let moved = if let Kind::Fragment = self.nodes.borrow()[child.0].kind {
			self.children(child).into_iter().map(|c| c.0).collect()
		} else {
			vec![child.0]
		};
		for &index in &moved {
			self.detach(index)
		}

		let mut nodes = self.nodes.borrow_mut();
		let position = match reference {
			Some(reference) => nodes[parent.0].children.iter().position(|&c| c == reference.0).unwrap_or(0),
			None => nodes[parent.0].children.len(),
		};
		for (offset, &index) in moved.iter().enumerate() {
			nodes[index].parent = Some(parent.0);
			nodes[parent.0].children.insert(position + offset, index);
		}
		drop(nodes);
		self.mutated();
		Ok(())
	}

	fn remove_child(&self, parent: &MemoryNode, child: &MemoryNode) -> Result<(), MemoryError> {
		if self.nodes.borrow()[child.0].parent != Some(parent.0) {
			return Err(MemoryError::NotAChild { parent: *parent, child: *child });
		}
		self.detach(child.0);
		self.mutated();
		Ok(())
	}

	fn set_text_content(&self, node: &MemoryNode, text: &str) {
		if let Kind::Text(data) = &mut self.nodes.borrow_mut()[node.0].kind {
			*data = text.to_owned();
		}
		for child in self.children(node) {
			self.detach(child.0)
		}
		if !text.is_empty() && !self.is_text(node) {
			let text = self.text(text);
			let mut nodes = self.nodes.borrow_mut();
			nodes[text.0].parent = Some(node.0);
			nodes[node.0].children.push(text.0);
		}
		self.mutated()
	}

	fn set_class_name(&self, element: &MemoryNode, class: &str, _is_svg: bool) {
		if self.with_element(element, |attributes, _, _| upsert(attributes, "class", class)).is_ok() {
			self.mutated()
		}
	}

	fn set_attribute(&self, element: &MemoryNode, name: &str, value: &str) -> Result<(), MemoryError> {
		self.with_element(element, |attributes, _, _| upsert(attributes, name, value))?;
		self.mutated();
		Ok(())
	}

	fn remove_attribute(&self, element: &MemoryNode, name: &str) -> Result<(), MemoryError> {
		self.with_element(element, |attributes, _, _| attributes.retain(|(n, _)| n != name))?;
		self.mutated();
		Ok(())
	}

	fn set_style_text(&self, element: &MemoryNode, css: &str) {
		let parsed = css
			.split(';')
			.filter_map(|declaration| {
				let (name, value) = declaration.split_once(':')?;
				Some((name.trim().to_owned(), value.trim().to_owned()))
			})
			.collect();
		if self.with_element(element, |_, _, style| *style = parsed).is_ok() {
			self.mutated()
		}
	}

	fn set_style_property(&self, element: &MemoryNode, name: &str, value: &str) -> Result<(), MemoryError> {
		self.with_element(element, |_, _, style| upsert(style, name, value))?;
		self.mutated();
		Ok(())
	}

	fn set_property(&self, element: &MemoryNode, name: &str, value: &PropValue<Self>) -> Result<(), MemoryError> {
		match value {
			PropValue::Handler(_) | PropValue::Nested(_) => Err(MemoryError::Unsupported("only text-like properties are stored")),
			PropValue::Null => {
				self.with_element(element, |_, properties, _| properties.retain(|(n, _)| n != name))?;
				self.mutated();
				Ok(())
			}
			value => {
				let text = value.attribute_text().unwrap_or_default();
				self.with_element(element, |_, properties, _| upsert(properties, name, &text))?;
				self.mutated();
				Ok(())
			}
		}
	}

	fn is_native_event(&self, _element: &MemoryNode, on_name: &str) -> bool {
		NATIVE_EVENTS.contains(&on_name)
	}

	fn set_event_handler(&self, element: &MemoryNode, event: &str, _capture: bool, handler: Option<Handler<Self>>) -> Result<(), MemoryError> {
		let key = (element.0, event.to_owned());
		let mut handlers = self.handlers.borrow_mut();
		match handler {
			Some(handler) => {
				if handlers.insert(key, handler).is_none() {
					trace!("Registered listener for {:?}.", event);
					self.listener_registrations.set(self.listener_registrations.get() + 1)
				}
			}
			None => {
				handlers.remove(&key);
			}
		}
		Ok(())
	}

	fn hydration_cursor(&self, element: &MemoryNode) -> usize {
		self.nodes.borrow()[element.0].cursor
	}

	fn set_hydration_cursor(&self, element: &MemoryNode, cursor: usize) {
		self.nodes.borrow_mut()[element.0].cursor = cursor
	}

	fn is_pinned(&self, text: &MemoryNode) -> bool {
		self.nodes.borrow()[text.0].pinned
	}

	fn pin(&self, text: &MemoryNode) {
		self.nodes.borrow_mut()[text.0].pinned = true
	}
}

impl Debug for MemoryDom {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("MemoryDom")
			.field("nodes", &self.nodes.borrow().len())
			.field("handlers", &self.handlers.borrow().len())
			.field("mutations", &self.mutations.get())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn fragments_move_their_children() {
		let dom = MemoryDom::new();
		let div = dom.element("div");
		let fragment = dom.create_fragment();
		dom.append(&fragment, &dom.text("a")).unwrap();
		dom.append(&fragment, &dom.element("br")).unwrap();
		dom.append(&div, &fragment).unwrap();
		assert_eq!(dom.to_html(&div), "<div>a<br></br></div>");
		assert!(dom.first_child(&fragment).is_none());
	}

	#[test]
	fn split_keeps_the_head() {
		let dom = MemoryDom::new();
		let p = dom.element("p");
		let text = dom.text("héllo");
		dom.append(&p, &text).unwrap();
		let tail = dom.split_text(&text, 3).unwrap();
		assert_eq!(dom.text_data(&text).as_deref(), Some("hé"));
		assert_eq!(dom.next_sibling(&text), Some(tail));
		assert_eq!(dom.split_text(&text, 2), Err(MemoryError::InvalidOffset(2)));
	}

	#[test]
	fn cycles_are_rejected() {
		let dom = MemoryDom::new();
		let outer = dom.element("div");
		let inner = dom.element("div");
		dom.append(&outer, &inner).unwrap();
		assert!(dom.append(&inner, &outer).is_err());
	}
}
