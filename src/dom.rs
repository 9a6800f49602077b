//! The real tree that delta trees are hydrated against.

use crate::arg::PropValue;
use core::fmt::Debug;
use std::rc::Rc;

/// An event handler as stored in a [`Dom`]'s handler table.
pub type Handler<D> = Rc<dyn Fn(&<D as Dom>::Event)>;

/// A document implementation: node handles plus the handful of operations hydration and insertion need.
///
/// Text offsets are byte offsets into the Rust [`String`] returned by [`Dom::text_data`].
/// Implementations convert them as needed, e.g. to UTF-16 code units.
///
/// # Side tables
///
/// The hydration cursor, the no-skip ("pinned") flag and the event handler table are per-node annotations.
/// Implementations should keep them out of band (i.e. not as visible properties on the nodes),
/// and release them together with the node.
pub trait Dom: Sized + 'static {
	type Node: Clone + PartialEq + Debug + 'static;
	type Event: 'static;
	type Error: Debug;

	fn create_element(&self, tag: &str, is_svg: bool) -> Result<Self::Node, Self::Error>;
	fn create_text(&self, data: &str) -> Self::Node;
	fn create_fragment(&self) -> Self::Node;

	fn first_child(&self, node: &Self::Node) -> Option<Self::Node>;
	fn last_child(&self, node: &Self::Node) -> Option<Self::Node>;
	fn next_sibling(&self, node: &Self::Node) -> Option<Self::Node>;
	fn previous_sibling(&self, node: &Self::Node) -> Option<Self::Node>;
	fn parent_node(&self, node: &Self::Node) -> Option<Self::Node>;

	fn is_text(&self, node: &Self::Node) -> bool;
	/// The element's tag name as reported by the document, or [`None`] for non-elements.
	fn tag_name(&self, node: &Self::Node) -> Option<String>;
	/// [`Some`] iff `node` is a text node.
	fn text_data(&self, node: &Self::Node) -> Option<String>;
	fn set_text_data(&self, node: &Self::Node, data: &str);
	/// Splits the text node at `offset` (in bytes), keeping the head in `node` and returning the new tail node,
	/// which is inserted as `node`'s next sibling.
	fn split_text(&self, node: &Self::Node, offset: usize) -> Result<Self::Node, Self::Error>;

	/// Moves `child` into `parent` before `reference`, or to the end if `reference` is [`None`].
	///
	/// Inserting a fragment moves its children instead.
	fn insert_before(&self, parent: &Self::Node, child: &Self::Node, reference: Option<&Self::Node>) -> Result<(), Self::Error>;
	fn remove_child(&self, parent: &Self::Node, child: &Self::Node) -> Result<(), Self::Error>;
	fn set_text_content(&self, node: &Self::Node, text: &str);

	fn set_class_name(&self, element: &Self::Node, class: &str, is_svg: bool);
	fn set_attribute(&self, element: &Self::Node, name: &str, value: &str) -> Result<(), Self::Error>;
	fn remove_attribute(&self, element: &Self::Node, name: &str) -> Result<(), Self::Error>;
	fn set_style_text(&self, element: &Self::Node, css: &str);
	fn set_style_property(&self, element: &Self::Node, name: &str, value: &str) -> Result<(), Self::Error>;
	/// Assigns an arbitrary property (not attribute) on `element`.
	fn set_property(&self, element: &Self::Node, name: &str, value: &PropValue<Self>) -> Result<(), Self::Error>;

	/// Whether `element` knows the lowercase `on…` property `on_name`.
	fn is_native_event(&self, element: &Self::Node, on_name: &str) -> bool;
	/// Installs, replaces or (with [`None`]) removes the handler for `event` on `element`.
	///
	/// Each (element, event) pair has at most one listener registered with the document.
	/// Replacing a handler must only swap the stored reference.
	fn set_event_handler(&self, element: &Self::Node, event: &str, capture: bool, handler: Option<Handler<Self>>) -> Result<(), Self::Error>;

	fn hydration_cursor(&self, element: &Self::Node) -> usize;
	fn set_hydration_cursor(&self, element: &Self::Node, cursor: usize);
	/// Whether `text` was marked as significant, so that it's not filtered out even if it's whitespace-only.
	fn is_pinned(&self, text: &Self::Node) -> bool;
	fn pin(&self, text: &Self::Node);
}

/// Children of `parent`, without whitespace-only text nodes that weren't [pinned](`Dom::pin`).
pub fn filtered_child_nodes<D: Dom>(dom: &D, parent: &D::Node) -> Vec<D::Node> {
	let mut filtered = Vec::new();
	let mut next = dom.first_child(parent);
	while let Some(node) = next {
		next = dom.next_sibling(&node);
		let keep = match dom.text_data(&node) {
			Some(data) => !data.trim().is_empty() || dom.is_pinned(&node),
			None => true,
		};
		if keep {
			filtered.push(node)
		}
	}
	filtered
}
