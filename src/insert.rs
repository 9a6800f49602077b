//! Reactive insertion points: DOM regions kept in sync with a producer's output.

use crate::{
	arg::{Arg, Func},
	context::{Context, Dispose},
	dom::Dom,
	shown,
};
use core::fmt::{self, Debug, Formatter};
use std::rc::Rc;
use tracing::{error, instrument, trace, trace_span, warn};

/// Where an [`InsertionPoint`] is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
	/// The producer hasn't run yet.
	Uninitialized,
	/// The first run created content because there was nothing to adopt.
	Hydrating,
	/// Existing content was adopted, or the point was updated at least once after its first run.
	Steady,
}

pub(crate) enum Current<D: Dom> {
	Empty,
	/// A single text node owned by this point.
	Text { node: D::Node, data: String },
	/// Everything between the anchor and the marker.
	Nodes,
}

/// The state of one dynamic region.
///
/// The region consists of the nodes after `anchor` (or from the start of `parent`) up to (excluding) `marker`.
/// Without a marker, the region is all of `parent`'s content.
pub struct InsertionPoint<D: Dom> {
	pub(crate) parent: D::Node,
	pub(crate) marker: Option<D::Node>,
	pub(crate) anchor: Option<D::Node>,
	pub(crate) current: Current<D>,
	pub(crate) phase: Phase,
	/// Leading whitespace of adopted text, kept for later text updates.
	pub(crate) prefix: String,
	/// The subscription of a producer this point handed its region to.
	nested: Option<Dispose>,
}

impl<D: Dom> InsertionPoint<D> {
	#[must_use]
	pub fn new(parent: D::Node, marker: Option<D::Node>) -> Self {
		Self {
			parent,
			marker,
			anchor: None,
			current: Current::Empty,
			phase: Phase::Uninitialized,
			prefix: String::new(),
			nested: None,
		}
	}

	pub fn phase(&self) -> Phase {
		self.phase
	}

	/// Whether the first run has completed.
	pub fn hydrated(&self) -> bool {
		self.phase != Phase::Uninitialized
	}

	pub fn marker(&self) -> Option<&D::Node> {
		self.marker.as_ref()
	}

	/// Replaces the region's content with `value`.
	#[instrument(skip(self, context))]
	pub fn update(&mut self, context: &Rc<Context<D>>, value: Arg<D>) {
		self.phase = match self.phase {
			Phase::Uninitialized => Phase::Hydrating,
			Phase::Hydrating | Phase::Steady => Phase::Steady,
		};
		let dom = &context.dom;
		if let Some(dispose) = self.nested.take() {
			trace!("Disposing nested producer.");
			dispose()
		}

		if let Some(text) = value.stringable() {
			let text = format!("{}{}", self.prefix, text);
			if let Current::Text { node, data } = &mut self.current {
				if *data != text {
					let span = trace_span!("Updating text", text = shown(&text));
					let _enter = span.enter();
					dom.set_text_data(node, &text);
					*data = text;
				}
				return;
			}

			self.clear(context);
			let node = dom.create_text(&text);
			self.place(context, &node);
			self.current = Current::Text { node, data: text };
			return;
		}

		self.clear(context);
		self.prefix.clear();
		match value {
			Arg::Null | Arg::Bool(_) => trace!("Nothing to insert."),
			Arg::Function(function) => {
				trace!("Handing region over to nested producer.");
				if let Some(marker) = &self.marker {
					self.anchor = dom.previous_sibling(marker);
				}
				let mut nested = InsertionPoint::new(self.parent.clone(), self.marker.clone());
				self.nested = Some(context.subscribe(move |context| nested.update(context, function(Vec::new()))));
				self.current = Current::Nodes;
			}
			Arg::Props(_) | Arg::Placeholder => warn!("Cannot insert {:?}. Ignoring.", value),
			value => {
				if let Some(node) = context.resolve(value, false) {
					self.place(context, &node);
					self.current = Current::Nodes;
				}
			}
		}
	}

	/// Inserts `node` into the (empty) region.
	fn place(&mut self, context: &Context<D>, node: &D::Node) {
		let dom = &context.dom;
		if let Some(marker) = &self.marker {
			self.anchor = dom.previous_sibling(marker);
		} else {
			dom.set_text_content(&self.parent, "");
		}
		if let Err(error) = dom.insert_before(&self.parent, node, self.marker.as_ref()) {
			error!("Failed to insert {:?}: {:?}", node, error)
		}
	}

	/// Removes the region's content.
	fn clear(&mut self, context: &Context<D>) {
		if let Current::Empty = self.current {
			return;
		}
		self.current = Current::Empty;

		let dom = &context.dom;
		let marker = match &self.marker {
			Some(marker) => marker,
			None => return dom.set_text_content(&self.parent, ""),
		};
		while let Some(previous) = dom.previous_sibling(marker) {
			if Some(&previous) == self.anchor.as_ref() {
				break;
			}
			if let Err(error) = dom.remove_child(&self.parent, &previous) {
				error!("Failed to remove {:?}: {:?}", previous, error);
				break;
			}
		}
		self.anchor = None;
	}
}

impl<D: Dom> Debug for Current<D> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Current::Empty => f.write_str("Empty"),
			Current::Text { node, data } => f.debug_struct("Text").field("node", node).field("data", &shown(data)).finish(),
			Current::Nodes => f.write_str("Nodes"),
		}
	}
}

impl<D: Dom> Debug for InsertionPoint<D> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("InsertionPoint")
			.field("parent", &self.parent)
			.field("marker", &self.marker)
			.field("anchor", &self.anchor)
			.field("current", &self.current)
			.field("phase", &self.phase)
			.field("prefix", &shown(&self.prefix))
			.field("nested", &self.nested.is_some())
			.finish()
	}
}

impl<D: Dom> Context<D> {
	/// Keeps the region before `marker` (or all of `parent`'s content) in sync with `producer`.
	#[instrument(skip(self, producer))]
	pub fn insert(self: &Rc<Self>, parent: &D::Node, producer: Func<D>, marker: Option<D::Node>) -> Dispose {
		let mut point = InsertionPoint::new(parent.clone(), marker);
		self.subscribe(move |context| point.update(context, producer(Vec::new())))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{context::Static, h, memory::MemoryDom};

	fn context() -> Rc<Context<MemoryDom>> {
		Rc::new(Context::new(MemoryDom::new(), Rc::new(Static)))
	}

	#[test]
	fn text_is_updated_in_place() {
		let cx = context();
		let dom = cx.dom();
		let parent = dom.element("p");
		let marker = dom.text("");
		dom.append(&parent, &marker).unwrap();

		let mut point = InsertionPoint::new(parent, Some(marker));
		point.update(&cx, "1".into());
		assert_eq!(point.phase(), Phase::Hydrating);
		let text = dom.first_child(&point.parent).unwrap();

		point.update(&cx, 2.into());
		assert_eq!(point.phase(), Phase::Steady);
		assert_eq!(dom.first_child(&point.parent), Some(text));
		assert_eq!(dom.to_html(&point.parent), "<p>2</p>");
	}

	#[test]
	fn nodes_replace_text_and_back() {
		let cx = context();
		let dom = cx.dom();
		let parent = dom.element("div");
		dom.append(&parent, &dom.text("before")).unwrap();
		let marker = dom.text("");
		dom.append(&parent, &marker).unwrap();
		dom.append(&parent, &dom.text("after")).unwrap();

		let mut point = InsertionPoint::new(parent.clone(), Some(marker));
		point.update(&cx, "x".into());
		assert_eq!(dom.to_html(&parent), "<div>beforexafter</div>");

		point.update(&cx, Arg::Array(vec![h!["b", "1"], h!["i", "2"]]));
		assert_eq!(dom.to_html(&parent), "<div>before<b>1</b><i>2</i>after</div>");

		point.update(&cx, Arg::Null);
		assert_eq!(dom.to_html(&parent), "<div>beforeafter</div>");

		point.update(&cx, "y".into());
		assert_eq!(dom.to_html(&parent), "<div>beforeyafter</div>");
	}

	#[test]
	fn without_marker_the_whole_parent_is_the_region() {
		let cx = context();
		let dom = cx.dom();
		let parent = dom.element("span");
		dom.append(&parent, &dom.text("stale")).unwrap();

		let mut point = InsertionPoint::new(parent.clone(), None);
		point.update(&cx, h!["em", "fresh"]);
		assert_eq!(dom.to_html(&parent), "<span><em>fresh</em></span>");
	}
}
