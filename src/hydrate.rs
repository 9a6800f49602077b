//! Adopts existing DOM content by walking it in lockstep with a [`Delta`] tree.
//!
//! Each real parent carries a hydration cursor that counts how many of its filtered children
//! (see [`filtered_child_nodes`]) were consumed so far.
//! The cursor persists, so several `hydrate` calls against the same parent continue where the previous one stopped.
//!
//! Structural mismatches are never fatal:
//! Virtual children without a real counterpart are skipped, and text that differs after trimming is corrected in place.

use crate::{
	arg::{Arg, Func, Props},
	build::tag_of,
	context::Context,
	dom::{filtered_child_nodes, Dom},
	insert::{Current, InsertionPoint, Phase},
	shown,
	tree::{Delta, VNode},
};
use std::rc::Rc;
use tracing::{debug, error, instrument, trace, trace_span, warn};

impl<D: Dom> Context<D> {
	/// Hydrates `root` with `delta` and returns `root`.
	///
	/// `root` should hold markup that building the same arguments would have produced,
	/// possibly with merged text nodes and with extra whitespace-only text nodes.
	///
	/// If `delta` is an element, it's paired with `root` itself.
	/// Fragments, reactive children and the like describe `root`'s children instead.
	/// A lone [`Delta::Text`] is compared with `root` directly if that is a text node.
	#[instrument(skip(self, delta))]
	pub fn hydrate(self: &Rc<Self>, delta: Delta<D>, root: &D::Node) -> D::Node {
		match delta {
			Delta::Node(vnode) => self.hydrate_element(vnode, root),
			Delta::Text(text) if self.dom.is_text(root) => {
				self.dom.pin(root);
				self.reconcile_text(root, &text, None)
			}
			Delta::Fragment(children) => self.hydrate_children(root, children, false),
			delta => self.hydrate_child(root, delta, 1, false),
		}
		root.clone()
	}

	fn hydrate_element(self: &Rc<Self>, vnode: VNode<D>, element: &D::Node) {
		let VNode { tag, props, children, is_svg } = vnode;
		let span = trace_span!("Hydrating element", tag = tag_of(&tag), children = children.len());
		let _enter = span.enter();

		match self.dom.tag_name(element) {
			Some(actual) if !actual.eq_ignore_ascii_case(tag_of(&tag)) => {
				warn!("Expected <{}> but found <{}>. Hydrating it anyway.", tag_of(&tag), actual)
			}
			Some(_) => (),
			None => warn!("Expected <{}> but found {:?}. Hydrating it anyway.", tag_of(&tag), element),
		}

		self.apply_props(element, props, is_svg);
		self.hydrate_children(element, children, is_svg)
	}

	fn hydrate_children(self: &Rc<Self>, parent: &D::Node, children: Vec<Delta<D>>, is_svg: bool) {
		let sibling_count = children.len();
		for child in children {
			self.hydrate_child(parent, child, sibling_count, is_svg)
		}
	}

	/// The node at `parent`'s cursor, if any.
	fn target(&self, parent: &D::Node) -> Option<D::Node> {
		let cursor = self.dom.hydration_cursor(parent);
		filtered_child_nodes(&self.dom, parent).into_iter().nth(cursor)
	}

	fn advance(&self, parent: &D::Node) {
		let cursor = self.dom.hydration_cursor(parent);
		self.dom.set_hydration_cursor(parent, cursor + 1)
	}

	/// `sibling_count` is the length of the virtual child list `delta` is part of.
	fn hydrate_child(self: &Rc<Self>, parent: &D::Node, delta: Delta<D>, sibling_count: usize, is_svg: bool) {
		match delta {
			Delta::Placeholder => match self.target(parent) {
				Some(target) => {
					trace!("Skipping {:?} for placeholder.", target);
					self.advance(parent)
				}
				None => debug!("No real node left for placeholder."),
			},

			Delta::Text(text) => {
				self.hydrate_text(parent, &text, sibling_count);
			}

			Delta::Node(vnode) => match self.target(parent) {
				Some(target) => {
					self.hydrate_element(vnode, &target);
					self.advance(parent)
				}
				None => debug!("No real node left for <{}>. Skipping.", tag_of(&vnode.tag)),
			},

			Delta::Fragment(children) => self.hydrate_children(parent, children, is_svg),

			Delta::Props(props) => self.apply_props(parent, props, is_svg),

			Delta::Reactive(producer) => self.hydrate_reactive(parent, producer, sibling_count, is_svg),
		}
	}

	/// Pairs `text` with the node at the cursor and returns that node if it's a text node.
	fn hydrate_text(&self, parent: &D::Node, text: &str, sibling_count: usize) -> Option<D::Node> {
		let span = trace_span!("Hydrating text", text = shown(text));
		let _enter = span.enter();

		let target = match self.target(parent) {
			Some(target) => target,
			None => {
				debug!("No real node left for text. Skipping.");
				return None;
			}
		};
		self.advance(parent);

		if !self.dom.is_text(&target) {
			warn!("Expected text but found {:?}. Skipping.", target);
			return None;
		}
		self.dom.pin(&target);
		self.reconcile_text(&target, text, Some((parent, sibling_count)));
		Some(target)
	}

	/// Makes `target`'s data match `text` after trimming.
	///
	/// If the real parent has a different number of (filtered) children than the virtual one,
	/// adjacent text was probably merged by the HTML parser, so the remainder is split off into its own node first.
	fn reconcile_text(&self, target: &D::Node, text: &str, siblings: Option<(&D::Node, usize)>) {
		let dom = &self.dom;
		let data = match dom.text_data(target) {
			Some(data) => data,
			None => return error!("Expected text node, found {:?}.", target),
		};
		if data.trim() == text.trim() {
			return trace!("Text matches.");
		}

		if let Some((parent, sibling_count)) = siblings {
			let real_count = filtered_child_nodes(dom, parent).len();
			if sibling_count != real_count {
				match data.find(text).map(|start| start + text.len()) {
					Some(offset) if offset < data.len() => match dom.split_text(target, offset) {
						Ok(tail) => debug!(sibling_count, real_count, "Split merged text at {}; tail is {:?}.", offset, tail),
						Err(error) => error!("Failed to split text at {}: {:?}", offset, error),
					},
					_ => trace!(sibling_count, real_count, "Expected text not found at a splittable offset."),
				}
			}
		}

		let data = dom.text_data(target).unwrap_or_default();
		if data.trim() != text.trim() {
			warn!("Unexpected text data: Expected {:?} but found {:?}. Overwriting.", shown(text), shown(&data));
			dom.set_text_data(target, text)
		}
	}

	fn hydrate_reactive(self: &Rc<Self>, parent: &D::Node, producer: Func<D>, sibling_count: usize, is_svg: bool) {
		let mut point = InsertionPoint::new(parent.clone(), None);
		self.subscribe(move |context| {
			let value = producer(Vec::new());
			if point.hydrated() {
				point.update(context, value)
			} else {
				context.adopt(&mut point, value, sibling_count, is_svg)
			}
		});
	}

	/// The first run of a reactive child: pairs its output with the real content at the cursor,
	/// then inserts a marker behind the consumed nodes.
	#[instrument(skip(self, point, value))]
	fn adopt(self: &Rc<Self>, point: &mut InsertionPoint<D>, value: Arg<D>, sibling_count: usize, is_svg: bool) {
		let dom = &self.dom;
		let parent = point.parent.clone();

		let start = match self.target(&parent) {
			Some(start) => start,
			None => {
				debug!("Nothing to adopt. Creating content instead.");
				let marker = dom.create_text("");
				if let Err(error) = dom.insert_before(&parent, &marker, None) {
					error!("Failed to append marker: {:?}", error)
				}
				point.marker = Some(marker);
				return point.update(self, value);
			}
		};
		let anchor = dom.previous_sibling(&start);
		let cursor = dom.hydration_cursor(&parent);

		point.current = match value.stringable() {
			Some(text) => match self.hydrate_text(&parent, &text, sibling_count) {
				Some(node) => {
					let data = dom.text_data(&node).unwrap_or_default();
					point.prefix = data[..data.len() - data.trim_start().len()].to_owned();
					// As the next update would render an unchanged value.
					let data = format!("{}{}", point.prefix, data.trim());
					Current::Text { node, data }
				}
				None => Current::Nodes,
			},
			None => {
				match self.delta_of(value, is_svg) {
					Delta::Node(vnode) => {
						self.hydrate_element(vnode, &start);
						self.advance(&parent)
					}
					// Arrays continue on the parent's cursor.
					Delta::Fragment(children) => self.hydrate_children(&parent, children, is_svg),
					delta => self.hydrate_child(&parent, delta, sibling_count, is_svg),
				}
				if dom.hydration_cursor(&parent) > cursor {
					Current::Nodes
				} else {
					Current::Empty
				}
			}
		};

		let next = self.target(&parent);
		let marker = dom.create_text("");
		if let Err(error) = dom.insert_before(&parent, &marker, next.as_ref()) {
			error!("Failed to insert marker: {:?}", error)
		}
		point.marker = Some(marker);
		point.anchor = anchor;
		point.phase = Phase::Steady;
	}

	/// Applies each property of `props` to `element`.
	pub fn apply_props(self: &Rc<Self>, element: &D::Node, props: Props<D>, is_svg: bool) {
		for (name, prop) in props.0 {
			self.apply_prop(element, name, prop, is_svg)
		}
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
	fn whitespace_is_tolerated() {
		let cx = context();
		let dom = cx.dom();
		let text = dom.text("Hello");
		let before = dom.mutation_count();
		cx.hydrate(Delta::Text("  Hello  ".to_owned()), &text);
		assert_eq!(dom.mutation_count(), before);
		assert_eq!(dom.text_data(&text).as_deref(), Some("Hello"));

		let text = dom.text("Bye");
		cx.hydrate(Delta::Text("Hi".to_owned()), &text);
		assert_eq!(dom.text_data(&text).as_deref(), Some("Hi"));
	}

	#[test]
	fn merged_text_is_split() {
		let cx = context();
		let dom = cx.dom();
		let p = dom.element("p");
		let merged = dom.text("AB");
		dom.append(&p, &merged).unwrap();

		let delta = cx.tree(vec!["p".into(), "A".into(), "B".into()]);
		cx.hydrate(delta, &p);

		let children = dom.children(&p);
		assert_eq!(children.len(), 2);
		assert_eq!(children[0], merged);
		assert_eq!(dom.text_data(&children[0]).as_deref(), Some("A"));
		assert_eq!(dom.text_data(&children[1]).as_deref(), Some("B"));
	}

	#[test]
	fn whitespace_only_text_is_filtered() {
		let cx = context();
		let dom = cx.dom();
		let ul = dom.element("ul");
		for child in &[dom.text("\n  "), dom.element("li"), dom.text("\n  "), dom.element("li"), dom.text("\n")] {
			dom.append(&ul, child).unwrap();
		}
		let before = dom.mutation_count();
		cx.hydrate(cx.tree(vec!["ul".into(), h!["li"], h!["li"]]), &ul);
		assert_eq!(dom.mutation_count(), before);
		assert_eq!(dom.hydration_cursor(&ul), 2);
	}

	#[test]
	fn missing_real_nodes_are_skipped() {
		let cx = context();
		let dom = cx.dom();
		let div = dom.element("div");
		dom.append(&div, &dom.element("span")).unwrap();

		let before = dom.mutation_count();
		cx.hydrate(cx.tree(vec!["div".into(), h!["span"], h!["b", "missing"], "also missing".into()]), &div);
		assert_eq!(dom.mutation_count(), before);
		assert_eq!(dom.to_html(&div), "<div><span></span></div>");
	}

	#[test]
	fn produced_booleans_take_no_position() {
		let cx = context();
		let dom = cx.dom();
		let div = dom.element("div");
		let kept = dom.text("kept");
		dom.append(&div, &kept).unwrap();

		cx.hydrate(cx.tree(vec!["div".into(), Arg::reactive(|| true.into()), "kept".into()]), &div);
		assert_eq!(dom.to_html(&div), "<div>kept</div>");
		assert_eq!(dom.text_data(&kept).as_deref(), Some("kept"));
		assert!(dom.is_pinned(&kept));
		assert_eq!(dom.hydration_cursor(&div), 1);
	}

	#[test]
	fn placeholder_consumes_one_position() {
		let cx = context();
		let dom = cx.dom();
		let div = dom.element("div");
		let comment_like = dom.element("template");
		let text = dom.text("kept");
		dom.append(&div, &comment_like).unwrap();
		dom.append(&div, &text).unwrap();

		let before = dom.mutation_count();
		cx.hydrate(cx.tree(vec!["div".into(), Arg::Placeholder, "kept".into()]), &div);
		assert_eq!(dom.mutation_count(), before);
		assert_eq!(dom.hydration_cursor(&div), 2);
		assert!(dom.is_pinned(&text));
	}
}
