//! Delta trees: lightweight descriptions of markup that was rendered elsewhere.

use crate::{
	arg::{number_text, Arg, Call, Func, Props},
	context::Context,
	dom::Dom,
	shown,
};
use core::fmt::{self, Debug, Formatter};
use std::{collections::VecDeque, rc::Rc};
use tracing::{instrument, trace};

/// One entry of a delta tree.
pub enum Delta<D: Dom> {
	/// A text node. Its text carries no children by construction.
	Text(String),
	Node(VNode<D>),
	/// Siblings without an element of their own.
	Fragment(Vec<Delta<D>>),
	/// Applied to the enclosing element without consuming a real node.
	Props(Props<D>),
	/// Adopts the real content at its position on its first run and keeps it in sync afterwards.
	Reactive(Func<D>),
	/// Consumes one real node without comparing it.
	Placeholder,
}

/// An element in a delta tree.
pub struct VNode<D: Dom> {
	/// As passed to the builder, i.e. possibly a `tag.class#id` specifier.
	pub tag: String,
	pub props: Props<D>,
	pub children: Vec<Delta<D>>,
	pub is_svg: bool,
}

impl<D: Dom> Context<D> {
	/// Describes the HTML that building `args` would produce, without creating any nodes.
	#[instrument(skip(self, args))]
	pub fn tree(self: &Rc<Self>, args: Vec<Arg<D>>) -> Delta<D> {
		self.build_tree(args, false)
	}

	/// Like [`Context::tree`], but for SVG content.
	#[instrument(skip(self, args))]
	pub fn tree_svg(self: &Rc<Self>, args: Vec<Arg<D>>) -> Delta<D> {
		self.build_tree(args, true)
	}

	pub(crate) fn build_tree(self: &Rc<Self>, args: Vec<Arg<D>>, is_svg: bool) -> Delta<D> {
		let mut builder = TreeBuilder {
			context: self,
			tag: None,
			props: Props::new(),
			children: Vec::new(),
			is_svg,
			rest: args.into(),
		};
		while let Some(arg) = builder.rest.pop_front() {
			builder.item(arg)
		}

		let TreeBuilder { tag, props, mut children, .. } = builder;
		match tag {
			Some(tag) => Delta::Node(VNode { tag, props, children, is_svg }),
			None if children.len() == 1 => children.pop().unwrap_or(Delta::Placeholder),
			None => Delta::Fragment(children),
		}
	}

	/// Describes a single produced value. Unlike [`Context::tree`], strings are always text here.
	pub(crate) fn delta_of(self: &Rc<Self>, value: Arg<D>, is_svg: bool) -> Delta<D> {
		match value {
			// Produced booleans render as nothing, so they don't claim a real node either.
			Arg::Null | Arg::Bool(_) => Delta::Fragment(Vec::new()),
			Arg::Text(text) => Delta::Text(text),
			Arg::Number(number) => Delta::Text(number_text(number)),
			Arg::Array(items) => Delta::Fragment(items.into_iter().map(|item| self.delta_of(item, is_svg)).collect()),
			Arg::Node(node) => {
				trace!("Real node {:?} in delta tree. Treating it as placeholder.", node);
				Delta::Placeholder
			}
			Arg::Call(Call { args, is_svg: call_svg }) => self.build_tree(args, is_svg || call_svg),
			Arg::Props(props) => Delta::Props(props),
			Arg::Function(function) => Delta::Reactive(function),
			Arg::Placeholder => Delta::Placeholder,
		}
	}
}

struct TreeBuilder<'a, D: Dom> {
	context: &'a Rc<Context<D>>,
	tag: Option<String>,
	props: Props<D>,
	children: Vec<Delta<D>>,
	is_svg: bool,
	rest: VecDeque<Arg<D>>,
}

impl<'a, D: Dom> TreeBuilder<'a, D> {
	fn item(&mut self, arg: Arg<D>) {
		match arg {
			Arg::Null => (),
			Arg::Placeholder => self.children.push(Delta::Placeholder),
			Arg::Text(text) => {
				if self.tag.is_some() {
					self.children.push(Delta::Text(text))
				} else {
					trace!(tag = shown(&text), "Established tag.");
					self.tag = Some(text)
				}
			}
			Arg::Number(number) => self.children.push(Delta::Text(number_text(number))),
			Arg::Bool(value) => self.children.push(Delta::Text(value.to_string())),
			Arg::Array(items) => {
				for item in items {
					self.item(item)
				}
			}
			Arg::Node(node) => {
				trace!("Real node {:?} in delta tree. Treating it as placeholder.", node);
				self.children.push(Delta::Placeholder)
			}
			Arg::Call(Call { args, is_svg }) => match self.context.build_tree(args, self.is_svg || is_svg) {
				Delta::Fragment(items) => self.children.extend(items),
				delta => self.children.push(delta),
			},
			Arg::Props(props) => self.props.0.extend(props.0),
			Arg::Function(function) => self.children.push(Delta::Reactive(function)),
		}
	}
}

impl<D: Dom> Debug for Delta<D> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Delta::Text(text) => f.debug_tuple("Text").field(&shown(text)).finish(),
			Delta::Node(node) => node.fmt(f),
			Delta::Fragment(children) => f.debug_tuple("Fragment").field(children).finish(),
			Delta::Props(props) => f.debug_tuple("Props").field(props).finish(),
			Delta::Reactive(_) => f.write_str("Reactive"),
			Delta::Placeholder => f.write_str("Placeholder"),
		}
	}
}

impl<D: Dom> Debug for VNode<D> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("VNode")
			.field("tag", &self.tag)
			.field("props", &self.props)
			.field("children", &self.children)
			.field("is_svg", &self.is_svg)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{arg::Props, context::Static, h, memory::MemoryDom};

	fn context() -> Rc<Context<MemoryDom>> {
		Rc::new(Context::new(MemoryDom::new(), Rc::new(Static)))
	}

	#[test]
	fn element_with_text_props_and_producer() {
		let cx = context();
		let delta = cx.tree(vec![
			"div".into(),
			Props::new().with("id", "main").into(),
			"Hello ".into(),
			Arg::reactive(|| "world".into()),
			Arg::Placeholder,
		]);
		let node = match delta {
			Delta::Node(node) => node,
			other => panic!("expected element, got {:?}", other),
		};
		assert_eq!(node.tag, "div");
		assert_eq!(node.props.len(), 1);
		assert!(matches!(node.children[0], Delta::Text(ref text) if text == "Hello "));
		assert!(matches!(node.children[1], Delta::Reactive(_)));
		assert!(matches!(node.children[2], Delta::Placeholder));
	}

	#[test]
	fn without_tag_collapses() {
		let cx = context();
		assert!(matches!(cx.tree(vec![Arg::Null, h!["p"]]), Delta::Node(_)));
		match cx.tree(vec![h!["p"], h!["p"]]) {
			Delta::Fragment(children) => assert_eq!(children.len(), 2),
			other => panic!("expected fragment, got {:?}", other),
		}
	}

	#[test]
	fn nested_fragments_are_flattened() {
		let cx = context();
		let delta = cx.tree(vec!["ul".into(), Arg::Call(Call { args: vec![h!["li"], h!["li"]], is_svg: false }), h!["li"]]);
		match delta {
			Delta::Node(node) => assert_eq!(node.children.len(), 3),
			other => panic!("expected element, got {:?}", other),
		}
	}

	#[test]
	fn svg_propagates() {
		let cx = context();
		match cx.tree_svg(vec!["svg".into(), h!["circle"]]) {
			Delta::Node(VNode { is_svg, children, .. }) => {
				assert!(is_svg);
				assert!(matches!(children[0], Delta::Node(VNode { is_svg: true, .. })));
			}
			other => panic!("expected element, got {:?}", other),
		}
	}
}
