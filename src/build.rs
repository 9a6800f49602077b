//! Builds real nodes from argument lists.

use crate::{
	arg::{is_multi_expression, number_text, Arg, Call},
	context::Context,
	dom::Dom,
	insert::InsertionPoint,
	shown,
};
use std::{collections::VecDeque, rc::Rc};
use tracing::{error, instrument, trace, trace_span, warn};

impl<D: Dom> Context<D> {
	/// Builds HTML from `args` and returns the established node, if any.
	#[instrument(skip(self, args))]
	pub fn h(self: &Rc<Self>, args: Vec<Arg<D>>) -> Option<D::Node> {
		self.build(args, false)
	}

	/// Like [`Context::h`], but creates elements in the SVG namespace.
	#[instrument(skip(self, args))]
	pub fn hs(self: &Rc<Self>, args: Vec<Arg<D>>) -> Option<D::Node> {
		self.build(args, true)
	}

	pub(crate) fn build(self: &Rc<Self>, args: Vec<Arg<D>>, is_svg: bool) -> Option<D::Node> {
		let mut builder = Builder {
			context: self,
			el: None,
			multi: is_multi_expression(&args),
			is_svg,
			rest: args.into(),
		};
		while let Some(arg) = builder.rest.pop_front() {
			builder.item(arg)
		}
		builder.el
	}

	/// Turns a single value into one real node (a fragment for arrays), without parsing tag specifiers.
	pub(crate) fn resolve(self: &Rc<Self>, value: Arg<D>, is_svg: bool) -> Option<D::Node> {
		match value {
			Arg::Null | Arg::Placeholder => None,
			Arg::Text(text) => Some(self.dom.create_text(&text)),
			Arg::Number(number) => Some(self.dom.create_text(&number_text(number))),
			Arg::Bool(value) => Some(self.dom.create_text(&value.to_string())),
			Arg::Node(node) => Some(node),
			Arg::Call(Call { args, is_svg: call_svg }) => self.build(args, is_svg || call_svg),
			Arg::Array(items) => {
				let fragment = self.dom.create_fragment();
				let mut builder = Builder {
					context: self,
					el: Some(fragment.clone()),
					multi: is_multi_expression(&items),
					is_svg,
					rest: VecDeque::new(),
				};
				for item in items {
					builder.item(item)
				}
				Some(fragment)
			}
			Arg::Function(function) => self.resolve(function(Vec::new()), is_svg),
			Arg::Props(props) => {
				warn!("Property bag {:?} without an element to apply it to. Ignoring.", props);
				None
			}
		}
	}

	fn append(&self, parent: &D::Node, child: &D::Node) {
		if let Err(error) = self.dom.insert_before(parent, child, None) {
			error!("Failed to append {:?} to {:?}: {:?}", child, parent, error)
		}
	}

	fn append_text(&self, parent: &D::Node, text: &str) {
		let text = self.dom.create_text(text);
		self.append(parent, &text)
	}

	fn append_marker(&self, parent: &D::Node) -> D::Node {
		let marker = self.dom.create_text("");
		self.append(parent, &marker);
		marker
	}
}

/// The state of one build call.
struct Builder<'a, D: Dom> {
	context: &'a Rc<Context<D>>,
	el: Option<D::Node>,
	multi: bool,
	is_svg: bool,
	/// Not yet consumed arguments, handed to components.
	rest: VecDeque<Arg<D>>,
}

impl<'a, D: Dom> Builder<'a, D> {
	fn target(&mut self) -> D::Node {
		let dom = &self.context.dom;
		self.el.get_or_insert_with(|| dom.create_fragment()).clone()
	}

	fn item(&mut self, arg: Arg<D>) {
		let context = self.context;
		match arg {
			Arg::Null | Arg::Placeholder => (),

			Arg::Text(text) => match &self.el {
				Some(el) => context.append_text(el, &text),
				None => {
					let span = trace_span!("Parsing tag specifier", specifier = shown(&text));
					let _enter = span.enter();
					self.el = parse_class(&context.dom, &text, self.is_svg)
				}
			},

			Arg::Number(number) => {
				let target = self.target();
				context.append_text(&target, &number_text(number))
			}
			Arg::Bool(value) => {
				let target = self.target();
				context.append_text(&target, &value.to_string())
			}

			Arg::Array(items) => {
				let target = self.target();
				if self.multi {
					for item in items {
						self.item(item)
					}
				} else if let Some(block) = context.resolve(Arg::Array(items), self.is_svg) {
					trace!("Appending array as one block.");
					context.append(&target, &block)
				}
			}

			Arg::Node(node) => self.child(node),
			Arg::Call(Call { args, is_svg }) => {
				if let Some(node) = context.build(args, self.is_svg || is_svg) {
					self.child(node)
				}
			}

			Arg::Props(props) => match &self.el {
				Some(el) => context.apply_props(el, props, self.is_svg),
				None => warn!("Property bag {:?} before any element was established. Ignoring.", props),
			},

			Arg::Function(function) => match self.el.clone() {
				Some(el) => {
					let marker = if self.multi { Some(context.append_marker(&el)) } else { None };
					context.insert(&el, function, marker);
				}
				None => {
					let rest = self.rest.drain(..).collect();
					trace!("Calling component.");
					self.el = context.resolve(function(rest), self.is_svg);
				}
			},
		}
	}

	fn child(&mut self, node: D::Node) {
		let context = self.context;
		match self.el.clone() {
			None => self.el = Some(node),
			Some(el) if self.multi => {
				let marker = context.append_marker(&el);
				InsertionPoint::new(el, Some(marker)).update(context, Arg::Node(node))
			}
			Some(el) => context.append(&el, &node),
		}
	}
}

/// The tag name part of a `tag.class#id` specifier.
#[must_use]
pub fn tag_of(specifier: &str) -> &str {
	let end = specifier.find(|c: char| c == '.' || c == '#' || c.is_whitespace()).unwrap_or_else(|| specifier.len());
	match &specifier[..end] {
		"" => "div",
		tag => tag,
	}
}

/// Creates an element from a `tag.class#id` specifier.
///
/// The tag defaults to `div`. CSS escapes are not supported.
pub fn parse_class<D: Dom>(dom: &D, specifier: &str, is_svg: bool) -> Option<D::Node> {
	let mut classes = Vec::new();
	let mut id = None;
	let mut token = String::new();
	let mut tokens = Vec::new();
	for c in specifier.chars() {
		if c == '.' || c == '#' || c.is_whitespace() {
			tokens.push(core::mem::take(&mut token));
		}
		if !c.is_whitespace() {
			token.push(c)
		}
	}
	tokens.push(token);

	for token in tokens {
		if let Some(class) = token.strip_prefix('.') {
			if !class.is_empty() {
				classes.push(class.to_owned())
			}
		} else if let Some(value) = token.strip_prefix('#') {
			if !value.is_empty() {
				id = Some(value.to_owned())
			}
		}
	}

	let tag = tag_of(specifier);
	let element = match dom.create_element(tag, is_svg) {
		Ok(element) => element,
		Err(error) => {
			error!("Failed to create <{}>: {:?}", tag, error);
			return None;
		}
	};
	if !classes.is_empty() {
		dom.set_class_name(&element, &classes.join(" "), is_svg)
	}
	if let Some(id) = id {
		if let Err(error) = dom.set_attribute(&element, "id", &id) {
			error!("Failed to set id {:?}: {:?}", id, error)
		}
	}
	Some(element)
}
