//! The argument grammar shared by the real-node builder and the virtual tree builder.

use crate::dom::{Dom, Handler};
use core::fmt::{self, Debug, Formatter};
use std::rc::Rc;

/// A function argument.
///
/// Called with the remaining arguments of its build call when it appears before any element was established (a component),
/// otherwise called without arguments whenever its reactive scope runs (a producer).
pub type Func<D> = Rc<dyn Fn(Vec<Arg<D>>) -> Arg<D>>;

/// One positional argument of a build call.
pub enum Arg<D: Dom> {
	/// Contributes nothing.
	Null,
	/// A tag specifier while no element is established, text afterwards.
	Text(String),
	/// Always text.
	Number(f64),
	/// Always text.
	Bool(bool),
	Array(Vec<Arg<D>>),
	/// An already built real node.
	Node(D::Node),
	/// A deferred build call, built by whichever builder encounters it.
	Call(Call<D>),
	Props(Props<D>),
	Function(Func<D>),
	/// Stands in for exactly one real node that isn't described any further.
	Placeholder,
}

/// The argument list of a nested build call, see [`h!`](`crate::h!`) and [`hs!`](`crate::hs!`).
pub struct Call<D: Dom> {
	pub args: Vec<Arg<D>>,
	pub is_svg: bool,
}

impl<D: Dom> Arg<D> {
	#[must_use]
	pub fn node(node: D::Node) -> Self {
		Self::Node(node)
	}

	/// A producer, re-run by the reactive scope it's inserted into.
	#[must_use]
	pub fn reactive(producer: impl 'static + Fn() -> Arg<D>) -> Self {
		Self::Function(Rc::new(move |_| producer()))
	}

	/// A component, which receives the arguments following it.
	#[must_use]
	pub fn component(component: impl 'static + Fn(Vec<Arg<D>>) -> Arg<D>) -> Self {
		Self::Function(Rc::new(component))
	}

	/// Strings and numbers, as the insertion logic treats them as text.
	pub(crate) fn stringable(&self) -> Option<String> {
		match self {
			Arg::Text(text) => Some(text.clone()),
			&Arg::Number(number) => Some(number_text(number)),
			_ => None,
		}
	}
}

/// Whether `args` contains a function at any depth.
///
/// Regions with more than one dynamic child need a marker per child so that each can be replaced independently.
pub fn is_multi_expression<D: Dom>(args: &[Arg<D>]) -> bool {
	args.iter().any(|arg| match arg {
		Arg::Function(_) => true,
		Arg::Array(items) => is_multi_expression(items),
		_ => false,
	})
}

/// Formats `number` the way a document would display it.
#[must_use]
pub fn number_text(number: f64) -> String {
	if number.is_infinite() {
		let text = if number > 0.0 { "Infinity" } else { "-Infinity" };
		text.to_owned()
	} else if number == 0.0 {
		"0".to_owned()
	} else {
		number.to_string()
	}
}

/// An ordered property bag.
pub struct Props<D: Dom>(pub Vec<(String, Prop<D>)>);

pub enum Prop<D: Dom> {
	Static(PropValue<D>),
	/// Re-evaluated and re-applied whenever its reactive scope runs.
	Computed(Rc<dyn Fn() -> PropValue<D>>),
	/// Called once with the element the bag is applied to.
	Ref(Rc<dyn Fn(&D::Node)>),
}

pub enum PropValue<D: Dom> {
	Null,
	Bool(bool),
	Number(f64),
	Str(String),
	/// Only meaningful for `on…` names. Never called during classification.
	Handler(Handler<D>),
	/// For `style` and `attrs`.
	Nested(Props<D>),
}

impl<D: Dom> Props<D> {
	#[must_use]
	pub fn new() -> Self {
		Self(Vec::new())
	}

	#[must_use]
	pub fn with(mut self, name: impl Into<String>, value: impl Into<PropValue<D>>) -> Self {
		self.0.push((name.into(), Prop::Static(value.into())));
		self
	}

	#[must_use]
	pub fn computed<T: Into<PropValue<D>>>(mut self, name: impl Into<String>, compute: impl 'static + Fn() -> T) -> Self {
		self.0.push((name.into(), Prop::Computed(Rc::new(move || compute().into()))));
		self
	}

	/// Adds an `on…` handler. `name` includes the prefix, e.g. `"onclick"` or `"onClickCapture"`.
	#[must_use]
	pub fn handler(mut self, name: impl Into<String>, handler: impl 'static + Fn(&D::Event)) -> Self {
		self.0.push((name.into(), Prop::Static(PropValue::Handler(Rc::new(handler)))));
		self
	}

	#[must_use]
	pub fn reference(mut self, reference: impl 'static + Fn(&D::Node)) -> Self {
		self.0.push(("ref".to_owned(), Prop::Ref(Rc::new(reference))));
		self
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl<D: Dom> PropValue<D> {
	/// The attribute form of this value, if it has one.
	pub fn attribute_text(&self) -> Option<String> {
		match self {
			PropValue::Str(text) => Some(text.clone()),
			&PropValue::Number(number) => Some(number_text(number)),
			&PropValue::Bool(value) => Some(value.to_string()),
			PropValue::Null | PropValue::Handler(_) | PropValue::Nested(_) => None,
		}
	}
}

impl<D: Dom> Default for Props<D> {
	fn default() -> Self {
		Self::new()
	}
}

impl<D: Dom> Clone for Arg<D> {
	fn clone(&self) -> Self {
		match self {
			Arg::Null => Arg::Null,
			Arg::Text(text) => Arg::Text(text.clone()),
			&Arg::Number(number) => Arg::Number(number),
			&Arg::Bool(value) => Arg::Bool(value),
			Arg::Array(items) => Arg::Array(items.clone()),
			Arg::Node(node) => Arg::Node(node.clone()),
			Arg::Call(call) => Arg::Call(call.clone()),
			Arg::Props(props) => Arg::Props(props.clone()),
			Arg::Function(function) => Arg::Function(Rc::clone(function)),
			Arg::Placeholder => Arg::Placeholder,
		}
	}
}

impl<D: Dom> Clone for Call<D> {
	fn clone(&self) -> Self {
		Self {
			args: self.args.clone(),
			is_svg: self.is_svg,
		}
	}
}

impl<D: Dom> Clone for Props<D> {
	fn clone(&self) -> Self {
		Self(self.0.iter().map(|(name, prop)| (name.clone(), prop.clone())).collect())
	}
}

impl<D: Dom> Clone for Prop<D> {
	fn clone(&self) -> Self {
		match self {
			Prop::Static(value) => Prop::Static(value.clone()),
			Prop::Computed(compute) => Prop::Computed(Rc::clone(compute)),
			Prop::Ref(reference) => Prop::Ref(Rc::clone(reference)),
		}
	}
}

impl<D: Dom> Clone for PropValue<D> {
	fn clone(&self) -> Self {
		match self {
			PropValue::Null => PropValue::Null,
			&PropValue::Bool(value) => PropValue::Bool(value),
			&PropValue::Number(number) => PropValue::Number(number),
			PropValue::Str(text) => PropValue::Str(text.clone()),
			PropValue::Handler(handler) => PropValue::Handler(Rc::clone(handler)),
			PropValue::Nested(props) => PropValue::Nested(props.clone()),
		}
	}
}

impl<D: Dom> Debug for Arg<D> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Arg::Null => f.write_str("Null"),
			Arg::Text(text) => f.debug_tuple("Text").field(&crate::shown(text)).finish(),
			Arg::Number(number) => f.debug_tuple("Number").field(number).finish(),
			Arg::Bool(value) => f.debug_tuple("Bool").field(value).finish(),
			Arg::Array(items) => f.debug_tuple("Array").field(items).finish(),
			Arg::Node(node) => f.debug_tuple("Node").field(node).finish(),
			Arg::Call(call) => f.debug_struct("Call").field("args", &call.args).field("is_svg", &call.is_svg).finish(),
			Arg::Props(props) => props.fmt(f),
			Arg::Function(_) => f.write_str("Function"),
			Arg::Placeholder => f.write_str("Placeholder"),
		}
	}
}

impl<D: Dom> Debug for Props<D> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_map()
			.entries(self.0.iter().map(|(name, prop)| {
				(
					name,
					match prop {
						Prop::Static(_) => "static",
						Prop::Computed(_) => "computed",
						Prop::Ref(_) => "ref",
					},
				)
			}))
			.finish()
	}
}

impl<D: Dom> Debug for PropValue<D> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			PropValue::Null => f.write_str("Null"),
			PropValue::Bool(value) => f.debug_tuple("Bool").field(value).finish(),
			PropValue::Number(number) => f.debug_tuple("Number").field(number).finish(),
			PropValue::Str(text) => f.debug_tuple("Str").field(&crate::shown(text)).finish(),
			PropValue::Handler(_) => f.write_str("Handler"),
			PropValue::Nested(props) => f.debug_tuple("Nested").field(props).finish(),
		}
	}
}

impl<D: Dom> From<&str> for Arg<D> {
	fn from(text: &str) -> Self {
		Self::Text(text.to_owned())
	}
}

impl<D: Dom> From<String> for Arg<D> {
	fn from(text: String) -> Self {
		Self::Text(text)
	}
}

macro_rules! number_from {
	($($ty:ty),*) => {$(
		impl<D: Dom> From<$ty> for Arg<D> {
			#[allow(clippy::cast_lossless, clippy::cast_precision_loss)]
			fn from(number: $ty) -> Self {
				Self::Number(number as f64)
			}
		}

		impl<D: Dom> From<$ty> for PropValue<D> {
			#[allow(clippy::cast_lossless, clippy::cast_precision_loss)]
			fn from(number: $ty) -> Self {
				Self::Number(number as f64)
			}
		}
	)*};
}
number_from!(f64, f32, i32, i64, u32, u64, usize);

impl<D: Dom> From<bool> for Arg<D> {
	fn from(value: bool) -> Self {
		Self::Bool(value)
	}
}

impl<D: Dom> From<Vec<Arg<D>>> for Arg<D> {
	fn from(items: Vec<Arg<D>>) -> Self {
		Self::Array(items)
	}
}

impl<D: Dom> From<Call<D>> for Arg<D> {
	fn from(call: Call<D>) -> Self {
		Self::Call(call)
	}
}

impl<D: Dom> From<Props<D>> for Arg<D> {
	fn from(props: Props<D>) -> Self {
		Self::Props(props)
	}
}

impl<D: Dom, T: Into<Arg<D>>> From<Option<T>> for Arg<D> {
	fn from(value: Option<T>) -> Self {
		value.map_or(Self::Null, Into::into)
	}
}

impl<D: Dom> From<&str> for PropValue<D> {
	fn from(text: &str) -> Self {
		Self::Str(text.to_owned())
	}
}

impl<D: Dom> From<String> for PropValue<D> {
	fn from(text: String) -> Self {
		Self::Str(text)
	}
}

impl<D: Dom> From<bool> for PropValue<D> {
	fn from(value: bool) -> Self {
		Self::Bool(value)
	}
}

impl<D: Dom> From<Props<D>> for PropValue<D> {
	fn from(props: Props<D>) -> Self {
		Self::Nested(props)
	}
}

/// Builds an [`Arg::Call`] for an HTML build call.
///
/// ```rust,ignore
/// h!["p.note", "Count: ", Arg::reactive(move || count.get().into())]
/// ```
#[macro_export]
macro_rules! h {
	($($arg:expr),* $(,)?) => {
		$crate::Arg::Call($crate::Call {
			args: vec![$($crate::Arg::from($arg)),*],
			is_svg: false,
		})
	};
}

/// Like [`h!`](`crate::h!`), but elements are created in the SVG namespace.
#[macro_export]
macro_rules! hs {
	($($arg:expr),* $(,)?) => {
		$crate::Arg::Call($crate::Call {
			args: vec![$($crate::Arg::from($arg)),*],
			is_svg: true,
		})
	};
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::memory::MemoryDom;

	#[test]
	fn multi_expression_looks_into_nested_arrays() {
		let flat: Vec<Arg<MemoryDom>> = vec!["div".into(), "text".into()];
		assert!(!is_multi_expression(&flat));

		let nested: Vec<Arg<MemoryDom>> = vec!["div".into(), Arg::Array(vec![Arg::Array(vec![Arg::reactive(|| Arg::Null)])])];
		assert!(is_multi_expression(&nested));
	}

	#[test]
	fn numbers_format_like_text() {
		assert_eq!(number_text(42.0), "42");
		assert_eq!(number_text(1.5), "1.5");
		assert_eq!(number_text(-0.0), "0");
		assert_eq!(number_text(f64::INFINITY), "Infinity");
	}
}
