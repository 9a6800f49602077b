use delta_dom::{h, memory::MemoryDom, Arg, Context, Dom, Func};
use std::{cell::Cell, rc::Rc};

mod manual_reactive_;
use manual_reactive_::ManualReactive;

fn context(reactive: &Rc<ManualReactive>) -> Rc<Context<MemoryDom>> {
	Rc::new(Context::new(MemoryDom::new(), reactive.clone()))
}

#[test]
fn nested_producer_is_replaced_by_text() {
	let reactive = ManualReactive::new();
	let cx = context(&reactive);
	let dom = cx.dom();
	let p = dom.element("p");
	let marker = dom.text("");
	dom.append(&p, &marker).unwrap();

	let outer = Rc::new(Cell::new(false));
	let producer: Func<MemoryDom> = Rc::new({
		let outer = Rc::clone(&outer);
		move |_: Vec<Arg<MemoryDom>>| -> Arg<MemoryDom> {
			if outer.get() {
				"outer".into()
			} else {
				Arg::reactive(|| "inner".into())
			}
		}
	});
	let _dispose = cx.insert(&p, producer, Some(marker));
	assert_eq!(dom.to_html(&p), "<p>inner</p>");
	assert_eq!(reactive.live_subscriptions(), 2);

	outer.set(true);
	reactive.rerun();
	assert_eq!(dom.to_html(&p), "<p>outer</p>");
	assert_eq!(reactive.live_subscriptions(), 1);
	assert_eq!(dom.last_child(&p), Some(marker));
}

#[test]
fn sibling_producers_update_independently() {
	let reactive = ManualReactive::new();
	let cx = context(&reactive);
	let dom = cx.dom();

	let first = Rc::new(Cell::new(1));
	let second = Rc::new(Cell::new(2));
	let p = cx
		.h(vec![
			"p".into(),
			{
				let first = Rc::clone(&first);
				Arg::reactive(move || first.get().into())
			},
			" | ".into(),
			{
				let second = Rc::clone(&second);
				Arg::reactive(move || second.get().into())
			},
		])
		.unwrap();
	assert_eq!(dom.to_html(&p), "<p>1 | 2</p>");
	// Each producer's text is followed by its own marker.
	let children = dom.children(&p);
	assert_eq!(children.len(), 5);
	assert_eq!(dom.text_data(&children[1]).as_deref(), Some(""));
	assert_eq!(dom.text_data(&children[4]).as_deref(), Some(""));
	let second_text = children[3];

	let before = dom.mutation_count();
	first.set(10);
	reactive.rerun();
	assert_eq!(dom.to_html(&p), "<p>10 | 2</p>");
	assert_eq!(dom.mutation_count(), before + 1);
	assert_eq!(dom.children(&p)[3], second_text);
	assert_eq!(dom.text_data(&second_text).as_deref(), Some("2"));
}

#[test]
fn static_children_are_anchored_beside_producers() {
	let reactive = ManualReactive::new();
	let cx = context(&reactive);
	let dom = cx.dom();

	let label = Rc::new(Cell::new("x"));
	let ul = cx
		.h(vec!["ul".into(), h!["li", "static"], {
			let label = Rc::clone(&label);
			Arg::reactive(move || h!["li", label.get()])
		}])
		.unwrap();
	assert_eq!(dom.to_html(&ul), "<ul><li>static</li><li>x</li></ul>");
	let children = dom.children(&ul);
	assert_eq!(children.len(), 4);
	let static_li = children[0];
	assert_eq!(dom.text_data(&children[1]).as_deref(), Some(""));

	label.set("y");
	reactive.rerun();
	assert_eq!(dom.to_html(&ul), "<ul><li>static</li><li>y</li></ul>");
	assert_eq!(dom.first_child(&ul), Some(static_li));
}

#[test]
fn array_items_are_anchored_one_by_one() {
	let reactive = ManualReactive::new();
	let cx = context(&reactive);
	let dom = cx.dom();

	let count = Rc::new(Cell::new(1));
	let div = cx
		.h(vec!["div".into(), Arg::Array(vec!["a".into(), {
			let count = Rc::clone(&count);
			Arg::reactive(move || count.get().into())
		}])])
		.unwrap();
	assert_eq!(dom.to_html(&div), "<div>a1</div>");
	let children = dom.children(&div);
	assert_eq!(children.len(), 3);
	let a = children[0];

	count.set(2);
	reactive.rerun();
	assert_eq!(dom.to_html(&div), "<div>a2</div>");
	assert_eq!(dom.first_child(&div), Some(a));
	assert_eq!(dom.text_data(&a).as_deref(), Some("a"));
}
