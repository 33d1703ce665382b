//! Canonical textual rendering of schema graphs
//!
//! The canonical form is deterministic and collection-independent, which
//! makes it double as the structural fingerprint: two schemas are
//! structurally equal exactly when their canonical forms are byte-equal.
//! Cycles render as `recurse(n)`, counting enclosing by-reference nodes
//! upward from the reference site.

use super::{SchemaCollection, SchemaKey, SchemaNode};

use std::fmt::Write;

pub(crate) fn render(collection: &SchemaCollection, key: SchemaKey) -> String {
	let mut out = String::new();
	let mut stack = Vec::new();
	write_node(&mut out, collection, key, &mut stack);
	out
}

fn write_node(
	out: &mut String,
	collection: &SchemaCollection,
	key: SchemaKey,
	stack: &mut Vec<usize>,
) {
	match &collection[key] {
		SchemaNode::Primitive(p) => out.push_str(p.name()),
		SchemaNode::Empty => out.push_str("empty"),
		SchemaNode::Nullable(inner) => {
			write_node(out, collection, *inner, stack);
			out.push('?');
		}
		SchemaNode::Sequence(element) => {
			out.push('[');
			write_node(out, collection, *element, stack);
			out.push(']');
		}
		SchemaNode::Tuple(elements) => {
			out.push('(');
			for (i, element) in elements.iter().enumerate() {
				if i > 0 {
					out.push(',');
				}
				write_node(out, collection, *element, stack);
			}
			out.push(')');
		}
		SchemaNode::Mapping { key: map_key, value } => {
			out.push('{');
			write_node(out, collection, *map_key, stack);
			out.push_str("->");
			write_node(out, collection, *value, stack);
			out.push('}');
		}
		node @ (SchemaNode::Enum(_) | SchemaNode::Complex(_) | SchemaNode::Union(_)) => {
			if let Some(pos) = stack.iter().rposition(|&idx| idx == key.idx()) {
				let _ = write!(out, "recurse({})", stack.len() - pos);
				return;
			}
			stack.push(key.idx());
			match node {
				SchemaNode::Enum(e) => {
					out.push_str("enum{");
					for (i, member) in e.members.iter().enumerate() {
						if i > 0 {
							out.push(',');
						}
						out.push_str(member);
					}
					out.push('}');
				}
				SchemaNode::Complex(c) => {
					out.push_str("record{");
					for (i, field) in c.fields.iter().enumerate() {
						if i > 0 {
							out.push(',');
						}
						out.push_str(&field.name);
						out.push(':');
						write_node(out, collection, field.schema, stack);
						if field.has_default {
							out.push('*');
						}
					}
					out.push('}');
				}
				SchemaNode::Union(u) => {
					out.push_str("union{");
					for (i, member) in u.members.iter().enumerate() {
						if i > 0 {
							out.push(',');
						}
						out.push_str(&member.name);
						out.push(':');
						write_node(out, collection, member.schema, stack);
					}
					out.push('}');
				}
				_ => unreachable!(),
			}
			stack.pop();
		}
	}
}

#[cfg(test)]
mod tests {
	use {
		super::*,
		crate::schema::{SchemaBuilder, WireSchema},
		std::borrow::Cow,
	};

	#[test]
	fn renders_containers_and_records() {
		struct Point;
		impl WireSchema for Point {
			fn append_schema(builder: &mut SchemaBuilder<'_>) -> SchemaKey {
				builder.complex(|c| {
					c.field::<f64>("Y");
					c.field::<f64>("X");
					c.field_with_default::<Option<String>>("label");
				})
			}
			fn wire_name() -> Cow<'static, str> {
				"Point".into()
			}
			type TypeLookup = Point;
		}
		let mut collection = SchemaCollection::new();
		let key = collection.get_or_add_write_schema::<Vec<Point>>();
		assert_eq!(
			render(&collection, key),
			"[record{label:string?*,X:float64,Y:float64}]"
		);
	}

	#[test]
	fn recursive_records_render_with_recurse() {
		struct Tree;
		impl WireSchema for Tree {
			fn append_schema(builder: &mut SchemaBuilder<'_>) -> SchemaKey {
				builder.complex(|c| {
					c.field::<i32>("value");
					c.field::<Vec<Tree>>("children");
				})
			}
			fn wire_name() -> Cow<'static, str> {
				"Tree".into()
			}
			type TypeLookup = Tree;
		}
		let mut collection = SchemaCollection::new();
		let key = collection.get_or_add_write_schema::<Tree>();
		assert_eq!(
			render(&collection, key),
			"record{children:[recurse(1)],value:int32}"
		);
	}
}
