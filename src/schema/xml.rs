//! The canonical XML interchange form of schema graphs
//!
//! One element per variant. By-reference definitions carry an `Id` attribute
//! at their first occurrence; every later occurrence is an empty element with
//! a `Contract="#id"` attribute. Reading allocates all nodes first and binds
//! `Contract` references in a deferred second pass, so forward references
//! are legal. Writing renumbers ids in document order, which makes the output
//! canonical: structurally equal schemas produce identical XML.

use super::{
	ascii_ci_cmp, ascii_ci_eq, canonical_form, ComplexSchema, EnumSchema, FieldSchema, Primitive,
	SchemaCollection, SchemaError, SchemaKey, SchemaNode, UnionMember, UnionSchema,
};

use std::{borrow::Cow, collections::HashMap, fmt::Write};

const REMAP_BIT: usize = 1usize << (usize::BITS - 1);

impl SchemaCollection {
	/// Serialize the graph rooted at `root` to the canonical XML form
	pub fn to_xml(&self, root: SchemaKey) -> String {
		let mut writer = XmlWriter {
			collection: self,
			out: String::new(),
			doc_ids: HashMap::new(),
			next_doc_id: 0,
		};
		writer.write_node(root, 0);
		writer.out
	}

	/// Parse the canonical XML form produced by [`to_xml`](Self::to_xml)
	///
	/// Returns the collection holding the graph together with its root key.
	pub fn from_xml(xml: &str) -> Result<(SchemaCollection, SchemaKey), SchemaError> {
		let doc = roxmltree::Document::parse(xml)?;
		let mut collection = SchemaCollection::new();
		let mut ids = HashMap::new();
		let mut unresolved = Vec::new();
		let root = parse_node(
			doc.root_element(),
			&mut collection,
			&mut ids,
			&mut unresolved,
		)?;

		// Deferred bind: now that every definition is allocated, replace the
		// remap sentinels with real keys
		let resolved = unresolved
			.iter()
			.map(|(id, referring): &(String, String)| {
				let &target = ids
					.get(id)
					.ok_or_else(|| SchemaError::UnresolvedReference(id.clone()))?;
				let actual = collection[target].element_name();
				if actual != referring {
					return Err(SchemaError::ReferenceKindMismatch {
						id: id.clone(),
						expected: referring.clone(),
						actual,
					});
				}
				Ok(target)
			})
			.collect::<Result<Vec<SchemaKey>, SchemaError>>()?;
		let remap = |key: &mut SchemaKey| {
			if key.idx() & REMAP_BIT != 0 {
				*key = resolved[key.idx() & !REMAP_BIT];
			}
		};
		for node in &mut collection.nodes {
			match node {
				SchemaNode::Primitive(_) | SchemaNode::Empty => {}
				SchemaNode::Nullable(inner) => remap(inner),
				SchemaNode::Sequence(element) => remap(element),
				SchemaNode::Tuple(elements) => elements.iter_mut().for_each(remap),
				SchemaNode::Mapping { key, value } => {
					remap(key);
					remap(value);
				}
				SchemaNode::Enum(_) => {}
				SchemaNode::Complex(c) => c.fields.iter_mut().for_each(|f| remap(&mut f.schema)),
				SchemaNode::Union(u) => u.members.iter_mut().for_each(|m| remap(&mut m.schema)),
			}
		}
		let mut root = root;
		remap(&mut root);

		// Register loaded shapes in the dedup tables so later derivation into
		// this collection reuses them
		for idx in 0..collection.nodes.len() {
			let key = SchemaKey::from_idx(idx);
			if collection.nodes[idx].is_by_ref() {
				if let Some(id) = collection.nodes[idx].id() {
					let id = id.to_owned();
					collection.note_used_id(&id);
				}
				let form = canonical_form::render(&collection, key);
				collection.interned.entry(form).or_insert(key);
			}
		}
		Ok((collection, root))
	}
}

struct XmlWriter<'c> {
	collection: &'c SchemaCollection,
	out: String,
	/// Document-order renumbering of by-reference ids
	doc_ids: HashMap<usize, String>,
	next_doc_id: u32,
}

impl XmlWriter<'_> {
	fn indent(&mut self, depth: usize) {
		for _ in 0..depth {
			self.out.push_str("  ");
		}
	}

	fn write_node(&mut self, key: SchemaKey, depth: usize) {
		let node = &self.collection[key];
		self.indent(depth);
		match node {
			SchemaNode::Primitive(p) => {
				let _ = writeln!(self.out, "<Primitive Kind=\"{}\"/>", p.name());
			}
			SchemaNode::Empty => self.out.push_str("<Empty/>\n"),
			SchemaNode::Nullable(inner) => {
				let inner = *inner;
				self.out.push_str("<Nullable>\n");
				self.write_node(inner, depth + 1);
				self.close("Nullable", depth);
			}
			SchemaNode::Sequence(element) => {
				let element = *element;
				self.out.push_str("<List>\n");
				self.write_node(element, depth + 1);
				self.close("List", depth);
			}
			SchemaNode::Tuple(elements) => {
				let elements = elements.clone();
				self.out.push_str("<Tuple>\n");
				for element in elements {
					self.write_node(element, depth + 1);
				}
				self.close("Tuple", depth);
			}
			SchemaNode::Mapping { key: mk, value } => {
				let (mk, value) = (*mk, *value);
				self.out.push_str("<Dictionary>\n");
				self.write_node(mk, depth + 1);
				self.write_node(value, depth + 1);
				self.close("Dictionary", depth);
			}
			by_ref @ (SchemaNode::Enum(_) | SchemaNode::Complex(_) | SchemaNode::Union(_)) => {
				let element = by_ref.element_name();
				if let Some(doc_id) = self.doc_ids.get(&key.idx()) {
					let _ = writeln!(self.out, "<{} Contract=\"#{}\"/>", element, doc_id);
					return;
				}
				self.next_doc_id += 1;
				let doc_id = format!("c{}", self.next_doc_id);
				// Assigned before the body so self-references inside it
				// resolve to this definition
				self.doc_ids.insert(key.idx(), doc_id.clone());
				match by_ref {
					SchemaNode::Enum(e) => {
						let members = e.members.clone();
						let _ = writeln!(self.out, "<Enum Id=\"{}\">", doc_id);
						for member in members {
							self.indent(depth + 1);
							let _ =
								writeln!(self.out, "<Member Name=\"{}\"/>", escape(&member));
						}
						self.close("Enum", depth);
					}
					SchemaNode::Complex(c) => {
						let fields = c.fields.clone();
						let _ = writeln!(self.out, "<Complex Id=\"{}\">", doc_id);
						for field in fields {
							self.indent(depth + 1);
							let default_attr = if field.has_default {
								" HasDefault=\"true\""
							} else {
								""
							};
							let _ = writeln!(
								self.out,
								"<Field Name=\"{}\"{}>",
								escape(&field.name),
								default_attr
							);
							self.write_node(field.schema, depth + 2);
							self.close("Field", depth + 1);
						}
						self.close("Complex", depth);
					}
					SchemaNode::Union(u) => {
						let members = u.members.clone();
						let _ = writeln!(self.out, "<Union Id=\"{}\">", doc_id);
						for member in members {
							self.indent(depth + 1);
							let _ =
								writeln!(self.out, "<Member Name=\"{}\">", escape(&member.name));
							self.write_node(member.schema, depth + 2);
							self.close("Member", depth + 1);
						}
						self.close("Union", depth);
					}
					_ => unreachable!(),
				}
			}
		}
	}

	fn close(&mut self, element: &str, depth: usize) {
		self.indent(depth);
		let _ = writeln!(self.out, "</{}>", element);
	}
}

fn escape(s: &str) -> Cow<'_, str> {
	if !s.contains(['&', '<', '>', '"']) {
		return Cow::Borrowed(s);
	}
	let mut escaped = String::with_capacity(s.len() + 8);
	for c in s.chars() {
		match c {
			'&' => escaped.push_str("&amp;"),
			'<' => escaped.push_str("&lt;"),
			'>' => escaped.push_str("&gt;"),
			'"' => escaped.push_str("&quot;"),
			other => escaped.push(other),
		}
	}
	Cow::Owned(escaped)
}

fn parse_node(
	elem: roxmltree::Node<'_, '_>,
	collection: &mut SchemaCollection,
	ids: &mut HashMap<String, SchemaKey>,
	unresolved: &mut Vec<(String, String)>,
) -> Result<SchemaKey, SchemaError> {
	let element = elem.tag_name().name();
	if let Some(contract) = elem.attribute("Contract") {
		let id = contract.strip_prefix('#').unwrap_or(contract).to_owned();
		let sentinel = SchemaKey::from_idx(REMAP_BIT | unresolved.len());
		unresolved.push((id, element.to_owned()));
		return Ok(sentinel);
	}

	let key = collection.reserve_slot();
	if let Some(id) = elem.attribute("Id") {
		if ids.insert(id.to_owned(), key).is_some() {
			return Err(SchemaError::DuplicateId(id.to_owned()));
		}
	}

	let node = match element {
		"Primitive" => {
			let kind = require_attribute(elem, "Primitive", "Kind")?;
			let kind = Primitive::from_name(kind)
				.ok_or_else(|| SchemaError::UnknownPrimitive(kind.to_owned()))?;
			SchemaNode::Primitive(kind)
		}
		"Empty" => SchemaNode::Empty,
		"Nullable" => SchemaNode::Nullable(single_child(elem, "Nullable", collection, ids, unresolved)?),
		"List" => SchemaNode::Sequence(single_child(elem, "List", collection, ids, unresolved)?),
		"Tuple" => SchemaNode::Tuple(
			child_elements(elem)
				.map(|child| parse_node(child, collection, ids, unresolved))
				.collect::<Result<_, _>>()?,
		),
		"Dictionary" => {
			let children: Vec<_> = child_elements(elem).collect();
			if children.len() != 2 {
				return Err(SchemaError::WrongChildCount {
					element: "Dictionary",
					expected: 2,
					found: children.len(),
				});
			}
			SchemaNode::Mapping {
				key: parse_node(children[0], collection, ids, unresolved)?,
				value: parse_node(children[1], collection, ids, unresolved)?,
			}
		}
		"Enum" => {
			let mut members = Vec::new();
			for child in child_elements(elem) {
				members.push(require_attribute(child, "Member", "Name")?.to_owned());
			}
			let mut sorted: Vec<&String> = members.iter().collect();
			sorted.sort_by(|a, b| ascii_ci_cmp(a, b));
			if let Some(dup) = sorted.windows(2).find(|w| ascii_ci_eq(w[0], w[1])) {
				return Err(SchemaError::DuplicateMember(dup[1].clone()));
			}
			let id = elem
				.attribute("Id")
				.map(str::to_owned)
				.unwrap_or_else(|| collection.fresh_id());
			SchemaNode::Enum(EnumSchema { id, members })
		}
		"Complex" => {
			let mut fields = Vec::new();
			for child in child_elements(elem) {
				let name = require_attribute(child, "Field", "Name")?.to_owned();
				let has_default = child.attribute("HasDefault") == Some("true");
				let schema = single_child(child, "Field", collection, ids, unresolved)?;
				fields.push(FieldSchema {
					name,
					schema,
					has_default,
				});
			}
			fields.sort_by(|a, b| ascii_ci_cmp(&a.name, &b.name));
			if let Some(dup) = fields.windows(2).find(|w| ascii_ci_eq(&w[0].name, &w[1].name)) {
				return Err(SchemaError::DuplicateField(dup[1].name.clone()));
			}
			let id = elem
				.attribute("Id")
				.map(str::to_owned)
				.unwrap_or_else(|| collection.fresh_id());
			SchemaNode::Complex(ComplexSchema { id, fields })
		}
		"Union" => {
			let mut members = Vec::new();
			for child in child_elements(elem) {
				let name = require_attribute(child, "Member", "Name")?.to_owned();
				let schema = single_child(child, "Member", collection, ids, unresolved)?;
				members.push(UnionMember {
					name,
					variant: None,
					schema,
				});
			}
			members.sort_by(|a, b| ascii_ci_cmp(&a.name, &b.name));
			if let Some(dup) = members
				.windows(2)
				.find(|w| ascii_ci_eq(&w[0].name, &w[1].name))
			{
				return Err(SchemaError::DuplicateMember(dup[1].name.clone()));
			}
			let id = elem
				.attribute("Id")
				.map(str::to_owned)
				.unwrap_or_else(|| collection.fresh_id());
			SchemaNode::Union(UnionSchema { id, members })
		}
		other => return Err(SchemaError::UnknownElement(other.to_owned())),
	};
	collection.fill_slot(key, node);
	Ok(key)
}

fn child_elements<'a, 'input>(
	elem: roxmltree::Node<'a, 'input>,
) -> impl Iterator<Item = roxmltree::Node<'a, 'input>> {
	elem.children().filter(|n| n.is_element())
}

fn single_child(
	elem: roxmltree::Node<'_, '_>,
	element: &'static str,
	collection: &mut SchemaCollection,
	ids: &mut HashMap<String, SchemaKey>,
	unresolved: &mut Vec<(String, String)>,
) -> Result<SchemaKey, SchemaError> {
	let children: Vec<_> = child_elements(elem).collect();
	if children.len() != 1 {
		return Err(SchemaError::WrongChildCount {
			element,
			expected: 1,
			found: children.len(),
		});
	}
	parse_node(children[0], collection, ids, unresolved)
}

fn require_attribute<'a>(
	elem: roxmltree::Node<'a, '_>,
	element: &'static str,
	attribute: &'static str,
) -> Result<&'a str, SchemaError> {
	elem.attribute(attribute).ok_or(SchemaError::MissingAttribute {
		element,
		attribute,
	})
}

#[cfg(test)]
mod tests {
	use {
		super::*,
		crate::schema::{SchemaBuilder, WireSchema},
	};

	struct Node;
	impl WireSchema for Node {
		fn append_schema(builder: &mut SchemaBuilder<'_>) -> SchemaKey {
			builder.complex(|c| {
				c.field::<String>("label");
				c.field::<Option<Vec<Node>>>("next");
			})
		}
		fn wire_name() -> std::borrow::Cow<'static, str> {
			"Node".into()
		}
		type TypeLookup = Node;
	}

	#[test]
	fn forward_references_bind() {
		// A reference that precedes its definition is not representable from
		// `to_xml`, but `from_xml` accepts it within one document
		let xml = r##"<Tuple>
  <Complex Contract="#later"/>
  <Complex Id="later">
    <Field Name="x">
      <Primitive Kind="int64"/>
    </Field>
  </Complex>
</Tuple>"##;
		let (parsed, root) = SchemaCollection::from_xml(xml).unwrap();
		assert_eq!(
			canonical_form::render(&parsed, root),
			"(record{x:int64},record{x:int64})"
		);
	}

	#[test]
	fn dangling_reference_is_rejected() {
		let xml = r##"<Nullable><Enum Contract="#nowhere"/></Nullable>"##;
		assert!(matches!(
			SchemaCollection::from_xml(xml),
			Err(SchemaError::UnresolvedReference(id)) if id == "nowhere"
		));
	}

	#[test]
	fn recursive_schema_round_trips() {
		let mut collection = SchemaCollection::new();
		let root = collection.get_or_add_write_schema::<Node>();
		let xml = collection.to_xml(root);
		let (parsed, parsed_root) = SchemaCollection::from_xml(&xml).unwrap();
		assert_eq!(
			canonical_form::render(&collection, root),
			canonical_form::render(&parsed, parsed_root),
		);
		assert_eq!(parsed.to_xml(parsed_root), xml);
	}
}
