//! The structural schema model: build a [`SchemaCollection`] from user types,
//! navigate it, compare write and read sides for compatibility.

mod builder;
mod canonical_form;
mod compat;
mod error;
mod xml;

pub use {
	builder::{ComplexBuilder, SchemaBuilder, UnionBuilder, WireSchema},
	compat::CompatMode,
	error::SchemaError,
};

use std::{any::TypeId, cmp::Ordering, collections::HashMap};

/// Byte-wise comparison under an ASCII-lowercase fold
///
/// Deliberately not Unicode casefolding: field and member ordering must be
/// stable across processes and locales.
pub(crate) fn ascii_ci_cmp(a: &str, b: &str) -> Ordering {
	let mut rhs = b.bytes();
	for x in a.bytes() {
		match rhs.next() {
			None => return Ordering::Greater,
			Some(y) => match x.to_ascii_lowercase().cmp(&y.to_ascii_lowercase()) {
				Ordering::Equal => {}
				other => return other,
			},
		}
	}
	match rhs.next() {
		None => Ordering::Equal,
		Some(_) => Ordering::Less,
	}
}

pub(crate) fn ascii_ci_eq(a: &str, b: &str) -> bool {
	ascii_ci_cmp(a, b) == Ordering::Equal
}

/// Atomic schema kinds
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Primitive {
	Boolean,
	Int8,
	Int16,
	Int32,
	Int64,
	UInt8,
	UInt16,
	UInt32,
	UInt64,
	Float32,
	Float64,
	String,
	Binary,
	Decimal,
	Timestamp,
}

impl Primitive {
	/// Canonical lowercase name, used in canonical forms, union member names
	/// and the XML `Kind` attribute
	pub fn name(self) -> &'static str {
		match self {
			Primitive::Boolean => "boolean",
			Primitive::Int8 => "int8",
			Primitive::Int16 => "int16",
			Primitive::Int32 => "int32",
			Primitive::Int64 => "int64",
			Primitive::UInt8 => "uint8",
			Primitive::UInt16 => "uint16",
			Primitive::UInt32 => "uint32",
			Primitive::UInt64 => "uint64",
			Primitive::Float32 => "float32",
			Primitive::Float64 => "float64",
			Primitive::String => "string",
			Primitive::Binary => "binary",
			Primitive::Decimal => "decimal",
			Primitive::Timestamp => "timestamp",
		}
	}

	pub fn from_name(name: &str) -> Option<Self> {
		Some(match name {
			"boolean" => Primitive::Boolean,
			"int8" => Primitive::Int8,
			"int16" => Primitive::Int16,
			"int32" => Primitive::Int32,
			"int64" => Primitive::Int64,
			"uint8" => Primitive::UInt8,
			"uint16" => Primitive::UInt16,
			"uint32" => Primitive::UInt32,
			"uint64" => Primitive::UInt64,
			"float32" => Primitive::Float32,
			"float64" => Primitive::Float64,
			"string" => Primitive::String,
			"binary" => Primitive::Binary,
			"decimal" => Primitive::Decimal,
			"timestamp" => Primitive::Timestamp,
			_ => return None,
		})
	}
}

/// The location of a node in a [`SchemaCollection`]
///
/// This can be used to [`Index`](std::ops::Index) into the collection that
/// produced it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SchemaKey {
	idx: usize,
}

impl SchemaKey {
	pub(crate) fn from_idx(idx: usize) -> Self {
		Self { idx }
	}
	pub fn idx(self) -> usize {
		self.idx
	}
}

/// A node of the schema graph
///
/// `Complex`, `Union` and `Enum` are by-reference shapes: they carry a stable
/// opaque id, may be referred to from several places and may participate in
/// cycles. The remaining variants are by-value and inlined wherever they
/// occur.
#[derive(Clone, Debug)]
pub enum SchemaNode {
	Primitive(Primitive),
	Nullable(SchemaKey),
	Tuple(Vec<SchemaKey>),
	Sequence(SchemaKey),
	Mapping { key: SchemaKey, value: SchemaKey },
	Enum(EnumSchema),
	Complex(ComplexSchema),
	Union(UnionSchema),
	Empty,
}

impl SchemaNode {
	pub(crate) fn is_by_ref(&self) -> bool {
		matches!(
			self,
			SchemaNode::Enum(_) | SchemaNode::Complex(_) | SchemaNode::Union(_)
		)
	}

	/// The XML element name of this variant
	pub(crate) fn element_name(&self) -> &'static str {
		match self {
			SchemaNode::Primitive(_) => "Primitive",
			SchemaNode::Nullable(_) => "Nullable",
			SchemaNode::Tuple(_) => "Tuple",
			SchemaNode::Sequence(_) => "List",
			SchemaNode::Mapping { .. } => "Dictionary",
			SchemaNode::Enum(_) => "Enum",
			SchemaNode::Complex(_) => "Complex",
			SchemaNode::Union(_) => "Union",
			SchemaNode::Empty => "Empty",
		}
	}

	pub(crate) fn id(&self) -> Option<&str> {
		match self {
			SchemaNode::Enum(e) => Some(&e.id),
			SchemaNode::Complex(c) => Some(&c.id),
			SchemaNode::Union(u) => Some(&u.id),
			_ => None,
		}
	}
}

/// Body of a [`SchemaNode::Enum`]
#[derive(Clone, Debug)]
pub struct EnumSchema {
	pub(crate) id: String,
	/// Member names in declaration order, unique under the ASCII fold
	pub members: Vec<String>,
}

impl EnumSchema {
	pub fn member_ci(&self, name: &str) -> Option<&str> {
		self.members
			.iter()
			.find(|m| ascii_ci_eq(m, name))
			.map(|m| m.as_str())
	}
}

/// Body of a [`SchemaNode::Complex`]
#[derive(Clone, Debug)]
pub struct ComplexSchema {
	pub(crate) id: String,
	/// Sorted by field name under the ASCII-lowercase fold
	pub fields: Vec<FieldSchema>,
}

impl ComplexSchema {
	pub fn field_index(&self, name: &str) -> Option<usize> {
		self.fields
			.binary_search_by(|f| ascii_ci_cmp(&f.name, name))
			.ok()
	}
}

/// One field of a [`ComplexSchema`]
#[derive(Clone, Debug)]
pub struct FieldSchema {
	pub name: String,
	pub schema: SchemaKey,
	/// Whether the field can be reconstructed when absent from the wire.
	/// Only consulted on the read side.
	pub has_default: bool,
}

/// Body of a [`SchemaNode::Union`]
#[derive(Clone, Debug)]
pub struct UnionSchema {
	pub(crate) id: String,
	/// Sorted by member name under the ASCII-lowercase fold
	pub members: Vec<UnionMember>,
}

impl UnionSchema {
	pub fn member_ci(&self, name: &str) -> Option<&UnionMember> {
		self.members
			.binary_search_by(|m| ascii_ci_cmp(&m.name, name))
			.ok()
			.map(|idx| &self.members[idx])
	}

	pub(crate) fn member_by_variant(&self, variant: &str) -> Option<&UnionMember> {
		self.members
			.iter()
			.find(|m| m.variant.as_deref() == Some(variant))
			.or_else(|| self.member_ci(variant))
	}
}

/// One member of a [`UnionSchema`]
#[derive(Clone, Debug)]
pub struct UnionMember {
	/// Canonical wire name of the member, derived from its type
	pub name: String,
	/// The serde variant identifier of the member on the Rust side
	///
	/// This is a dispatch adjunct: it takes no part in structural equality,
	/// canonical forms or the XML form, and is absent on schemas loaded from
	/// XML (those only ever play the compatibility role).
	pub variant: Option<String>,
	pub schema: SchemaKey,
}

/// Memoizing factory and owner of a schema graph
///
/// Schemas are derived lazily per user type, deduplicated structurally for
/// by-reference shapes, and immutable once derived. A collection is a unit of
/// sharing: schemas from different collections may be structurally equal but
/// never identity-equal. Derivation takes `&mut self`; a fully derived
/// collection is navigated through `&self` and is safe to share across
/// threads.
#[derive(Debug, Default)]
pub struct SchemaCollection {
	nodes: Vec<SchemaNode>,
	by_type: HashMap<TypeId, SchemaKey>,
	/// Canonical form of every by-reference node, for structural dedup
	interned: HashMap<String, SchemaKey>,
	next_id: u32,
}

impl SchemaCollection {
	pub fn new() -> Self {
		Self::default()
	}

	/// Derive (or fetch the memoized) schema describing what a serializer for
	/// `T` produces
	pub fn get_or_add_write_schema<T: WireSchema>(&mut self) -> SchemaKey {
		SchemaBuilder::new(self).node_of::<T>()
	}

	/// Derive (or fetch the memoized) schema describing what a deserializer
	/// for `T` expects
	pub fn get_or_add_read_schema<T: WireSchema>(&mut self) -> SchemaKey {
		// Write and read flavors are roles over the same storage; the
		// `has_default` markers only come into play on the read side.
		SchemaBuilder::new(self).node_of::<T>()
	}

	pub fn write_schema(&self, key: SchemaKey) -> WriteSchema<'_> {
		WriteSchema {
			collection: self,
			key,
		}
	}

	pub fn read_schema(&self, key: SchemaKey) -> ReadSchema<'_> {
		ReadSchema {
			collection: self,
			key,
		}
	}

	/// Deep-copy the graph rooted at `root` into `target`, deduplicating
	/// against the by-reference shapes `target` already holds
	pub fn copy_to(&self, root: SchemaKey, target: &mut SchemaCollection) -> SchemaKey {
		let mut mapped = HashMap::new();
		self.copy_node(root, target, &mut mapped)
	}

	pub(crate) fn nodes_len(&self) -> usize {
		self.nodes.len()
	}

	pub(crate) fn reserve_slot(&mut self) -> SchemaKey {
		let key = SchemaKey::from_idx(self.nodes.len());
		self.nodes.push(SchemaNode::Empty);
		key
	}

	pub(crate) fn fill_slot(&mut self, key: SchemaKey, node: SchemaNode) {
		self.nodes[key.idx] = node;
	}

	pub(crate) fn fresh_id(&mut self) -> String {
		self.next_id += 1;
		format!("c{}", self.next_id)
	}

	pub(crate) fn note_used_id(&mut self, id: &str) {
		if let Some(n) = id.strip_prefix('c').and_then(|n| n.parse::<u32>().ok()) {
			self.next_id = self.next_id.max(n);
		}
	}

	pub(crate) fn memo_get(&self, type_id: TypeId) -> Option<SchemaKey> {
		self.by_type.get(&type_id).copied()
	}

	pub(crate) fn memo_insert(&mut self, type_id: TypeId, key: SchemaKey) {
		self.by_type.insert(type_id, key);
	}

	pub(crate) fn memo_remove(&mut self, type_id: TypeId) {
		self.by_type.remove(&type_id);
	}

	/// Intern a freshly filled by-reference node
	///
	/// `mark` is the arena length from before the node's subtree was built.
	/// On a structural-dedup hit the canonical key is returned instead, and
	/// the freshly appended tail is dropped when no table still refers into
	/// it. By-value nodes pass through unchanged.
	pub(crate) fn intern(&mut self, key: SchemaKey, mark: usize) -> SchemaKey {
		if !self.nodes[key.idx].is_by_ref() {
			return key;
		}
		let form = canonical_form::render(self, key);
		match self.interned.get(&form) {
			Some(&canonical) => {
				if canonical != key {
					let tail_referenced = self
						.by_type
						.values()
						.chain(self.interned.values())
						.any(|k| k.idx >= mark);
					if !tail_referenced {
						self.nodes.truncate(mark);
					}
				}
				canonical
			}
			None => {
				self.interned.insert(form, key);
				key
			}
		}
	}

	fn copy_node(
		&self,
		key: SchemaKey,
		target: &mut SchemaCollection,
		mapped: &mut HashMap<usize, SchemaKey>,
	) -> SchemaKey {
		if let Some(&already) = mapped.get(&key.idx) {
			return already;
		}
		let new_key = match &self[key] {
			SchemaNode::Primitive(p) => {
				let p = *p;
				let k = target.reserve_slot();
				target.fill_slot(k, SchemaNode::Primitive(p));
				k
			}
			SchemaNode::Empty => target.reserve_slot(),
			SchemaNode::Nullable(inner) => {
				let inner = *inner;
				let k = target.reserve_slot();
				let inner = self.copy_node(inner, target, mapped);
				target.fill_slot(k, SchemaNode::Nullable(inner));
				k
			}
			SchemaNode::Sequence(element) => {
				let element = *element;
				let k = target.reserve_slot();
				let element = self.copy_node(element, target, mapped);
				target.fill_slot(k, SchemaNode::Sequence(element));
				k
			}
			SchemaNode::Tuple(elements) => {
				let elements = elements.clone();
				let k = target.reserve_slot();
				let elements = elements
					.into_iter()
					.map(|e| self.copy_node(e, target, mapped))
					.collect();
				target.fill_slot(k, SchemaNode::Tuple(elements));
				k
			}
			SchemaNode::Mapping { key: mk, value } => {
				let (mk, value) = (*mk, *value);
				let k = target.reserve_slot();
				let mk = self.copy_node(mk, target, mapped);
				let value = self.copy_node(value, target, mapped);
				target.fill_slot(k, SchemaNode::Mapping { key: mk, value });
				k
			}
			SchemaNode::Enum(e) => {
				let members = e.members.clone();
				return self.copy_by_ref(key, target, mapped, move |target, _, _| {
					let id = target.fresh_id();
					SchemaNode::Enum(EnumSchema { id, members })
				});
			}
			SchemaNode::Complex(c) => {
				let fields = c.fields.clone();
				return self.copy_by_ref(key, target, mapped, move |target, this, mapped| {
					let fields = fields
						.into_iter()
						.map(|f| FieldSchema {
							name: f.name,
							schema: this.copy_node(f.schema, target, mapped),
							has_default: f.has_default,
						})
						.collect();
					let id = target.fresh_id();
					SchemaNode::Complex(ComplexSchema { id, fields })
				});
			}
			SchemaNode::Union(u) => {
				let members = u.members.clone();
				return self.copy_by_ref(key, target, mapped, move |target, this, mapped| {
					let members = members
						.into_iter()
						.map(|m| UnionMember {
							name: m.name,
							variant: m.variant,
							schema: this.copy_node(m.schema, target, mapped),
						})
						.collect();
					let id = target.fresh_id();
					SchemaNode::Union(UnionSchema { id, members })
				});
			}
		};
		mapped.insert(key.idx, new_key);
		new_key
	}

	fn copy_by_ref(
		&self,
		key: SchemaKey,
		target: &mut SchemaCollection,
		mapped: &mut HashMap<usize, SchemaKey>,
		build: impl FnOnce(
			&mut SchemaCollection,
			&Self,
			&mut HashMap<usize, SchemaKey>,
		) -> SchemaNode,
	) -> SchemaKey {
		let mark = target.nodes.len();
		let fresh = target.reserve_slot();
		// Registered before the body is built so cycles close on `fresh`
		mapped.insert(key.idx, fresh);
		let node = build(target, self, mapped);
		// The id was drawn inside `build`, after the children; that ordering
		// is irrelevant since ids are opaque
		target.fill_slot(fresh, node);
		let interned = target.intern(fresh, mark);
		if interned != fresh {
			// The fresh subtree is dead (possibly truncated); forget any
			// mapping into it so later copies rebuild from live nodes
			mapped.retain(|_, v| v.idx < mark);
		}
		mapped.insert(key.idx, interned);
		interned
	}
}

impl std::ops::Index<SchemaKey> for SchemaCollection {
	type Output = SchemaNode;
	fn index(&self, key: SchemaKey) -> &Self::Output {
		&self.nodes[key.idx]
	}
}

/// Structural description of what a serializer produces
#[derive(Clone, Copy)]
pub struct WriteSchema<'c> {
	pub(crate) collection: &'c SchemaCollection,
	pub(crate) key: SchemaKey,
}

/// Structural description of what a deserializer expects
#[derive(Clone, Copy)]
pub struct ReadSchema<'c> {
	pub(crate) collection: &'c SchemaCollection,
	pub(crate) key: SchemaKey,
}

macro_rules! impl_schema_handle {
	($($handle:ident,)+) => {
		$(
			impl<'c> $handle<'c> {
				pub fn key(&self) -> SchemaKey {
					self.key
				}

				pub fn node(&self) -> &'c SchemaNode {
					&self.collection[self.key]
				}

				pub fn collection(&self) -> &'c SchemaCollection {
					self.collection
				}

				/// Canonical textual form, also the structural fingerprint
				pub fn canonical_form(&self) -> String {
					canonical_form::render(self.collection, self.key)
				}

				pub fn to_xml(&self) -> String {
					self.collection.to_xml(self.key)
				}

				pub fn copy_to(&self, target: &mut SchemaCollection) -> SchemaKey {
					self.collection.copy_to(self.key, target)
				}
			}

			impl std::fmt::Display for $handle<'_> {
				fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
					f.write_str(&self.canonical_form())
				}
			}

			impl std::fmt::Debug for $handle<'_> {
				fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
					write!(f, concat!(stringify!($handle), "({})"), self.canonical_form())
				}
			}

			/// Structural equality, meaningful across collections
			impl PartialEq for $handle<'_> {
				fn eq(&self, other: &Self) -> bool {
					self.canonical_form() == other.canonical_form()
				}
			}
			impl Eq for $handle<'_> {}
		)+
	};
}
impl_schema_handle! {
	WriteSchema,
	ReadSchema,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn ascii_fold_ordering() {
		assert_eq!(ascii_ci_cmp("Name", "name"), Ordering::Equal);
		assert_eq!(ascii_ci_cmp("Age", "name"), Ordering::Less);
		assert_eq!(ascii_ci_cmp("apple", "Apples"), Ordering::Less);
		assert_eq!(ascii_ci_cmp("Zebra", "apple"), Ordering::Greater);
	}
}
