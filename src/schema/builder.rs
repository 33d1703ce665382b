//! Derives schemas from Rust types
//!
//! The [`WireSchema`] trait maps a type to its schema node. Construction is
//! two-phase: the node's slot is reserved (and memoized) before its body is
//! built, so mutually recursive types close into cycles instead of diverging.

use super::*;

use std::borrow::Cow;

/// A schema can be derived for this type
///
/// Implementations for user types go through the builder helpers:
///
/// ```
/// use schemapack::schema::{SchemaBuilder, SchemaKey, WireSchema};
///
/// struct Person {
/// 	name: String,
/// 	age: i32,
/// }
///
/// impl WireSchema for Person {
/// 	fn append_schema(builder: &mut SchemaBuilder<'_>) -> SchemaKey {
/// 		builder.complex(|c| {
/// 			c.field::<String>("name");
/// 			c.field::<i32>("age");
/// 		})
/// 	}
/// 	fn wire_name() -> std::borrow::Cow<'static, str> {
/// 		"Person".into()
/// 	}
/// 	type TypeLookup = Person;
/// }
/// ```
pub trait WireSchema {
	/// Append this type's schema to the collection behind `builder` and
	/// return its key
	///
	/// Must push the node at the slot that is current when it is called (the
	/// builder has already memoized that location to close cycles).
	fn append_schema(builder: &mut SchemaBuilder<'_>) -> SchemaKey;

	/// Canonical name of this type when it appears as a union member
	///
	/// Stable across processes: primitives use their canonical lowercase
	/// names, generic shapes render their arguments, user types use their
	/// declared name.
	fn wire_name() -> Cow<'static, str>;

	/// The `'static` stand-in for `Self` under which derivation is memoized
	///
	/// Lifetime-parameterized types point this at their owned counterpart so
	/// that e.g. `&str` and `String` share one node.
	type TypeLookup: std::any::Any;
}

/// Appends schema nodes to a [`SchemaCollection`]
pub struct SchemaBuilder<'c> {
	collection: &'c mut SchemaCollection,
}

impl<'c> SchemaBuilder<'c> {
	pub(crate) fn new(collection: &'c mut SchemaCollection) -> Self {
		Self { collection }
	}

	/// Memoized schema lookup/derivation for `T`
	pub fn node_of<T: WireSchema>(&mut self) -> SchemaKey {
		let type_id = std::any::TypeId::of::<T::TypeLookup>();
		if let Some(key) = self.collection.memo_get(type_id) {
			return key;
		}
		let mark = self.collection.nodes_len();
		let expected = SchemaKey::from_idx(mark);
		// Provisional registration: recursive mentions of T during the body
		// build resolve to this slot
		self.collection.memo_insert(type_id, expected);
		let key = T::append_schema(self);
		debug_assert_eq!(key, expected);
		// Drop the provisional entry while interning so the dedup pass only
		// sees foreign references into the fresh tail
		self.collection.memo_remove(type_id);
		let key = self.collection.intern(key, mark);
		self.collection.memo_insert(type_id, key);
		key
	}

	/// Reserve a slot to be filled once the node's children exist
	pub fn reserve(&mut self) -> SchemaKey {
		self.collection.reserve_slot()
	}

	pub(crate) fn fill(&mut self, key: SchemaKey, node: SchemaNode) {
		self.collection.fill_slot(key, node);
	}

	pub fn primitive(&mut self, primitive: Primitive) -> SchemaKey {
		let key = self.reserve();
		self.fill(key, SchemaNode::Primitive(primitive));
		key
	}

	pub fn empty(&mut self) -> SchemaKey {
		// A reserved slot already reads as Empty
		self.reserve()
	}

	/// An enum schema over the given member names, in declaration order
	///
	/// Panics on duplicate member names under the ASCII-lowercase fold;
	/// derivation errors are fatal for the type.
	pub fn enumeration(&mut self, members: &[&str]) -> SchemaKey {
		let members: Vec<String> = members.iter().map(|m| (*m).to_owned()).collect();
		let mut sorted: Vec<&String> = members.iter().collect();
		sorted.sort_by(|a, b| ascii_ci_cmp(a, b));
		if let Some(dup) = sorted.windows(2).find(|w| ascii_ci_eq(w[0], w[1])) {
			panic!(
				"duplicate enum member name (case-insensitive): {:?}",
				dup[1]
			);
		}
		let key = self.reserve();
		let id = self.collection.fresh_id();
		self.fill(key, SchemaNode::Enum(EnumSchema { id, members }));
		key
	}

	/// A complex (record) schema; fields end up sorted case-insensitively
	///
	/// Panics on duplicate field names under the ASCII-lowercase fold.
	pub fn complex(&mut self, build: impl FnOnce(&mut ComplexBuilder<'_, 'c>)) -> SchemaKey {
		let key = self.reserve();
		let mut fields = {
			let mut complex = ComplexBuilder {
				builder: self,
				fields: Vec::new(),
			};
			build(&mut complex);
			complex.fields
		};
		fields.sort_by(|a, b| ascii_ci_cmp(&a.name, &b.name));
		if let Some(dup) = fields.windows(2).find(|w| ascii_ci_eq(&w[0].name, &w[1].name)) {
			panic!(
				"duplicate field name (case-insensitive) in complex schema: {:?}",
				dup[1].name
			);
		}
		let id = self.collection.fresh_id();
		self.fill(key, SchemaNode::Complex(ComplexSchema { id, fields }));
		key
	}

	/// A union schema; members end up sorted case-insensitively by their
	/// canonical wire names
	///
	/// Panics on duplicate member names under the ASCII-lowercase fold.
	pub fn union(&mut self, build: impl FnOnce(&mut UnionBuilder<'_, 'c>)) -> SchemaKey {
		let key = self.reserve();
		let mut members = {
			let mut union = UnionBuilder {
				builder: self,
				members: Vec::new(),
			};
			build(&mut union);
			union.members
		};
		members.sort_by(|a, b| ascii_ci_cmp(&a.name, &b.name));
		if let Some(dup) = members
			.windows(2)
			.find(|w| ascii_ci_eq(&w[0].name, &w[1].name))
		{
			panic!(
				"duplicate union member name (case-insensitive): {:?}",
				dup[1].name
			);
		}
		let id = self.collection.fresh_id();
		self.fill(key, SchemaNode::Union(UnionSchema { id, members }));
		key
	}
}

/// Accumulates the fields of a complex schema
pub struct ComplexBuilder<'b, 'c> {
	builder: &'b mut SchemaBuilder<'c>,
	fields: Vec<FieldSchema>,
}

impl ComplexBuilder<'_, '_> {
	pub fn field<T: WireSchema>(&mut self, name: &str) {
		self.push::<T>(name, false)
	}

	/// A field the reader can reconstruct when it is absent from the wire
	///
	/// Pair it with `#[serde(default)]` on the Rust side so the missing value
	/// is actually fabricated during deserialization.
	pub fn field_with_default<T: WireSchema>(&mut self, name: &str) {
		self.push::<T>(name, true)
	}

	fn push<T: WireSchema>(&mut self, name: &str, has_default: bool) {
		let schema = self.builder.node_of::<T>();
		self.fields.push(FieldSchema {
			name: name.to_owned(),
			schema,
			has_default,
		});
	}
}

/// Accumulates the members of a union schema
pub struct UnionBuilder<'b, 'c> {
	builder: &'b mut SchemaBuilder<'c>,
	members: Vec<UnionMember>,
}

impl UnionBuilder<'_, '_> {
	/// Register the member type `T`, dispatched from the serde variant named
	/// `variant`
	///
	/// The member's wire name is `T::wire_name()`.
	pub fn member<T: WireSchema>(&mut self, variant: &str) {
		let schema = self.builder.node_of::<T>();
		self.members.push(UnionMember {
			name: T::wire_name().into_owned(),
			variant: Some(variant.to_owned()),
			schema,
		});
	}
}

macro_rules! impl_primitive {
	($($ty:ty, $variant:ident;)+) => {
		$(
			impl WireSchema for $ty {
				fn append_schema(builder: &mut SchemaBuilder<'_>) -> SchemaKey {
					builder.primitive(Primitive::$variant)
				}
				fn wire_name() -> Cow<'static, str> {
					Cow::Borrowed(Primitive::$variant.name())
				}
				type TypeLookup = Self;
			}
		)+
	};
}
impl_primitive!(
	bool, Boolean;
	i8, Int8;
	i16, Int16;
	i32, Int32;
	i64, Int64;
	u8, UInt8;
	u16, UInt16;
	u32, UInt32;
	u64, UInt64;
	f32, Float32;
	f64, Float64;
	String, String;
	rust_decimal::Decimal, Decimal;
	serde_bytes::ByteBuf, Binary;
);

macro_rules! delegate_impl {
	($($ty:ty, $to:ty;)+) => {
		$(
			impl WireSchema for $ty {
				fn append_schema(builder: &mut SchemaBuilder<'_>) -> SchemaKey {
					<$to as WireSchema>::append_schema(builder)
				}
				fn wire_name() -> Cow<'static, str> {
					<$to as WireSchema>::wire_name()
				}
				type TypeLookup = <$to as WireSchema>::TypeLookup;
			}
		)+
	};
}
delegate_impl! {
	&'_ str, String;
	char, String;
	&'_ serde_bytes::Bytes, serde_bytes::ByteBuf;
}

impl<T: WireSchema> WireSchema for Option<T> {
	fn append_schema(builder: &mut SchemaBuilder<'_>) -> SchemaKey {
		let key = builder.reserve();
		let inner = builder.node_of::<T>();
		builder.fill(key, SchemaNode::Nullable(inner));
		key
	}
	fn wire_name() -> Cow<'static, str> {
		Cow::Owned(format!("Nullable({})", T::wire_name()))
	}
	type TypeLookup = Option<T::TypeLookup>;
}

impl<T: WireSchema> WireSchema for Vec<T> {
	fn append_schema(builder: &mut SchemaBuilder<'_>) -> SchemaKey {
		let key = builder.reserve();
		let element = builder.node_of::<T>();
		builder.fill(key, SchemaNode::Sequence(element));
		key
	}
	fn wire_name() -> Cow<'static, str> {
		Cow::Owned(format!("{}[]", T::wire_name()))
	}
	type TypeLookup = Vec<T::TypeLookup>;
}

impl<T: WireSchema> WireSchema for &'_ [T] {
	fn append_schema(builder: &mut SchemaBuilder<'_>) -> SchemaKey {
		<Vec<T> as WireSchema>::append_schema(builder)
	}
	fn wire_name() -> Cow<'static, str> {
		<Vec<T> as WireSchema>::wire_name()
	}
	type TypeLookup = <Vec<T> as WireSchema>::TypeLookup;
}

impl<K: WireSchema, V: WireSchema> WireSchema for std::collections::HashMap<K, V> {
	fn append_schema(builder: &mut SchemaBuilder<'_>) -> SchemaKey {
		let reserved = builder.reserve();
		let key = builder.node_of::<K>();
		let value = builder.node_of::<V>();
		builder.fill(reserved, SchemaNode::Mapping { key, value });
		reserved
	}
	fn wire_name() -> Cow<'static, str> {
		Cow::Owned(format!("Map({},{})", K::wire_name(), V::wire_name()))
	}
	type TypeLookup = std::collections::HashMap<K::TypeLookup, V::TypeLookup>;
}

impl<K: WireSchema, V: WireSchema> WireSchema for std::collections::BTreeMap<K, V> {
	fn append_schema(builder: &mut SchemaBuilder<'_>) -> SchemaKey {
		<std::collections::HashMap<K, V> as WireSchema>::append_schema(builder)
	}
	fn wire_name() -> Cow<'static, str> {
		<std::collections::HashMap<K, V> as WireSchema>::wire_name()
	}
	type TypeLookup = <std::collections::HashMap<K, V> as WireSchema>::TypeLookup;
}

macro_rules! impl_tuple {
	($($t:ident),+) => {
		impl<$($t: WireSchema),+> WireSchema for ($($t,)+) {
			fn append_schema(builder: &mut SchemaBuilder<'_>) -> SchemaKey {
				let key = builder.reserve();
				let elements = vec![$(builder.node_of::<$t>()),+];
				builder.fill(key, SchemaNode::Tuple(elements));
				key
			}
			fn wire_name() -> Cow<'static, str> {
				let names = [$(<$t as WireSchema>::wire_name()),+];
				Cow::Owned(format!("Tuple({})", names.join(",")))
			}
			type TypeLookup = ($($t::TypeLookup,)+);
		}
	};
}
impl_tuple!(A);
impl_tuple!(A, B);
impl_tuple!(A, B, C);
impl_tuple!(A, B, C, D);
impl_tuple!(A, B, C, D, E);
impl_tuple!(A, B, C, D, E, F);
impl_tuple!(A, B, C, D, E, F, G);
impl_tuple!(A, B, C, D, E, F, G, H);

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn primitive_nodes_are_memoized() {
		let mut collection = SchemaCollection::new();
		let a = collection.get_or_add_write_schema::<i32>();
		let b = collection.get_or_add_write_schema::<i32>();
		assert_eq!(a, b);
	}

	#[test]
	fn borrowed_and_owned_strings_share_a_node() {
		let mut collection = SchemaCollection::new();
		let owned = collection.get_or_add_write_schema::<String>();
		let borrowed = collection.get_or_add_write_schema::<&str>();
		assert_eq!(owned, borrowed);
	}

	#[test]
	fn structurally_equal_records_are_deduplicated() {
		struct A;
		struct B;
		impl WireSchema for A {
			fn append_schema(builder: &mut SchemaBuilder<'_>) -> SchemaKey {
				builder.complex(|c| c.field::<i64>("x"))
			}
			fn wire_name() -> Cow<'static, str> {
				"A".into()
			}
			type TypeLookup = A;
		}
		impl WireSchema for B {
			fn append_schema(builder: &mut SchemaBuilder<'_>) -> SchemaKey {
				builder.complex(|c| c.field::<i64>("x"))
			}
			fn wire_name() -> Cow<'static, str> {
				"B".into()
			}
			type TypeLookup = B;
		}
		let mut collection = SchemaCollection::new();
		let a = collection.get_or_add_write_schema::<A>();
		let b = collection.get_or_add_write_schema::<B>();
		assert_eq!(a, b);
	}
}
