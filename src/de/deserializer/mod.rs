mod types;

use types::*;

use super::*;

use crate::marker;

/// The [`serde::Deserializer`] for one value position: pairs the live
/// [`DeserializerState`] with the schema node expected at that position
///
/// Obtained from [`DeserializerState::deserializer`]; the access objects it
/// visits spawn further instances for nested values.
pub struct DatumDeserializer<'r, 's, R> {
	pub(super) state: &'r mut DeserializerState<'s, R>,
	pub(super) node: &'s SchemaNode,
}

impl<'de, R: ReadSlice<'de>> Deserializer<'de> for DatumDeserializer<'_, '_, R> {
	type Error = DeError;

	fn deserialize_any<V>(self, visitor: V) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		match *self.node {
			SchemaNode::Primitive(p) => read_primitive(self.state, p, visitor),
			SchemaNode::Nullable(inner) => {
				if self.state.peek_byte()? == marker::NIL {
					let _ = self.state.read_byte()?;
					visitor.visit_unit()
				} else {
					let node = self.state.node(inner);
					DatumDeserializer {
						state: self.state,
						node,
					}
					.deserialize_any(visitor)
				}
			}
			SchemaNode::Tuple(ref elements) => {
				let arity = read_array_len(self.state)?;
				if arity != elements.len() {
					return Err(DeError::custom(format_args!(
						"Tuple of arity {} framed as an array of {arity} elements",
						elements.len()
					)));
				}
				visitor.visit_seq(TupleSeqAccess {
					state: self.state,
					elements: elements.iter(),
				})
			}
			SchemaNode::Sequence(element) => {
				let element = self.state.node(element);
				let len = read_array_len(self.state)?;
				visitor.visit_seq(ArraySeqAccess {
					state: self.state,
					element,
					remaining: len,
				})
			}
			SchemaNode::Mapping { key, value } => {
				let key_node = self.state.node(key);
				let value_node = self.state.node(value);
				let len = read_map_len(self.state)?;
				visitor.visit_map(MapMapAccess {
					state: self.state,
					key_node,
					value_node,
					remaining: len,
				})
			}
			SchemaNode::Enum(ref enum_) => {
				let member = read_enum_member(self.state, enum_)?;
				visitor.visit_str(member)
			}
			SchemaNode::Complex(ref complex) => {
				let entries = read_map_len(self.state)?;
				visitor.visit_map(RecordMapAccess::new(self.state, &complex.fields, entries))
			}
			// Without an enum target the union is transparent: dispatch on
			// the member name and read the payload as whatever it is
			SchemaNode::Union(ref union) => {
				let member = read_union_member(self.state, union)?;
				let node = self.state.node(member.schema);
				DatumDeserializer {
					state: self.state,
					node,
				}
				.deserialize_any(visitor)
			}
			SchemaNode::Empty => {
				read_empty(self.state)?;
				visitor.visit_unit()
			}
		}
	}

	serde::forward_to_deserialize_any! {
		bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
		bytes byte_buf unit unit_struct seq tuple tuple_struct map struct identifier
	}

	fn deserialize_option<V>(self, visitor: V) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		match *self.node {
			SchemaNode::Nullable(inner) => {
				if self.state.peek_byte()? == marker::NIL {
					let _ = self.state.read_byte()?;
					visitor.visit_none()
				} else {
					let node = self.state.node(inner);
					visitor.visit_some(DatumDeserializer {
						state: self.state,
						node,
					})
				}
			}
			// The schema promises the value is always present
			_ => visitor.visit_some(self),
		}
	}

	fn deserialize_newtype_struct<V>(
		self,
		_name: &'static str,
		visitor: V,
	) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		visitor.visit_newtype_struct(self)
	}

	fn deserialize_enum<V>(
		self,
		_name: &'static str,
		_variants: &'static [&'static str],
		visitor: V,
	) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		match *self.node {
			SchemaNode::Union(ref union) => visitor.visit_enum(UnionEnumAccess {
				state: self.state,
				union,
			}),
			SchemaNode::Enum(ref enum_) => visitor.visit_enum(EnumMemberAccess {
				state: self.state,
				enum_,
			}),
			SchemaNode::Nullable(inner) => {
				let node = self.state.node(inner);
				DatumDeserializer {
					state: self.state,
					node,
				}
				.deserialize_enum(_name, _variants, visitor)
			}
			_ => Err(DeError::custom(format_args!(
				"Could not deserialize an enum from {:?}",
				self.node
			))),
		}
	}

	fn deserialize_ignored_any<V>(self, visitor: V) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		skip_value(self.state)?;
		visitor.visit_unit()
	}
}
