mod seq_or_tuple;
mod struct_or_map;

use super::*;

use crate::{
	schema::Primitive,
	ser::pack,
};

use {
	seq_or_tuple::SerializeSeqOrTuple,
	struct_or_map::{SerializeMapValue, SerializeStructValue},
};

/// The [`serde::Serializer`] for one value position: pairs the live
/// [`SerializerState`] with the schema node governing that position
///
/// Obtained from [`SerializerState::serializer`]; each container entry point
/// spawns further instances for its children.
pub struct DatumSerializer<'r, 's, W> {
	pub(super) state: &'r mut SerializerState<'s, W>,
	pub(super) node: &'s SchemaNode,
}

impl<'r, 's, W: Write> DatumSerializer<'r, 's, W> {
	fn with_key(self, key: SchemaKey) -> Self {
		let node = self.state.node(key);
		Self {
			state: self.state,
			node,
		}
	}

	fn serialize_integer(self, value: i128) -> Result<(), SerError> {
		match *self.node {
			SchemaNode::Primitive(p) => match integer_range(p) {
				Some((min, max)) => {
					if value < min || value > max {
						return Err(SerError::custom(format_args!(
							"Integer {value} is out of range for {}",
							p.name()
						)));
					}
					pack::write_int(&mut self.state.writer, value)
				}
				None => Err(self.mismatch("integer")),
			},
			SchemaNode::Nullable(inner) => self.with_key(inner).serialize_integer(value),
			_ => Err(self.mismatch("integer")),
		}
	}

	fn mismatch(&self, what: &str) -> SerError {
		SerError::custom(format_args!(
			"Could not serialize {what} to {:?}",
			self.node
		))
	}
}

/// Value range each integer-backed primitive kind accepts
fn integer_range(p: Primitive) -> Option<(i128, i128)> {
	Some(match p {
		Primitive::Int8 => (i8::MIN as i128, i8::MAX as i128),
		Primitive::Int16 => (i16::MIN as i128, i16::MAX as i128),
		Primitive::Int32 => (i32::MIN as i128, i32::MAX as i128),
		Primitive::Int64 | Primitive::Timestamp => (i64::MIN as i128, i64::MAX as i128),
		Primitive::UInt8 => (0, u8::MAX as i128),
		Primitive::UInt16 => (0, u16::MAX as i128),
		Primitive::UInt32 => (0, u32::MAX as i128),
		Primitive::UInt64 => (0, u64::MAX as i128),
		_ => return None,
	})
}

impl<'r, 's, W: Write> Serializer for DatumSerializer<'r, 's, W> {
	type Ok = ();
	type Error = SerError;

	type SerializeSeq = SerializeSeqOrTuple<'r, 's, W>;
	type SerializeTuple = SerializeSeqOrTuple<'r, 's, W>;
	type SerializeTupleStruct = SerializeSeqOrTuple<'r, 's, W>;
	type SerializeTupleVariant = SerializeSeqOrTuple<'r, 's, W>;
	type SerializeMap = SerializeMapValue<'r, 's, W>;
	type SerializeStruct = SerializeStructValue<'r, 's, W>;
	type SerializeStructVariant = SerializeStructValue<'r, 's, W>;

	fn serialize_bool(self, v: bool) -> Result<Self::Ok, Self::Error> {
		match *self.node {
			SchemaNode::Primitive(Primitive::Boolean) => {
				pack::write_bool(&mut self.state.writer, v)
			}
			SchemaNode::Nullable(inner) => self.with_key(inner).serialize_bool(v),
			_ => Err(self.mismatch("bool")),
		}
	}

	fn serialize_i8(self, v: i8) -> Result<Self::Ok, Self::Error> {
		self.serialize_integer(v.into())
	}

	fn serialize_i16(self, v: i16) -> Result<Self::Ok, Self::Error> {
		self.serialize_integer(v.into())
	}

	fn serialize_i32(self, v: i32) -> Result<Self::Ok, Self::Error> {
		self.serialize_integer(v.into())
	}

	fn serialize_i64(self, v: i64) -> Result<Self::Ok, Self::Error> {
		self.serialize_integer(v.into())
	}

	fn serialize_i128(self, v: i128) -> Result<Self::Ok, Self::Error> {
		self.serialize_integer(v)
	}

	fn serialize_u8(self, v: u8) -> Result<Self::Ok, Self::Error> {
		self.serialize_integer(v.into())
	}

	fn serialize_u16(self, v: u16) -> Result<Self::Ok, Self::Error> {
		self.serialize_integer(v.into())
	}

	fn serialize_u32(self, v: u32) -> Result<Self::Ok, Self::Error> {
		self.serialize_integer(v.into())
	}

	fn serialize_u64(self, v: u64) -> Result<Self::Ok, Self::Error> {
		self.serialize_integer(v.into())
	}

	fn serialize_u128(self, v: u128) -> Result<Self::Ok, Self::Error> {
		let v = i128::try_from(v)
			.map_err(|_| SerError::new("Integer does not fit the MessagePack integer formats"))?;
		self.serialize_integer(v)
	}

	fn serialize_f32(self, v: f32) -> Result<Self::Ok, Self::Error> {
		match *self.node {
			SchemaNode::Primitive(Primitive::Float32) => {
				pack::write_f32(&mut self.state.writer, v)
			}
			// Lossless, so the schema may ask for the wider format
			SchemaNode::Primitive(Primitive::Float64) => {
				pack::write_f64(&mut self.state.writer, v.into())
			}
			SchemaNode::Nullable(inner) => self.with_key(inner).serialize_f32(v),
			_ => Err(self.mismatch("f32")),
		}
	}

	fn serialize_f64(self, v: f64) -> Result<Self::Ok, Self::Error> {
		match *self.node {
			SchemaNode::Primitive(Primitive::Float64) => {
				pack::write_f64(&mut self.state.writer, v)
			}
			SchemaNode::Primitive(Primitive::Float32) => Err(SerError::new(
				"Attempting to serialize an f64 where the schema expects float32 - \
					this would silently lose precision, please use f32",
			)),
			SchemaNode::Nullable(inner) => self.with_key(inner).serialize_f64(v),
			_ => Err(self.mismatch("f64")),
		}
	}

	fn serialize_char(self, v: char) -> Result<Self::Ok, Self::Error> {
		self.serialize_str(v.encode_utf8(&mut [0u8; 4]))
	}

	fn serialize_str(self, v: &str) -> Result<Self::Ok, Self::Error> {
		match *self.node {
			SchemaNode::Primitive(Primitive::String) => {
				pack::write_str(&mut self.state.writer, v)
			}
			SchemaNode::Primitive(Primitive::Decimal) => {
				// Re-rendering the parsed value keeps the wire form invariant
				let decimal: rust_decimal::Decimal = v.parse().map_err(|parse_err| {
					SerError::custom(format_args!(
						"str cannot be serialized as decimal: {parse_err}"
					))
				})?;
				pack::write_str(&mut self.state.writer, &decimal.to_string())
			}
			SchemaNode::Enum(ref e) => match e.member_ci(v) {
				Some(member) => pack::write_str(&mut self.state.writer, member),
				None => Err(SerError::custom(format_args!(
					"Failed to find matching enum member for {v:?} in {e:?}"
				))),
			},
			SchemaNode::Nullable(inner) => self.with_key(inner).serialize_str(v),
			_ => Err(self.mismatch("str")),
		}
	}

	fn serialize_bytes(self, v: &[u8]) -> Result<Self::Ok, Self::Error> {
		match *self.node {
			SchemaNode::Primitive(Primitive::Binary) => {
				pack::write_bin(&mut self.state.writer, v)
			}
			SchemaNode::Nullable(inner) => self.with_key(inner).serialize_bytes(v),
			_ => Err(self.mismatch("bytes")),
		}
	}

	fn serialize_none(self) -> Result<Self::Ok, Self::Error> {
		match *self.node {
			SchemaNode::Nullable(_) => pack::write_nil(&mut self.state.writer),
			_ => Err(self.mismatch("None")),
		}
	}

	fn serialize_some<T: ?Sized>(self, value: &T) -> Result<Self::Ok, Self::Error>
	where
		T: Serialize,
	{
		// The present value writes its inner encoding directly; each entry
		// point unwraps the Nullable node it finds
		value.serialize(self)
	}

	fn serialize_unit(self) -> Result<Self::Ok, Self::Error> {
		match *self.node {
			SchemaNode::Empty => pack::write_map_len(&mut self.state.writer, 0),
			SchemaNode::Nullable(inner) => self.with_key(inner).serialize_unit(),
			_ => Err(self.mismatch("unit")),
		}
	}

	fn serialize_unit_struct(self, name: &'static str) -> Result<Self::Ok, Self::Error> {
		match *self.node {
			SchemaNode::Empty => pack::write_map_len(&mut self.state.writer, 0),
			SchemaNode::Primitive(Primitive::String) | SchemaNode::Enum(_) => {
				self.serialize_str(name)
			}
			SchemaNode::Nullable(inner) => self.with_key(inner).serialize_unit_struct(name),
			_ => Err(self.mismatch("unit struct")),
		}
	}

	fn serialize_unit_variant(
		self,
		_name: &'static str,
		_variant_index: u32,
		variant: &'static str,
	) -> Result<Self::Ok, Self::Error> {
		match *self.node {
			SchemaNode::Primitive(Primitive::String) | SchemaNode::Enum(_) => {
				self.serialize_str(variant)
			}
			SchemaNode::Union(ref union) => match union.member_by_variant(variant) {
				Some(member) => {
					let payload = member.schema;
					if !matches!(self.state.node(payload), SchemaNode::Empty) {
						return Err(SerError::custom(format_args!(
							"Unit variant {variant:?} requires an empty union member"
						)));
					}
					pack::write_array_len(&mut self.state.writer, 2)?;
					pack::write_str(&mut self.state.writer, &member.name)?;
					pack::write_map_len(&mut self.state.writer, 0)
				}
				None => Err(unknown_union_member(variant, union)),
			},
			SchemaNode::Nullable(inner) => {
				self.with_key(inner)
					.serialize_unit_variant(_name, _variant_index, variant)
			}
			_ => Err(self.mismatch("unit variant")),
		}
	}

	fn serialize_newtype_struct<T: ?Sized>(
		self,
		_name: &'static str,
		value: &T,
	) -> Result<Self::Ok, Self::Error>
	where
		T: Serialize,
	{
		// Newtype wrappers are transparent on the wire
		value.serialize(self)
	}

	fn serialize_newtype_variant<T: ?Sized>(
		self,
		_name: &'static str,
		_variant_index: u32,
		variant: &'static str,
		value: &T,
	) -> Result<Self::Ok, Self::Error>
	where
		T: Serialize,
	{
		match *self.node {
			SchemaNode::Union(ref union) => match union.member_by_variant(variant) {
				Some(member) => {
					let payload = member.schema;
					pack::write_array_len(&mut self.state.writer, 2)?;
					pack::write_str(&mut self.state.writer, &member.name)?;
					value.serialize(self.with_key(payload))
				}
				None => Err(unknown_union_member(variant, union)),
			},
			SchemaNode::Nullable(inner) => {
				self.with_key(inner)
					.serialize_newtype_variant(_name, _variant_index, variant, value)
			}
			_ => Err(self.mismatch("newtype variant")),
		}
	}

	fn serialize_seq(self, len: Option<usize>) -> Result<Self::SerializeSeq, Self::Error> {
		match *self.node {
			SchemaNode::Sequence(element) => {
				let len = len.ok_or_else(|| {
					SerError::new(
						"Sequences of unknown length cannot be framed as a MessagePack array",
					)
				})?;
				pack::write_array_len(&mut self.state.writer, len)?;
				Ok(SerializeSeqOrTuple::sequence(
					self.state,
					element,
					len,
				))
			}
			SchemaNode::Tuple(ref elements) => {
				if len.map_or(false, |l| l != elements.len()) {
					return Err(SerError::custom(format_args!(
						"Could not serialize sequence of length {:?} as a tuple of arity {}",
						len,
						elements.len()
					)));
				}
				pack::write_array_len(&mut self.state.writer, elements.len())?;
				Ok(SerializeSeqOrTuple::tuple(self.state, elements))
			}
			SchemaNode::Nullable(inner) => self.with_key(inner).serialize_seq(len),
			_ => Err(self.mismatch("sequence, tuple or tuple struct")),
		}
	}

	fn serialize_tuple(self, len: usize) -> Result<Self::SerializeTuple, Self::Error> {
		self.serialize_seq(Some(len))
	}

	fn serialize_tuple_struct(
		self,
		_name: &'static str,
		len: usize,
	) -> Result<Self::SerializeTupleStruct, Self::Error> {
		self.serialize_seq(Some(len))
	}

	fn serialize_tuple_variant(
		self,
		_name: &'static str,
		_variant_index: u32,
		variant: &'static str,
		_len: usize,
	) -> Result<Self::SerializeTupleVariant, Self::Error> {
		Err(SerError::custom(format_args!(
			"Union members are dispatched through newtype variants; \
				wrap the payload of {variant:?} in its own type"
		)))
	}

	fn serialize_map(self, len: Option<usize>) -> Result<Self::SerializeMap, Self::Error> {
		match *self.node {
			SchemaNode::Complex(ref complex) => {
				SerializeMapValue::record(self.state, complex)
			}
			SchemaNode::Mapping { key, value } => {
				let len = len.ok_or_else(|| {
					SerError::new(
						"Maps of unknown length cannot be framed as a MessagePack map",
					)
				})?;
				pack::write_map_len(&mut self.state.writer, len)?;
				Ok(SerializeMapValue::mapping(self.state, key, value, len))
			}
			SchemaNode::Empty => {
				pack::write_map_len(&mut self.state.writer, 0)?;
				Ok(SerializeMapValue::empty())
			}
			SchemaNode::Nullable(inner) => self.with_key(inner).serialize_map(len),
			_ => Err(self.mismatch("map")),
		}
	}

	fn serialize_struct(
		self,
		name: &'static str,
		len: usize,
	) -> Result<Self::SerializeStruct, Self::Error> {
		match *self.node {
			SchemaNode::Complex(ref complex) => {
				SerializeStructValue::record(self.state, complex)
			}
			SchemaNode::Mapping { key, value } => {
				pack::write_map_len(&mut self.state.writer, len)?;
				Ok(SerializeStructValue::mapping(self.state, key, value, len))
			}
			SchemaNode::Empty => {
				pack::write_map_len(&mut self.state.writer, 0)?;
				Ok(SerializeStructValue::empty())
			}
			SchemaNode::Nullable(inner) => self.with_key(inner).serialize_struct(name, len),
			_ => Err(self.mismatch("struct")),
		}
	}

	fn serialize_struct_variant(
		self,
		_name: &'static str,
		_variant_index: u32,
		variant: &'static str,
		_len: usize,
	) -> Result<Self::SerializeStructVariant, Self::Error> {
		Err(SerError::custom(format_args!(
			"Union members are dispatched through newtype variants; \
				wrap the payload of {variant:?} in its own type"
		)))
	}
}

fn unknown_union_member(variant: &str, union: &crate::schema::UnionSchema) -> SerError {
	SerError::custom(format_args!(
		"Failed to find matching union member for variant {variant:?} in {union:?}"
	))
}
