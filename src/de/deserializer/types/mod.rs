//! Per-shape reading helpers for the schema-directed deserializer

mod enums;
mod record;
mod skip;
mod union;

pub(in crate::de) use {enums::*, record::*, skip::*, union::*};

use super::super::{
	read::{Read, ReadSlice, ReadVisitor},
	DeError, DeserializerState,
};

use crate::{
	marker,
	schema::{Primitive, SchemaKey, SchemaNode},
};

use super::DatumDeserializer;

use serde::de::{DeserializeSeed, Error as _, MapAccess, SeqAccess, Visitor};

pub(in crate::de) fn wrong_marker(expected: &'static str, found: u8) -> DeError {
	DeError::custom(format_args!(
		"Expected {expected}, found marker 0x{found:02x}"
	))
}

pub(in crate::de) fn read_bool<R: Read>(
	state: &mut DeserializerState<'_, R>,
) -> Result<bool, DeError> {
	match state.read_byte()? {
		marker::TRUE => Ok(true),
		marker::FALSE => Ok(false),
		other => Err(wrong_marker("a boolean", other)),
	}
}

/// Decodes any MessagePack integer format; `i128` holds the full `u64` and
/// `i64` ranges, so range checking against the schema kind happens after
pub(in crate::de) fn read_int<R: Read>(
	state: &mut DeserializerState<'_, R>,
) -> Result<i128, DeError> {
	let m = state.read_byte()?;
	Ok(match m {
		m if marker::is_positive_fixint(m) => m.into(),
		m if marker::is_negative_fixint(m) => (m as i8).into(),
		marker::U8 => state.read_const_size_buf::<1>()?[0].into(),
		marker::U16 => u16::from_be_bytes(state.read_const_size_buf()?).into(),
		marker::U32 => u32::from_be_bytes(state.read_const_size_buf()?).into(),
		marker::U64 => u64::from_be_bytes(state.read_const_size_buf()?).into(),
		marker::I8 => (state.read_const_size_buf::<1>()?[0] as i8).into(),
		marker::I16 => i16::from_be_bytes(state.read_const_size_buf()?).into(),
		marker::I32 => i32::from_be_bytes(state.read_const_size_buf()?).into(),
		marker::I64 => i64::from_be_bytes(state.read_const_size_buf()?).into(),
		other => return Err(wrong_marker("an integer", other)),
	})
}

pub(in crate::de) fn read_f32_exact<R: Read>(
	state: &mut DeserializerState<'_, R>,
) -> Result<f32, DeError> {
	match state.read_byte()? {
		marker::F32 => Ok(f32::from_be_bytes(state.read_const_size_buf()?)),
		other => Err(wrong_marker("a float32", other)),
	}
}

/// A float64 reader also accepts float32 wire values (lossless)
pub(in crate::de) fn read_f64_lenient<R: Read>(
	state: &mut DeserializerState<'_, R>,
) -> Result<f64, DeError> {
	match state.read_byte()? {
		marker::F64 => Ok(f64::from_be_bytes(state.read_const_size_buf()?)),
		marker::F32 => Ok(f32::from_be_bytes(state.read_const_size_buf()?).into()),
		other => Err(wrong_marker("a float", other)),
	}
}

pub(in crate::de) fn read_str_len<R: Read>(
	state: &mut DeserializerState<'_, R>,
) -> Result<usize, DeError> {
	match state.read_byte()? {
		m if marker::is_fixstr(m) => Ok((m & 0x1f) as usize),
		marker::STR8 => Ok(state.read_const_size_buf::<1>()?[0] as usize),
		marker::STR16 => Ok(u16::from_be_bytes(state.read_const_size_buf()?) as usize),
		marker::STR32 => Ok(u32::from_be_bytes(state.read_const_size_buf()?) as usize),
		other => Err(wrong_marker("a string", other)),
	}
}

pub(in crate::de) fn read_bin_len<R: Read>(
	state: &mut DeserializerState<'_, R>,
) -> Result<usize, DeError> {
	match state.read_byte()? {
		marker::BIN8 => Ok(state.read_const_size_buf::<1>()?[0] as usize),
		marker::BIN16 => Ok(u16::from_be_bytes(state.read_const_size_buf()?) as usize),
		marker::BIN32 => Ok(u32::from_be_bytes(state.read_const_size_buf()?) as usize),
		other => Err(wrong_marker("a byte string", other)),
	}
}

pub(in crate::de) fn read_array_len<R: Read>(
	state: &mut DeserializerState<'_, R>,
) -> Result<usize, DeError> {
	let len = match state.read_byte()? {
		m if marker::is_fixarray(m) => (m & 0x0f) as usize,
		marker::ARRAY16 => u16::from_be_bytes(state.read_const_size_buf()?) as usize,
		marker::ARRAY32 => u32::from_be_bytes(state.read_const_size_buf()?) as usize,
		other => return Err(wrong_marker("an array", other)),
	};
	check_seq_size(state, len)?;
	Ok(len)
}

pub(in crate::de) fn read_map_len<R: Read>(
	state: &mut DeserializerState<'_, R>,
) -> Result<usize, DeError> {
	let len = match state.read_byte()? {
		m if marker::is_fixmap(m) => (m & 0x0f) as usize,
		marker::MAP16 => u16::from_be_bytes(state.read_const_size_buf()?) as usize,
		marker::MAP32 => u32::from_be_bytes(state.read_const_size_buf()?) as usize,
		other => return Err(wrong_marker("a map", other)),
	};
	check_seq_size(state, len)?;
	Ok(len)
}

fn check_seq_size<R>(state: &DeserializerState<'_, R>, len: usize) -> Result<(), DeError> {
	if len > state.config().max_seq_size {
		return Err(DeError::custom(format_args!(
			"Collection header advertises {len} entries, which exceeds max_seq_size"
		)));
	}
	Ok(())
}

pub(in crate::de) fn read_owned_str<'de, R: ReadSlice<'de>>(
	state: &mut DeserializerState<'_, R>,
) -> Result<String, DeError> {
	let len = read_str_len(state)?;
	state.read_slice(len, ToStringVisitor)
}

pub(in crate::de) fn read_str_into<'de, R: ReadSlice<'de>>(
	state: &mut DeserializerState<'_, R>,
	buf: &mut String,
) -> Result<(), DeError> {
	let len = read_str_len(state)?;
	state.read_slice(len, AppendTo(buf))
}

/// The empty message accepts any map and discards its contents
pub(in crate::de) fn read_empty<'de, R: ReadSlice<'de>>(
	state: &mut DeserializerState<'_, R>,
) -> Result<(), DeError> {
	let entries = read_map_len(state)?;
	for _ in 0..entries {
		skip_value(state)?;
		skip_value(state)?;
	}
	Ok(())
}

pub(in crate::de) fn read_primitive<'de, R: ReadSlice<'de>, V: Visitor<'de>>(
	state: &mut DeserializerState<'_, R>,
	primitive: Primitive,
	visitor: V,
) -> Result<V::Value, DeError> {
	match primitive {
		Primitive::Boolean => visitor.visit_bool(read_bool(state)?),
		Primitive::Int8 => {
			let v = read_int(state)?;
			visitor.visit_i8(fit(v, primitive)?)
		}
		Primitive::Int16 => {
			let v = read_int(state)?;
			visitor.visit_i16(fit(v, primitive)?)
		}
		Primitive::Int32 => {
			let v = read_int(state)?;
			visitor.visit_i32(fit(v, primitive)?)
		}
		Primitive::Int64 | Primitive::Timestamp => {
			let v = read_int(state)?;
			visitor.visit_i64(fit(v, primitive)?)
		}
		Primitive::UInt8 => {
			let v = read_int(state)?;
			visitor.visit_u8(fit(v, primitive)?)
		}
		Primitive::UInt16 => {
			let v = read_int(state)?;
			visitor.visit_u16(fit(v, primitive)?)
		}
		Primitive::UInt32 => {
			let v = read_int(state)?;
			visitor.visit_u32(fit(v, primitive)?)
		}
		Primitive::UInt64 => {
			let v = read_int(state)?;
			visitor.visit_u64(fit(v, primitive)?)
		}
		Primitive::Float32 => visitor.visit_f32(read_f32_exact(state)?),
		Primitive::Float64 => visitor.visit_f64(read_f64_lenient(state)?),
		Primitive::String => {
			let len = read_str_len(state)?;
			state.read_slice(len, StringVisitor(visitor))
		}
		Primitive::Binary => {
			let len = read_bin_len(state)?;
			state.read_slice(len, BytesVisitor(visitor))
		}
		Primitive::Decimal => {
			let len = read_str_len(state)?;
			state.read_slice(len, DecimalVisitor(visitor))
		}
	}
}

fn fit<T: TryFrom<i128>>(value: i128, kind: Primitive) -> Result<T, DeError> {
	T::try_from(value).map_err(|_| {
		DeError::custom(format_args!(
			"Integer {value} does not fit {}",
			kind.name()
		))
	})
}

pub(in crate::de) struct StringVisitor<V>(pub(in crate::de) V);

impl<'de, V: Visitor<'de>> ReadVisitor<'de> for StringVisitor<V> {
	type Value = V::Value;
	fn visit(self, bytes: &[u8]) -> Result<Self::Value, DeError> {
		self.0.visit_str(utf8(bytes)?)
	}
	fn visit_borrowed(self, bytes: &'de [u8]) -> Result<Self::Value, DeError> {
		self.0.visit_borrowed_str(utf8(bytes)?)
	}
}

pub(in crate::de) struct BytesVisitor<V>(pub(in crate::de) V);

impl<'de, V: Visitor<'de>> ReadVisitor<'de> for BytesVisitor<V> {
	type Value = V::Value;
	fn visit(self, bytes: &[u8]) -> Result<Self::Value, DeError> {
		self.0.visit_bytes(bytes)
	}
	fn visit_borrowed(self, bytes: &'de [u8]) -> Result<Self::Value, DeError> {
		self.0.visit_borrowed_bytes(bytes)
	}
}

/// Validates the invariant decimal literal before handing the string on; an
/// unparseable decimal is a deserialization fault even when the target type
/// would have accepted the raw string
pub(in crate::de) struct DecimalVisitor<V>(pub(in crate::de) V);

impl<V> DecimalVisitor<V> {
	fn checked<'b>(&self, bytes: &'b [u8]) -> Result<&'b str, DeError> {
		let s = utf8(bytes)?;
		let _: rust_decimal::Decimal = s.parse().map_err(|parse_err| {
			DeError::custom(format_args!("Invalid decimal literal {s:?}: {parse_err}"))
		})?;
		Ok(s)
	}
}

impl<'de, V: Visitor<'de>> ReadVisitor<'de> for DecimalVisitor<V> {
	type Value = V::Value;
	fn visit(self, bytes: &[u8]) -> Result<Self::Value, DeError> {
		let s = self.checked(bytes)?;
		self.0.visit_str(s)
	}
	fn visit_borrowed(self, bytes: &'de [u8]) -> Result<Self::Value, DeError> {
		let s = self.checked(bytes)?;
		self.0.visit_borrowed_str(s)
	}
}

pub(in crate::de) struct ToStringVisitor;

impl<'de> ReadVisitor<'de> for ToStringVisitor {
	type Value = String;
	fn visit(self, bytes: &[u8]) -> Result<String, DeError> {
		Ok(utf8(bytes)?.to_owned())
	}
}

pub(in crate::de) struct AppendTo<'a>(pub(in crate::de) &'a mut String);

impl<'de> ReadVisitor<'de> for AppendTo<'_> {
	type Value = ();
	fn visit(self, bytes: &[u8]) -> Result<(), DeError> {
		self.0.push_str(utf8(bytes)?);
		Ok(())
	}
}

pub(in crate::de) struct Discard;

impl<'de> ReadVisitor<'de> for Discard {
	type Value = ();
	fn visit(self, _bytes: &[u8]) -> Result<(), DeError> {
		Ok(())
	}
}

fn utf8(bytes: &[u8]) -> Result<&str, DeError> {
	std::str::from_utf8(bytes)
		.map_err(|e| DeError::custom(format_args!("String is not valid UTF-8: {e}")))
}

pub(in crate::de) struct ArraySeqAccess<'r, 's, R> {
	pub(in crate::de) state: &'r mut DeserializerState<'s, R>,
	pub(in crate::de) element: &'s SchemaNode,
	pub(in crate::de) remaining: usize,
}

impl<'de, R: ReadSlice<'de>> SeqAccess<'de> for ArraySeqAccess<'_, '_, R> {
	type Error = DeError;

	fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>, Self::Error>
	where
		T: DeserializeSeed<'de>,
	{
		if self.remaining == 0 {
			return Ok(None);
		}
		self.remaining -= 1;
		seed.deserialize(DatumDeserializer {
			state: &mut *self.state,
			node: self.element,
		})
		.map(Some)
	}

	fn size_hint(&self) -> Option<usize> {
		Some(self.remaining)
	}
}

pub(in crate::de) struct TupleSeqAccess<'r, 's, R> {
	pub(in crate::de) state: &'r mut DeserializerState<'s, R>,
	pub(in crate::de) elements: std::slice::Iter<'s, SchemaKey>,
}

impl<'de, R: ReadSlice<'de>> SeqAccess<'de> for TupleSeqAccess<'_, '_, R> {
	type Error = DeError;

	fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>, Self::Error>
	where
		T: DeserializeSeed<'de>,
	{
		match self.elements.next() {
			None => Ok(None),
			Some(&element) => {
				let node = self.state.node(element);
				seed.deserialize(DatumDeserializer {
					state: &mut *self.state,
					node,
				})
				.map(Some)
			}
		}
	}

	fn size_hint(&self) -> Option<usize> {
		Some(self.elements.len())
	}
}

pub(in crate::de) struct MapMapAccess<'r, 's, R> {
	pub(in crate::de) state: &'r mut DeserializerState<'s, R>,
	pub(in crate::de) key_node: &'s SchemaNode,
	pub(in crate::de) value_node: &'s SchemaNode,
	pub(in crate::de) remaining: usize,
}

impl<'de, R: ReadSlice<'de>> MapAccess<'de> for MapMapAccess<'_, '_, R> {
	type Error = DeError;

	fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>, Self::Error>
	where
		K: DeserializeSeed<'de>,
	{
		if self.remaining == 0 {
			return Ok(None);
		}
		self.remaining -= 1;
		seed.deserialize(DatumDeserializer {
			state: &mut *self.state,
			node: self.key_node,
		})
		.map(Some)
	}

	fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value, Self::Error>
	where
		V: DeserializeSeed<'de>,
	{
		seed.deserialize(DatumDeserializer {
			state: &mut *self.state,
			node: self.value_node,
		})
	}

	fn size_hint(&self) -> Option<usize> {
		Some(self.remaining)
	}
}
