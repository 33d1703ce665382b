use super::*;

use crate::schema::{ascii_ci_eq, ComplexSchema};

/// Writes serde structs as records (field reordering included), string-keyed
/// maps, or the empty message
pub struct SerializeStructValue<'r, 's, W> {
	pub(super) kind: StructKind<'r, 's, W>,
}

pub(super) enum StructKind<'r, 's, W> {
	Record {
		state: &'r mut SerializerState<'s, W>,
		record: RecordState<'s>,
	},
	Mapping {
		state: &'r mut SerializerState<'s, W>,
		key_node: &'s SchemaNode,
		value_node: &'s SchemaNode,
		declared: usize,
		written: usize,
	},
	Empty,
}

pub(super) struct RecordState<'s> {
	complex: &'s ComplexSchema,
	/// Index of the next field to hit the wire; everything before it is out
	current_idx: usize,
	/// Values serde supplied ahead of their wire position, pre-serialized
	buffers: Vec<Option<Vec<u8>>>,
}

impl<'r, 's, W: Write> SerializeStructValue<'r, 's, W> {
	pub(super) fn record(
		state: &'r mut SerializerState<'s, W>,
		complex: &'s ComplexSchema,
	) -> Result<Self, SerError> {
		// The write schema is exhaustive: exactly one entry per field
		pack::write_map_len(&mut state.writer, complex.fields.len())?;
		Ok(Self {
			kind: StructKind::Record {
				state,
				record: RecordState {
					complex,
					current_idx: 0,
					buffers: Vec::new(),
				},
			},
		})
	}

	pub(super) fn mapping(
		state: &'r mut SerializerState<'s, W>,
		key: crate::schema::SchemaKey,
		value: crate::schema::SchemaKey,
		declared: usize,
	) -> Self {
		let key_node = state.node(key);
		let value_node = state.node(value);
		Self {
			kind: StructKind::Mapping {
				state,
				key_node,
				value_node,
				declared,
				written: 0,
			},
		}
	}

	pub(super) fn empty() -> Self {
		Self {
			kind: StructKind::Empty,
		}
	}

	fn end(self) -> Result<(), SerError> {
		match self.kind {
			StructKind::Record {
				state,
				record:
					RecordState {
						complex,
						mut current_idx,
						mut buffers,
					},
			} => {
				while current_idx < complex.fields.len() {
					if let Some(buffered) =
						buffers.get_mut(current_idx).and_then(Option::take)
					{
						pack::write_str(
							&mut state.writer,
							&complex.fields[current_idx].name,
						)?;
						state.writer.write_all(&buffered).map_err(SerError::io)?;
						current_idx += 1;
						continue;
					}
					let field = &complex.fields[current_idx];
					// An unsupplied optional field degrades to null; anything
					// else is a hole the header already promised to fill
					match state.node(field.schema) {
						SchemaNode::Nullable(_) => {
							pack::write_str(&mut state.writer, &field.name)?;
							pack::write_nil(&mut state.writer)?;
						}
						_ => {
							return Err(SerError::custom(format_args!(
								"Missing field {:?} in record",
								field.name
							)))
						}
					}
					current_idx += 1;
				}
				debug_assert!(buffers.iter().all(Option::is_none));
				Ok(())
			}
			StructKind::Mapping {
				declared, written, ..
			} => {
				if written != declared {
					return Err(SerError::custom(format_args!(
						"Map advertised {declared} entries but {written} were serialized"
					)));
				}
				Ok(())
			}
			StructKind::Empty => Ok(()),
		}
	}
}

fn field_location(record: &RecordState<'_>, name: &str) -> Result<(usize, crate::schema::SchemaKey), SerError> {
	let fields = &record.complex.fields;
	if let Some(field) = fields.get(record.current_idx) {
		// Fast case: serde supplies the fields already in wire order
		if ascii_ci_eq(&field.name, name) {
			return Ok((record.current_idx, field.schema));
		}
	}
	match record.complex.field_index(name) {
		None => Err(SerError::custom(format_args!(
			"Attempting to serialize field that doesn't exist in the record schema: {name}"
		))),
		Some(idx) => {
			if idx < record.current_idx
				|| record.buffers.get(idx).map_or(false, Option::is_some)
			{
				Err(same_field_twice(name))
			} else {
				Ok((idx, fields[idx].schema))
			}
		}
	}
}

fn serialize_record_value<'s, W: Write, T: ?Sized>(
	state: &mut SerializerState<'s, W>,
	record: &mut RecordState<'s>,
	field_idx: usize,
	schema: crate::schema::SchemaKey,
	value: &T,
) -> Result<(), SerError>
where
	T: Serialize,
{
	if field_idx == record.current_idx {
		pack::write_str(&mut state.writer, &record.complex.fields[field_idx].name)?;
		let node = state.node(schema);
		value.serialize(DatumSerializer {
			state: &mut *state,
			node,
		})?;
		record.current_idx += 1;
		// Whatever was buffered ahead of us may now be contiguous
		while let Some(buffered) = record
			.buffers
			.get_mut(record.current_idx)
			.and_then(Option::take)
		{
			pack::write_str(
				&mut state.writer,
				&record.complex.fields[record.current_idx].name,
			)?;
			state.writer.write_all(&buffered).map_err(SerError::io)?;
			record.current_idx += 1;
		}
		Ok(())
	} else {
		if record.buffers.len() <= field_idx {
			record.buffers.resize(field_idx + 1, None);
		}
		if record.buffers[field_idx].is_some() {
			return Err(same_field_twice(&record.complex.fields[field_idx].name));
		}
		let mut buffer = Vec::new();
		{
			let config = state.config().clone();
			let mut nested = SerializerState::with_config(&mut buffer, config);
			let node = nested.node(schema);
			value.serialize(DatumSerializer {
				state: &mut nested,
				node,
			})?;
		}
		record.buffers[field_idx] = Some(buffer);
		Ok(())
	}
}

fn same_field_twice(name: &str) -> SerError {
	SerError::custom(format_args!(
		"Attempting to serialize field with the same name twice in record (field name: {name:?})"
	))
}

impl<'r, 's, W: Write> SerializeStruct for SerializeStructValue<'r, 's, W> {
	type Ok = ();
	type Error = SerError;

	fn serialize_field<T: ?Sized>(
		&mut self,
		key: &'static str,
		value: &T,
	) -> Result<(), Self::Error>
	where
		T: Serialize,
	{
		match &mut self.kind {
			StructKind::Record { state, record } => {
				let (field_idx, schema) = field_location(record, key)?;
				serialize_record_value(state, record, field_idx, schema, value)
			}
			StructKind::Mapping {
				state,
				key_node,
				value_node,
				declared,
				written,
			} => {
				if !matches!(key_node, SchemaNode::Primitive(crate::schema::Primitive::String)) {
					return Err(SerError::new(
						"Struct fields can only feed a dictionary whose key schema is string",
					));
				}
				if *written == *declared {
					return Err(SerError::custom(format_args!(
						"Map advertised {declared} entries but more were serialized"
					)));
				}
				pack::write_str(&mut state.writer, key)?;
				value.serialize(DatumSerializer {
					state,
					node: *value_node,
				})?;
				*written += 1;
				Ok(())
			}
			StructKind::Empty => Err(SerError::custom(format_args!(
				"The empty message has no fields, got {key:?}"
			))),
		}
	}

	fn end(self) -> Result<Self::Ok, Self::Error> {
		self.end()
	}
}

impl<'r, 's, W: Write> SerializeStructVariant for SerializeStructValue<'r, 's, W> {
	type Ok = ();
	type Error = SerError;

	fn serialize_field<T: ?Sized>(
		&mut self,
		key: &'static str,
		value: &T,
	) -> Result<(), Self::Error>
	where
		T: Serialize,
	{
		<Self as SerializeStruct>::serialize_field(self, key, value)
	}

	fn end(self) -> Result<Self::Ok, Self::Error> {
		<Self as SerializeStruct>::end(self)
	}
}

/// [`SerializeMap`] face of [`SerializeStructValue`]: map keys name record
/// fields (or dictionary keys) one call ahead of their values
pub struct SerializeMapValue<'r, 's, W> {
	inner: SerializeStructValue<'r, 's, W>,
	key_hint: KeyHint,
}

enum KeyHint {
	None,
	Field {
		field_idx: usize,
		schema: crate::schema::SchemaKey,
	},
}

impl<'r, 's, W: Write> SerializeMapValue<'r, 's, W> {
	pub(super) fn record(
		state: &'r mut SerializerState<'s, W>,
		complex: &'s ComplexSchema,
	) -> Result<Self, SerError> {
		Ok(Self {
			inner: SerializeStructValue::record(state, complex)?,
			key_hint: KeyHint::None,
		})
	}

	pub(super) fn mapping(
		state: &'r mut SerializerState<'s, W>,
		key: crate::schema::SchemaKey,
		value: crate::schema::SchemaKey,
		declared: usize,
	) -> Self {
		Self {
			inner: SerializeStructValue::mapping(state, key, value, declared),
			key_hint: KeyHint::None,
		}
	}

	pub(super) fn empty() -> Self {
		Self {
			inner: SerializeStructValue::empty(),
			key_hint: KeyHint::None,
		}
	}
}

impl<'r, 's, W: Write> SerializeMap for SerializeMapValue<'r, 's, W> {
	type Ok = ();
	type Error = SerError;

	fn serialize_key<T: ?Sized>(&mut self, key: &T) -> Result<(), Self::Error>
	where
		T: Serialize,
	{
		match &mut self.inner.kind {
			StructKind::Record { record, .. } => {
				let (field_idx, schema) = key.serialize(FindFieldIndexSerializer { record })?;
				self.key_hint = KeyHint::Field { field_idx, schema };
				Ok(())
			}
			StructKind::Mapping {
				state,
				key_node,
				declared,
				written,
				..
			} => {
				if *written == *declared {
					return Err(SerError::custom(format_args!(
						"Map advertised {declared} entries but more were serialized"
					)));
				}
				key.serialize(DatumSerializer {
					state,
					node: *key_node,
				})
			}
			StructKind::Empty => Err(SerError::new("The empty message has no entries")),
		}
	}

	fn serialize_value<T: ?Sized>(&mut self, value: &T) -> Result<(), Self::Error>
	where
		T: Serialize,
	{
		match &mut self.inner.kind {
			StructKind::Record { state, record } => {
				match std::mem::replace(&mut self.key_hint, KeyHint::None) {
					KeyHint::Field { field_idx, schema } => {
						serialize_record_value(state, record, field_idx, schema, value)
					}
					KeyHint::None => {
						panic!("serialize_key should have been called before serialize_value")
					}
				}
			}
			StructKind::Mapping {
				state,
				value_node,
				written,
				..
			} => {
				value.serialize(DatumSerializer {
					state,
					node: *value_node,
				})?;
				*written += 1;
				Ok(())
			}
			StructKind::Empty => Err(SerError::new("The empty message has no entries")),
		}
	}

	fn end(self) -> Result<Self::Ok, Self::Error> {
		self.inner.end()
	}
}

struct FindFieldIndexSerializer<'record, 's> {
	record: &'record RecordState<'s>,
}

impl<'s> serde::Serializer for FindFieldIndexSerializer<'_, 's> {
	type Ok = (usize, crate::schema::SchemaKey);
	type Error = SerError;

	fn serialize_str(self, v: &str) -> Result<Self::Ok, Self::Error> {
		field_location(self.record, v)
	}

	serde_serializer_quick_unsupported::serializer_unsupported! {
		err = (SerError::new("Key of map being serialized as record should have been an str"));
		bool i8 i16 i32 i64 u8 u16 u32 u64 f32 f64 char bytes none some unit unit_struct
		unit_variant newtype_struct newtype_variant seq tuple tuple_struct tuple_variant map struct
		struct_variant i128 u128
	}
}
