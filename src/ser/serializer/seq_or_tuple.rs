use super::*;

/// Writes serde sequences and tuples as MessagePack arrays
///
/// The array header is emitted by the caller; this only polices element
/// counts and routes each element to its schema.
pub struct SerializeSeqOrTuple<'r, 's, W> {
	kind: SeqKind<'r, 's, W>,
}

enum SeqKind<'r, 's, W> {
	Sequence {
		state: &'r mut SerializerState<'s, W>,
		element: SchemaKey,
		remaining: usize,
	},
	Tuple {
		state: &'r mut SerializerState<'s, W>,
		elements: std::slice::Iter<'s, SchemaKey>,
	},
}

impl<'r, 's, W: Write> SerializeSeqOrTuple<'r, 's, W> {
	pub(super) fn sequence(
		state: &'r mut SerializerState<'s, W>,
		element: SchemaKey,
		len: usize,
	) -> Self {
		Self {
			kind: SeqKind::Sequence {
				state,
				element,
				remaining: len,
			},
		}
	}

	pub(super) fn tuple(state: &'r mut SerializerState<'s, W>, elements: &'s [SchemaKey]) -> Self {
		Self {
			kind: SeqKind::Tuple {
				state,
				elements: elements.iter(),
			},
		}
	}

	fn serialize_element<T: ?Sized>(&mut self, value: &T) -> Result<(), SerError>
	where
		T: Serialize,
	{
		match &mut self.kind {
			SeqKind::Sequence {
				state,
				element,
				remaining,
			} => {
				if *remaining == 0 {
					return Err(SerError::new(
						"Sequence holds more elements than its advertised length",
					));
				}
				*remaining -= 1;
				let node = state.node(*element);
				value.serialize(DatumSerializer { state, node })
			}
			SeqKind::Tuple { state, elements } => match elements.next() {
				None => Err(SerError::new("Tuple holds more elements than its arity")),
				Some(&element) => {
					let node = state.node(element);
					value.serialize(DatumSerializer { state, node })
				}
			},
		}
	}

	fn end_checked(self) -> Result<(), SerError> {
		match self.kind {
			SeqKind::Sequence { remaining, .. } => {
				if remaining != 0 {
					return Err(SerError::new(
						"Sequence holds fewer elements than its advertised length",
					));
				}
				Ok(())
			}
			SeqKind::Tuple { mut elements, .. } => {
				if elements.next().is_some() {
					return Err(SerError::new("Tuple holds fewer elements than its arity"));
				}
				Ok(())
			}
		}
	}
}

macro_rules! impl_serialize_seq_or_tuple {
	($($trait_:ident $f:ident,)+) => {
		$(
			impl<'r, 's, W: Write> $trait_ for SerializeSeqOrTuple<'r, 's, W> {
				type Ok = ();
				type Error = SerError;

				fn $f<T: ?Sized>(&mut self, value: &T) -> Result<(), Self::Error>
				where
					T: Serialize,
				{
					self.serialize_element(value)
				}

				fn end(self) -> Result<Self::Ok, Self::Error> {
					self.end_checked()
				}
			}
		)+
	};
}
impl_serialize_seq_or_tuple! {
	SerializeSeq serialize_element,
	SerializeTuple serialize_element,
	SerializeTupleStruct serialize_field,
	SerializeTupleVariant serialize_field,
}
