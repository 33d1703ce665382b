use super::*;

use crate::{
	de::UnexpectedFieldPolicy,
	schema::{ascii_ci_cmp, FieldSchema},
};

use std::cmp::Ordering;

/// Single-pass merge of the reader's sorted field list against the incoming
/// wire entries, which the writer also emits in case-insensitive
/// lexicographic order
///
/// Fields the wire omits are never surfaced to serde when they carry a
/// default (`#[serde(default)]` fabricates the value); fields the reader does
/// not know go through the unexpected-field policy.
pub(in crate::de) struct RecordMapAccess<'r, 's, R> {
	state: &'r mut DeserializerState<'s, R>,
	fields: std::slice::Iter<'s, FieldSchema>,
	remaining_entries: usize,
	pending: Option<&'s FieldSchema>,
	key_scratch: String,
}

impl<'r, 's, R> RecordMapAccess<'r, 's, R> {
	pub(in crate::de) fn new(
		state: &'r mut DeserializerState<'s, R>,
		fields: &'s [FieldSchema],
		entries: usize,
	) -> Self {
		Self {
			state,
			fields: fields.iter(),
			remaining_entries: entries,
			pending: None,
			key_scratch: String::new(),
		}
	}
}

impl<'de, R: ReadSlice<'de>> RecordMapAccess<'_, '_, R> {
	fn unexpected_incoming(&mut self) -> Result<(), DeError> {
		match self.state.config().unexpected_field_policy {
			UnexpectedFieldPolicy::Throw => Err(DeError::unexpected_field(&self.key_scratch)),
			UnexpectedFieldPolicy::Ignore => skip_value(self.state),
		}
	}
}

impl<'de, R: ReadSlice<'de>> MapAccess<'de> for RecordMapAccess<'_, '_, R> {
	type Error = DeError;

	fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>, Self::Error>
	where
		K: DeserializeSeed<'de>,
	{
		debug_assert!(self.pending.is_none());
		'incoming: while self.remaining_entries > 0 {
			self.key_scratch.clear();
			read_str_into(self.state, &mut self.key_scratch)?;
			loop {
				let Some(field) = self.fields.as_slice().first() else {
					// Everything the reader expects has been matched; the
					// rest of the wire is unknown to it
					self.unexpected_incoming()?;
					self.remaining_entries -= 1;
					continue 'incoming;
				};
				match ascii_ci_cmp(&self.key_scratch, &field.name) {
					Ordering::Equal => {
						self.fields.next();
						self.remaining_entries -= 1;
						self.pending = Some(field);
						let key = serde::de::value::StrDeserializer::<DeError>::new(&field.name);
						return seed.deserialize(key).map(Some);
					}
					Ordering::Greater => {
						// The incoming key sorts after the expected one, so
						// the expected field is absent from the wire
						if !field.has_default {
							return Err(DeError::missing_required_field(&field.name));
						}
						self.fields.next();
					}
					Ordering::Less => {
						self.unexpected_incoming()?;
						self.remaining_entries -= 1;
						continue 'incoming;
					}
				}
			}
		}
		// Wire exhausted: whatever is still expected must be defaultable
		while let Some(field) = self.fields.as_slice().first() {
			if !field.has_default {
				return Err(DeError::missing_required_field(&field.name));
			}
			self.fields.next();
		}
		Ok(None)
	}

	fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value, Self::Error>
	where
		V: DeserializeSeed<'de>,
	{
		let field = self
			.pending
			.take()
			.expect("next_value_seed called before next_key_seed");
		let node = self.state.node(field.schema);
		seed.deserialize(DatumDeserializer {
			state: &mut *self.state,
			node,
		})
	}
}
