//! The read half: parses MessagePack into values under a read schema
//!
//! Most callers go through the typed [`Deserializer`](crate::Deserializer)
//! driver or [`from_slice`](crate::from_slice)/[`from_reader`](crate::from_reader).
//! Dropping down here buys control over the input source (slice vs reader,
//! see [`read`]) and over [`DeserializerConfig`]'s runtime knobs.

mod deserializer;
mod error;
pub mod read;

pub use {deserializer::*, error::DeError};
use read::*;

use crate::schema::{ReadSchema, SchemaKey, SchemaNode};

use serde::de::*;

/// What to do when the wire carries a field the read schema does not know
///
/// This is a runtime knob, not a schema property: a schema pair declared
/// compatible under relaxed mode may still fault at runtime under `Throw`
/// when the writer has extra fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum UnexpectedFieldPolicy {
	/// Fault with an unexpected-field error
	#[default]
	Throw,
	/// Skip the value and carry on
	Ignore,
}

/// Owns the input source for the duration of one deserialization, paired
/// with the read schema and runtime policies that direct it
///
/// The actual [`serde::Deserializer`] is the short-lived
/// [`DatumDeserializer`] handed out by [`deserializer`](Self::deserializer);
/// every nested access object (record merge-walk, sequence, union) reborrows
/// this state to continue consuming the same stream.
pub struct DeserializerState<'s, R> {
	pub(crate) reader: R,
	config: DeserializerConfig<'s>,
}

/// The read schema values are parsed under, plus runtime policies
#[derive(Clone)]
pub struct DeserializerConfig<'s> {
	schema: ReadSchema<'s>,
	pub unexpected_field_policy: UnexpectedFieldPolicy,
	/// Safeguard against corrupt collection headers
	pub max_seq_size: usize,
}

impl<'s> DeserializerConfig<'s> {
	pub fn new(schema: ReadSchema<'s>) -> Self {
		Self {
			schema,
			unexpected_field_policy: UnexpectedFieldPolicy::default(),
			max_seq_size: 1_000_000_000,
		}
	}
}

impl<'s, 'de, R: ReadSlice<'de>> DeserializerState<'s, R> {
	pub fn new(reader: R, schema: ReadSchema<'s>) -> Self {
		Self::with_config(reader, DeserializerConfig::new(schema))
	}

	pub fn with_config(reader: R, config: DeserializerConfig<'s>) -> Self {
		Self { reader, config }
	}

	pub fn deserializer<'r>(&'r mut self) -> DatumDeserializer<'r, 's, R> {
		DatumDeserializer {
			node: self.config.schema.node(),
			state: self,
		}
	}
}

impl<'s, R> DeserializerState<'s, R> {
	pub fn config(&self) -> &DeserializerConfig<'s> {
		&self.config
	}

	pub(crate) fn node(&self, key: SchemaKey) -> &'s SchemaNode {
		&self.config.schema.collection()[key]
	}

	pub fn into_reader(self) -> R {
		self.reader
	}
}

impl<'s, 'a> DeserializerState<'s, read::SliceRead<'a>> {
	pub fn from_slice(slice: &'a [u8], schema: ReadSchema<'s>) -> Self {
		Self::new(read::SliceRead::new(slice), schema)
	}
}

impl<'s, R: std::io::BufRead> DeserializerState<'s, read::ReaderRead<R>> {
	pub fn from_reader(reader: R, schema: ReadSchema<'s>) -> Self {
		Self::new(read::ReaderRead::new(reader), schema)
	}
}

impl<R> std::ops::Deref for DeserializerState<'_, R> {
	type Target = R;
	fn deref(&self) -> &Self::Target {
		&self.reader
	}
}

impl<R> std::ops::DerefMut for DeserializerState<'_, R> {
	fn deref_mut(&mut self) -> &mut Self::Target {
		&mut self.reader
	}
}
