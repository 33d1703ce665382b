//! The write half: emits values as MessagePack under a write schema
//!
//! Most callers go through the typed [`Serializer`](crate::Serializer) driver
//! or [`to_vec`](crate::to_vec)/[`to_writer`](crate::to_writer); this module
//! is the layer underneath, for callers that manage schemas and writers
//! themselves.

mod error;
pub(crate) mod pack;
mod serializer;

pub use {error::SerError, serializer::*};

use crate::schema::{SchemaKey, SchemaNode, WriteSchema};

use {serde::ser::*, std::io::Write};

/// Owns the output writer for the duration of one serialization, paired with
/// the write schema that directs it
///
/// The actual [`serde::Serializer`] is the short-lived [`DatumSerializer`]
/// handed out by [`serializer`](Self::serializer); keeping the writer in a
/// separate long-lived struct is what lets record fields that arrive out of
/// wire order be staged into side buffers and flushed back here.
pub struct SerializerState<'s, W> {
	pub(crate) writer: W,
	config: SerializerConfig<'s>,
}

/// The write schema under which values are emitted
#[derive(Clone)]
pub struct SerializerConfig<'s> {
	schema: WriteSchema<'s>,
}

impl<'s> SerializerConfig<'s> {
	pub fn new(schema: WriteSchema<'s>) -> Self {
		Self { schema }
	}
}

impl<'s, W: Write> SerializerState<'s, W> {
	pub fn from_writer(writer: W, schema: WriteSchema<'s>) -> Self {
		Self::with_config(writer, SerializerConfig::new(schema))
	}

	pub fn with_config(writer: W, config: SerializerConfig<'s>) -> Self {
		Self { writer, config }
	}

	pub fn serializer<'r>(&'r mut self) -> DatumSerializer<'r, 's, W> {
		DatumSerializer {
			node: self.config.schema.node(),
			state: self,
		}
	}
}

impl<'s, W> SerializerState<'s, W> {
	pub fn config(&self) -> &SerializerConfig<'s> {
		&self.config
	}

	pub(crate) fn node(&self, key: SchemaKey) -> &'s SchemaNode {
		&self.config.schema.collection()[key]
	}

	/// Recover the writer once serialization is done
	pub fn into_writer(self) -> W {
		self.writer
	}
}
