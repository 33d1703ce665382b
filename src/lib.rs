//! # Getting started
//!
//! ```
//! use schemapack::schema::{SchemaBuilder, SchemaKey, WireSchema};
//!
//! #[derive(serde_derive::Serialize, serde_derive::Deserialize, Debug, PartialEq)]
//! struct Person {
//! 	name: String,
//! 	age: i32,
//! }
//!
//! impl WireSchema for Person {
//! 	fn append_schema(builder: &mut SchemaBuilder<'_>) -> SchemaKey {
//! 		builder.complex(|c| {
//! 			c.field::<String>("name");
//! 			c.field::<i32>("age");
//! 		})
//! 	}
//! 	fn wire_name() -> std::borrow::Cow<'static, str> {
//! 		"Person".into()
//! 	}
//! 	type TypeLookup = Person;
//! }
//!
//! let bob = Person {
//! 	name: "Bob".to_owned(),
//! 	age: 36,
//! };
//! let bytes = schemapack::to_vec(&bob).expect("Failed to serialize");
//! assert_eq!(
//! 	schemapack::from_slice::<Person>(&bytes).expect("Failed to deserialize"),
//! 	bob
//! );
//! ```
//!
//! # Schema-checked MessagePack (de)serialization
//!
//! Every type that implements [`WireSchema`] derives a *write schema* (what a
//! serializer produces) and a *read schema* (what a deserializer expects).
//! The wire format is standard MessagePack; records travel as maps keyed by
//! field name, in case-insensitive lexicographic order, which makes reading a
//! single forward pass and makes compatibility checking a merge of sorted
//! lists.
//!
//! Two schemas can be compared ahead of time, with no byte I/O:
//!
//! ```
//! # use schemapack::schema::{SchemaBuilder, SchemaKey, WireSchema};
//! # struct Person;
//! # impl WireSchema for Person {
//! # 	fn append_schema(builder: &mut SchemaBuilder<'_>) -> SchemaKey {
//! # 		builder.complex(|c| {
//! # 			c.field::<String>("name");
//! # 			c.field::<i32>("age");
//! # 		})
//! # 	}
//! # 	fn wire_name() -> std::borrow::Cow<'static, str> {
//! # 		"Person".into()
//! # 	}
//! # 	type TypeLookup = Person;
//! # }
//! use schemapack::{schema::SchemaCollection, CompatMode};
//!
//! let mut collection = SchemaCollection::new();
//! let write = collection.get_or_add_write_schema::<Person>();
//! let read = collection.get_or_add_read_schema::<Person>();
//! assert!(collection
//! 	.read_schema(read)
//! 	.can_read_from(&collection.write_schema(write), CompatMode::Strict));
//! ```

pub mod de;
pub mod schema;
pub mod ser;

mod marker;

pub use {
	de::{DeError, UnexpectedFieldPolicy},
	schema::{CompatMode, SchemaCollection, WireSchema},
	ser::SerError,
};

use crate::schema::{Primitive, ReadSchema, SchemaBuilder, SchemaKey, WriteSchema};

use std::marker::PhantomData;

/// An instant on the wire: milliseconds since the Unix epoch, carried as a
/// plain int64
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(pub i64);

impl serde::Serialize for Timestamp {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: serde::Serializer,
	{
		serializer.serialize_i64(self.0)
	}
}

impl<'de> serde::Deserialize<'de> for Timestamp {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: serde::Deserializer<'de>,
	{
		serde::Deserialize::deserialize(deserializer).map(Timestamp)
	}
}

impl WireSchema for Timestamp {
	fn append_schema(builder: &mut SchemaBuilder<'_>) -> SchemaKey {
		builder.primitive(Primitive::Timestamp)
	}
	fn wire_name() -> std::borrow::Cow<'static, str> {
		std::borrow::Cow::Borrowed(Primitive::Timestamp.name())
	}
	type TypeLookup = Timestamp;
}

/// Typed write driver: derives `T`'s write schema once, then serializes any
/// number of values under it
///
/// Stateless across calls; one instance may serve many threads as long as
/// each call owns its writer.
pub struct Serializer<T> {
	collection: SchemaCollection,
	root: SchemaKey,
	_type: PhantomData<fn(T)>,
}

impl<T: WireSchema + serde::Serialize> Serializer<T> {
	pub fn new() -> Self {
		Self::with_collection(SchemaCollection::new())
	}

	/// Derive into an existing collection, sharing its by-reference shapes
	pub fn with_collection(mut collection: SchemaCollection) -> Self {
		let root = collection.get_or_add_write_schema::<T>();
		Self {
			collection,
			root,
			_type: PhantomData,
		}
	}

	pub fn write_schema(&self) -> WriteSchema<'_> {
		self.collection.write_schema(self.root)
	}

	pub fn serialize<W: std::io::Write>(&self, writer: W, value: &T) -> Result<(), SerError> {
		let mut state = ser::SerializerState::from_writer(writer, self.write_schema());
		serde::Serialize::serialize(value, state.serializer())
	}

	pub fn to_vec(&self, value: &T) -> Result<Vec<u8>, SerError> {
		let mut out = Vec::new();
		self.serialize(&mut out, value)?;
		Ok(out)
	}

	pub fn collection(&self) -> &SchemaCollection {
		&self.collection
	}

	pub fn into_collection(self) -> SchemaCollection {
		self.collection
	}
}

impl<T: WireSchema + serde::Serialize> Default for Serializer<T> {
	fn default() -> Self {
		Self::new()
	}
}

/// Typed read driver: derives `T`'s read schema once, then deserializes any
/// number of messages under it with a fixed unexpected-field policy
pub struct Deserializer<T> {
	collection: SchemaCollection,
	root: SchemaKey,
	policy: UnexpectedFieldPolicy,
	_type: PhantomData<fn() -> T>,
}

impl<T: WireSchema + serde::de::DeserializeOwned> Deserializer<T> {
	pub fn new(policy: UnexpectedFieldPolicy) -> Self {
		Self::with_collection(policy, SchemaCollection::new())
	}

	/// Derive into an existing collection, sharing its by-reference shapes
	pub fn with_collection(policy: UnexpectedFieldPolicy, mut collection: SchemaCollection) -> Self {
		let root = collection.get_or_add_read_schema::<T>();
		Self {
			collection,
			root,
			policy,
			_type: PhantomData,
		}
	}

	pub fn read_schema(&self) -> ReadSchema<'_> {
		self.collection.read_schema(self.root)
	}

	pub fn deserialize<R: std::io::BufRead>(&self, reader: R) -> Result<T, DeError> {
		let mut config = de::DeserializerConfig::new(self.read_schema());
		config.unexpected_field_policy = self.policy;
		let mut state =
			de::DeserializerState::with_config(de::read::ReaderRead::new(reader), config);
		serde::Deserialize::deserialize(state.deserializer())
			.map_err(|e| e.with_target(std::any::type_name::<T>()))
	}

	pub fn deserialize_slice(&self, slice: &[u8]) -> Result<T, DeError> {
		let mut config = de::DeserializerConfig::new(self.read_schema());
		config.unexpected_field_policy = self.policy;
		let mut state =
			de::DeserializerState::with_config(de::read::SliceRead::new(slice), config);
		serde::Deserialize::deserialize(state.deserializer())
			.map_err(|e| e.with_target(std::any::type_name::<T>()))
	}

	pub fn collection(&self) -> &SchemaCollection {
		&self.collection
	}

	pub fn into_collection(self) -> SchemaCollection {
		self.collection
	}
}

/// Serialize a value to the provided writer under its derived write schema
pub fn to_writer<W, T>(writer: W, value: &T) -> Result<(), SerError>
where
	W: std::io::Write,
	T: WireSchema + serde::Serialize,
{
	Serializer::<T>::new().serialize(writer, value)
}

/// Serialize a value to a fresh byte vector under its derived write schema
pub fn to_vec<T>(value: &T) -> Result<Vec<u8>, SerError>
where
	T: WireSchema + serde::Serialize,
{
	Serializer::<T>::new().to_vec(value)
}

/// Deserialize from a byte slice under `T`'s derived read schema
///
/// This is zero-copy where the target type borrows (`&'a str` fields end up
/// pointing into the slice). Unexpected fields fault; construct a
/// [`Deserializer`] with [`UnexpectedFieldPolicy::Ignore`] for the lenient
/// behavior.
pub fn from_slice<'de, T>(slice: &'de [u8]) -> Result<T, DeError>
where
	T: WireSchema + serde::Deserialize<'de>,
{
	let mut collection = SchemaCollection::new();
	let root = collection.get_or_add_read_schema::<T>();
	let mut state = de::DeserializerState::from_slice(slice, collection.read_schema(root));
	serde::Deserialize::deserialize(state.deserializer())
		.map_err(|e| e.with_target(std::any::type_name::<T>()))
}

/// Deserialize from an `impl BufRead` under `T`'s derived read schema
///
/// If deserializing from a slice, a `Vec`, ... prefer [`from_slice`]: it is
/// more performant and lets the target borrow from the input.
pub fn from_reader<R, T>(reader: R) -> Result<T, DeError>
where
	R: std::io::BufRead,
	T: WireSchema + serde::de::DeserializeOwned,
{
	let mut collection = SchemaCollection::new();
	let root = collection.get_or_add_read_schema::<T>();
	let mut state = de::DeserializerState::from_reader(reader, collection.read_schema(root));
	serde::Deserialize::deserialize(state.deserializer())
		.map_err(|e| e.with_target(std::any::type_name::<T>()))
}
