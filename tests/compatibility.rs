//! The compatibility engine decides on schemas alone, with no byte I/O

use {
	schemapack::{
		schema::{SchemaBuilder, SchemaCollection, SchemaKey, WireSchema},
		CompatMode,
	},
	serde_derive::{Deserialize, Serialize},
};

fn compat<Writer: WireSchema, Reader: WireSchema>(mode: CompatMode) -> bool {
	let mut collection = SchemaCollection::new();
	let write = collection.get_or_add_write_schema::<Writer>();
	let read = collection.get_or_add_read_schema::<Reader>();
	let verdict = collection
		.read_schema(read)
		.can_read_from(&collection.write_schema(write), mode);
	// Relaxation is monotone: nothing strict accepts may relaxed reject
	if mode == CompatMode::Strict && verdict {
		assert!(collection
			.read_schema(read)
			.can_read_from(&collection.write_schema(write), CompatMode::Relaxed));
	}
	verdict
}

fn both_modes<Writer: WireSchema, Reader: WireSchema>() -> (bool, bool) {
	(
		compat::<Writer, Reader>(CompatMode::Strict),
		compat::<Writer, Reader>(CompatMode::Relaxed),
	)
}

macro_rules! declare_record {
	($name:ident { $($field:literal: $ty:ty),* $(,)? } $(defaults: [$($defaulted:literal),*$(,)?])?) => {
		struct $name;
		impl WireSchema for $name {
			fn append_schema(builder: &mut SchemaBuilder<'_>) -> SchemaKey {
				builder.complex(|c| {
					$(c.field::<$ty>($field);)*
					$($(c.field_with_default::<f64>($defaulted);)*)?
				})
			}
			fn wire_name() -> std::borrow::Cow<'static, str> {
				stringify!($name).into()
			}
			type TypeLookup = $name;
		}
	};
}

declare_record!(Person { "name": String, "age": i32 });
declare_record!(PersonWithScore { "name": String, "age": i32, "score": f64 });
declare_record!(PersonWithDefaultHeight { "name": String, "age": i32 } defaults: ["height"]);
declare_record!(PersonWithRequiredHeight { "name": String, "age": i32, "height": f64 });

#[test]
fn reflexivity_is_strict() {
	assert_eq!(both_modes::<Person, Person>(), (true, true));
	assert_eq!(
		both_modes::<PersonWithDefaultHeight, PersonWithDefaultHeight>(),
		(true, true)
	);
	assert_eq!(both_modes::<Vec<Person>, Vec<Person>>(), (true, true));
	assert_eq!(both_modes::<Heartbeat, Heartbeat>(), (true, true));
	assert_eq!(both_modes::<IntOrString, IntOrString>(), (true, true));
	assert_eq!(both_modes::<EnumAbc, EnumAbc>(), (true, true));
}

#[test]
fn extra_writer_field_is_relaxed_only() {
	assert_eq!(both_modes::<PersonWithScore, Person>(), (false, true));
}

#[test]
fn missing_writer_field_needs_a_reader_default_and_relaxed_mode() {
	assert_eq!(both_modes::<Person, PersonWithDefaultHeight>(), (false, true));
	assert_eq!(both_modes::<Person, PersonWithRequiredHeight>(), (false, false));
}

#[test]
fn list_compatibility_recurses_on_the_element() {
	assert_eq!(
		both_modes::<Vec<PersonWithScore>, Vec<Person>>(),
		(false, true)
	);
	assert_eq!(both_modes::<Vec<Person>, Vec<i32>>(), (false, false));
}

#[test]
fn map_compatibility_recurses_on_key_and_value() {
	use std::collections::HashMap;
	assert_eq!(
		both_modes::<HashMap<String, i32>, HashMap<String, i64>>(),
		(false, true)
	);
	assert_eq!(
		both_modes::<HashMap<i64, i32>, HashMap<i32, i32>>(),
		(false, false)
	);
}

#[test]
fn tuple_compatibility_requires_equal_arity() {
	assert_eq!(both_modes::<(i32, String), (i64, String)>(), (false, true));
	assert_eq!(both_modes::<(i32, String), (i32, String, bool)>(), (false, false));
}

#[test]
fn primitive_widening_is_relaxed_only() {
	assert_eq!(both_modes::<i8, i64>(), (false, true));
	assert_eq!(both_modes::<u8, i16>(), (false, true));
	assert_eq!(both_modes::<u32, i64>(), (false, true));
	assert_eq!(both_modes::<f32, f64>(), (false, true));
	// No narrowing, no sign crossing the other way, no int-to-float
	assert_eq!(both_modes::<i64, i32>(), (false, false));
	assert_eq!(both_modes::<i8, u16>(), (false, false));
	assert_eq!(both_modes::<u64, i64>(), (false, false));
	assert_eq!(both_modes::<f64, f32>(), (false, false));
	assert_eq!(both_modes::<i32, f64>(), (false, false));
}

#[test]
fn nullability_is_one_way() {
	// A value that is always present satisfies an optional reader
	assert_eq!(both_modes::<i32, Option<i32>>(), (true, true));
	assert_eq!(both_modes::<Option<i32>, i32>(), (false, false));
	assert_eq!(both_modes::<Option<i32>, Option<i64>>(), (false, true));
	assert_eq!(both_modes::<Option<i32>, Option<i32>>(), (true, true));
}

struct EnumAbc;
impl WireSchema for EnumAbc {
	fn append_schema(builder: &mut SchemaBuilder<'_>) -> SchemaKey {
		builder.enumeration(&["A", "B", "C"])
	}
	fn wire_name() -> std::borrow::Cow<'static, str> {
		"EnumAbc".into()
	}
	type TypeLookup = EnumAbc;
}

struct EnumAbcd;
impl WireSchema for EnumAbcd {
	fn append_schema(builder: &mut SchemaBuilder<'_>) -> SchemaKey {
		builder.enumeration(&["A", "B", "C", "D"])
	}
	fn wire_name() -> std::borrow::Cow<'static, str> {
		"EnumAbcd".into()
	}
	type TypeLookup = EnumAbcd;
}

struct EnumAbcLowercase;
impl WireSchema for EnumAbcLowercase {
	fn append_schema(builder: &mut SchemaBuilder<'_>) -> SchemaKey {
		builder.enumeration(&["a", "b", "c"])
	}
	fn wire_name() -> std::borrow::Cow<'static, str> {
		"EnumAbcLowercase".into()
	}
	type TypeLookup = EnumAbcLowercase;
}

#[test]
fn enum_reader_must_cover_writer_members() {
	// Reader superset: relaxed only. Reader subset: never.
	assert_eq!(both_modes::<EnumAbc, EnumAbcd>(), (false, true));
	assert_eq!(both_modes::<EnumAbcd, EnumAbc>(), (false, false));
	// Member comparison is case-insensitive
	assert_eq!(both_modes::<EnumAbc, EnumAbcLowercase>(), (true, true));
}

#[derive(Serialize, Deserialize)]
enum IntOrString {
	I(i32),
	S(String),
}
impl WireSchema for IntOrString {
	fn append_schema(builder: &mut SchemaBuilder<'_>) -> SchemaKey {
		builder.union(|u| {
			u.member::<i32>("I");
			u.member::<String>("S");
		})
	}
	fn wire_name() -> std::borrow::Cow<'static, str> {
		"IntOrString".into()
	}
	type TypeLookup = IntOrString;
}

#[derive(Serialize, Deserialize)]
enum IntOrStringOrFloat {
	I(i32),
	S(String),
	F(f64),
}
impl WireSchema for IntOrStringOrFloat {
	fn append_schema(builder: &mut SchemaBuilder<'_>) -> SchemaKey {
		builder.union(|u| {
			u.member::<i32>("I");
			u.member::<String>("S");
			u.member::<f64>("F");
		})
	}
	fn wire_name() -> std::borrow::Cow<'static, str> {
		"IntOrStringOrFloat".into()
	}
	type TypeLookup = IntOrStringOrFloat;
}

struct SingleMemberEnum;
impl WireSchema for SingleMemberEnum {
	fn append_schema(builder: &mut SchemaBuilder<'_>) -> SchemaKey {
		builder.enumeration(&["Only"])
	}
	fn wire_name() -> std::borrow::Cow<'static, str> {
		"SingleMemberEnum".into()
	}
	type TypeLookup = SingleMemberEnum;
}

struct SingleMemberUnion;
impl WireSchema for SingleMemberUnion {
	fn append_schema(builder: &mut SchemaBuilder<'_>) -> SchemaKey {
		builder.union(|u| u.member::<i32>("I"))
	}
	fn wire_name() -> std::borrow::Cow<'static, str> {
		"SingleMemberUnion".into()
	}
	type TypeLookup = SingleMemberUnion;
}

#[test]
fn single_member_shapes_are_reflexive() {
	assert_eq!(
		both_modes::<SingleMemberEnum, SingleMemberEnum>(),
		(true, true)
	);
	assert_eq!(
		both_modes::<SingleMemberUnion, SingleMemberUnion>(),
		(true, true)
	);
	assert_eq!(both_modes::<SingleMemberEnum, EnumAbc>(), (false, false));
	assert_eq!(both_modes::<SingleMemberUnion, IntOrString>(), (false, true));
}

#[test]
fn union_widening_is_relaxed_only() {
	assert_eq!(both_modes::<IntOrString, IntOrStringOrFloat>(), (false, true));
}

#[test]
fn union_narrowing_is_forbidden_in_both_modes() {
	// Even if the actual payload would have been dispatchable, the engine
	// decides on schemas alone
	assert_eq!(both_modes::<IntOrStringOrFloat, IntOrString>(), (false, false));
}

struct Heartbeat;
impl WireSchema for Heartbeat {
	fn append_schema(builder: &mut SchemaBuilder<'_>) -> SchemaKey {
		builder.empty()
	}
	fn wire_name() -> std::borrow::Cow<'static, str> {
		"Heartbeat".into()
	}
	type TypeLookup = Heartbeat;
}

#[test]
fn empty_reader_accepts_any_writer_in_relaxed_mode() {
	assert_eq!(both_modes::<Person, Heartbeat>(), (false, true));
	assert_eq!(both_modes::<IntOrString, Heartbeat>(), (false, true));
	assert_eq!(both_modes::<i32, Heartbeat>(), (false, true));
}

#[test]
fn empty_writer_satisfies_only_empty_readers() {
	assert_eq!(both_modes::<Heartbeat, Person>(), (false, false));
	assert_eq!(both_modes::<Heartbeat, i32>(), (false, false));
}

#[test]
fn cross_variant_never_matches() {
	assert_eq!(both_modes::<Person, IntOrString>(), (false, false));
	assert_eq!(both_modes::<IntOrString, Person>(), (false, false));
	assert_eq!(both_modes::<Vec<i32>, (i32,)>(), (false, false));
	assert_eq!(both_modes::<EnumAbc, Person>(), (false, false));
}

struct Tree;
impl WireSchema for Tree {
	fn append_schema(builder: &mut SchemaBuilder<'_>) -> SchemaKey {
		builder.complex(|c| {
			c.field::<i32>("value");
			c.field::<Vec<Tree>>("children");
		})
	}
	fn wire_name() -> std::borrow::Cow<'static, str> {
		"Tree".into()
	}
	type TypeLookup = Tree;
}

struct WideTree;
impl WireSchema for WideTree {
	fn append_schema(builder: &mut SchemaBuilder<'_>) -> SchemaKey {
		builder.complex(|c| {
			c.field::<i64>("value");
			c.field::<Vec<WideTree>>("children");
		})
	}
	fn wire_name() -> std::borrow::Cow<'static, str> {
		"WideTree".into()
	}
	type TypeLookup = WideTree;
}

#[test]
fn cyclic_schemas_terminate() {
	assert_eq!(both_modes::<Tree, Tree>(), (true, true));
	assert_eq!(both_modes::<Tree, WideTree>(), (false, true));
	assert_eq!(both_modes::<WideTree, Tree>(), (false, false));
}

#[test]
fn compatibility_works_across_collections() {
	let mut writer_collection = SchemaCollection::new();
	let write = writer_collection.get_or_add_write_schema::<PersonWithScore>();
	let mut reader_collection = SchemaCollection::new();
	let read = reader_collection.get_or_add_read_schema::<Person>();
	assert!(reader_collection
		.read_schema(read)
		.can_read_from(&writer_collection.write_schema(write), CompatMode::Relaxed));
	assert!(!reader_collection
		.read_schema(read)
		.can_read_from(&writer_collection.write_schema(write), CompatMode::Strict));
}

#[test]
fn compatibility_holds_for_schemas_loaded_from_xml() {
	let mut collection = SchemaCollection::new();
	let write = collection.get_or_add_write_schema::<PersonWithScore>();
	let xml = collection.to_xml(write);
	let (loaded, loaded_root) = SchemaCollection::from_xml(&xml).unwrap();

	let mut reader_collection = SchemaCollection::new();
	let read = reader_collection.get_or_add_read_schema::<Person>();
	assert!(reader_collection
		.read_schema(read)
		.can_read_from(&loaded.write_schema(loaded_root), CompatMode::Relaxed));
}
