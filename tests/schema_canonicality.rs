//! Canonical forms, the XML interchange form, and schema identity rules

use {
	pretty_assertions::assert_eq,
	schemapack::schema::{
		SchemaBuilder, SchemaCollection, SchemaKey, SchemaNode, WireSchema,
	},
};

struct Person;
impl WireSchema for Person {
	fn append_schema(builder: &mut SchemaBuilder<'_>) -> SchemaKey {
		builder.complex(|c| {
			c.field::<String>("name");
			c.field::<i32>("age");
			c.field_with_default::<Option<f64>>("height");
		})
	}
	fn wire_name() -> std::borrow::Cow<'static, str> {
		"Person".into()
	}
	type TypeLookup = Person;
}

/// Same structure as [`Person`], declared independently
struct Employee;
impl WireSchema for Employee {
	fn append_schema(builder: &mut SchemaBuilder<'_>) -> SchemaKey {
		builder.complex(|c| {
			c.field_with_default::<Option<f64>>("height");
			c.field::<i32>("age");
			c.field::<String>("name");
		})
	}
	fn wire_name() -> std::borrow::Cow<'static, str> {
		"Employee".into()
	}
	type TypeLookup = Employee;
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

struct Message;
impl WireSchema for Message {
	fn append_schema(builder: &mut SchemaBuilder<'_>) -> SchemaKey {
		builder.union(|u| {
			u.member::<Person>("P");
			u.member::<i64>("N");
		})
	}
	fn wire_name() -> std::borrow::Cow<'static, str> {
		"Message".into()
	}
	type TypeLookup = Message;
}

#[test]
fn complex_fields_are_sorted_and_unique() {
	let mut collection = SchemaCollection::new();
	let key = collection.get_or_add_write_schema::<Person>();
	let SchemaNode::Complex(complex) = &collection[key] else {
		panic!("expected a complex schema");
	};
	let names: Vec<&str> = complex.fields.iter().map(|f| f.name.as_str()).collect();
	assert_eq!(names, ["age", "height", "name"]);
	let mut folded: Vec<String> = names.iter().map(|n| n.to_ascii_lowercase()).collect();
	folded.dedup();
	assert_eq!(folded.len(), names.len());
}

#[test]
fn canonical_form_is_deterministic() {
	let mut collection = SchemaCollection::new();
	let key = collection.get_or_add_write_schema::<Person>();
	assert_eq!(
		collection.write_schema(key).to_string(),
		"record{age:int32,height:float64?*,name:string}"
	);

	let key = collection.get_or_add_write_schema::<Tree>();
	assert_eq!(
		collection.write_schema(key).to_string(),
		"record{children:[recurse(1)],value:int32}"
	);

	let key = collection.get_or_add_write_schema::<Message>();
	assert_eq!(
		collection.write_schema(key).to_string(),
		"union{int64:int64,Person:record{age:int32,height:float64?*,name:string}}"
	);
}

#[test]
fn structurally_equal_schemas_share_one_instance_per_collection() {
	let mut collection = SchemaCollection::new();
	let person = collection.get_or_add_write_schema::<Person>();
	let employee = collection.get_or_add_write_schema::<Employee>();
	assert_eq!(person, employee);
}

#[test]
fn structurally_equal_schemas_produce_identical_xml() {
	let mut a = SchemaCollection::new();
	let person = a.get_or_add_write_schema::<Person>();
	let mut b = SchemaCollection::new();
	// Derive unrelated schemas first so the two collections' internal ids
	// diverge; the XML must renumber them away
	b.get_or_add_write_schema::<Tree>();
	b.get_or_add_write_schema::<Message>();
	let employee = b.get_or_add_write_schema::<Employee>();
	assert_eq!(a.to_xml(person), b.to_xml(employee));
}

#[test]
fn xml_round_trips_structurally() {
	let mut collection = SchemaCollection::new();
	for key in [
		collection.get_or_add_write_schema::<Person>(),
		collection.get_or_add_write_schema::<Tree>(),
		collection.get_or_add_write_schema::<Message>(),
		collection.get_or_add_write_schema::<Vec<(i32, Option<String>)>>(),
		collection.get_or_add_write_schema::<std::collections::HashMap<String, Vec<u8>>>(),
	] {
		let xml = collection.to_xml(key);
		let (loaded, root) = SchemaCollection::from_xml(&xml).unwrap();
		assert_eq!(
			loaded.read_schema(root).canonical_form(),
			collection.read_schema(key).canonical_form(),
		);
		assert_eq!(loaded.to_xml(root), xml);
	}
}

#[test]
fn xml_of_a_simple_record_is_stable() {
	let mut collection = SchemaCollection::new();
	let key = collection.get_or_add_write_schema::<Tree>();
	assert_eq!(
		collection.to_xml(key),
		"<Complex Id=\"c1\">\n  <Field Name=\"children\">\n    <List>\n      <Complex Contract=\"#c1\"/>\n    </List>\n  </Field>\n  <Field Name=\"value\">\n    <Primitive Kind=\"int32\"/>\n  </Field>\n</Complex>\n"
	);
}

#[test]
fn copy_to_reuses_structurally_equal_shapes() {
	let mut source = SchemaCollection::new();
	let person = source.get_or_add_write_schema::<Person>();

	let mut target = SchemaCollection::new();
	let employee = target.get_or_add_write_schema::<Employee>();
	let copied = source.write_schema(person).copy_to(&mut target);
	assert_eq!(copied, employee);

	// Copying into an empty collection produces an equivalent graph
	let mut fresh = SchemaCollection::new();
	let copied = source.write_schema(person).copy_to(&mut fresh);
	assert_eq!(
		fresh.write_schema(copied).canonical_form(),
		source.write_schema(person).canonical_form(),
	);
}

#[test]
fn copy_to_handles_cycles() {
	let mut source = SchemaCollection::new();
	let tree = source.get_or_add_write_schema::<Tree>();
	let mut target = SchemaCollection::new();
	let copied = source.write_schema(tree).copy_to(&mut target);
	assert_eq!(
		target.write_schema(copied).canonical_form(),
		"record{children:[recurse(1)],value:int32}"
	);
}

#[test]
fn write_and_read_flavors_agree_structurally() {
	let mut collection = SchemaCollection::new();
	let write = collection.get_or_add_write_schema::<Person>();
	let read = collection.get_or_add_read_schema::<Person>();
	assert_eq!(write, read);
}
