//! Runtime behavior when the writer and reader disagree on record shape:
//! the single-pass merge walk, defaults, and the unexpected-field policy

use {
	pretty_assertions::assert_eq,
	schemapack::{
		schema::{SchemaBuilder, SchemaKey, WireSchema},
		Deserializer, UnexpectedFieldPolicy,
	},
	serde_derive::{Deserialize, Serialize},
};

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
struct Person {
	name: String,
	age: i32,
}

impl WireSchema for Person {
	fn append_schema(builder: &mut SchemaBuilder<'_>) -> SchemaKey {
		builder.complex(|c| {
			c.field::<String>("name");
			c.field::<i32>("age");
		})
	}
	fn wire_name() -> std::borrow::Cow<'static, str> {
		"Person".into()
	}
	type TypeLookup = Person;
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct PersonWithScore {
	name: String,
	age: i32,
	score: f64,
}

impl WireSchema for PersonWithScore {
	fn append_schema(builder: &mut SchemaBuilder<'_>) -> SchemaKey {
		builder.complex(|c| {
			c.field::<String>("name");
			c.field::<i32>("age");
			c.field::<f64>("score");
		})
	}
	fn wire_name() -> std::borrow::Cow<'static, str> {
		"PersonWithScore".into()
	}
	type TypeLookup = PersonWithScore;
}

fn nan() -> f64 {
	f64::NAN
}

#[derive(Serialize, Deserialize, Debug)]
struct PersonWithDefaultHeight {
	name: String,
	age: i32,
	#[serde(default = "nan")]
	height: f64,
}

impl WireSchema for PersonWithDefaultHeight {
	fn append_schema(builder: &mut SchemaBuilder<'_>) -> SchemaKey {
		builder.complex(|c| {
			c.field::<String>("name");
			c.field::<i32>("age");
			c.field_with_default::<f64>("height");
		})
	}
	fn wire_name() -> std::borrow::Cow<'static, str> {
		"PersonWithDefaultHeight".into()
	}
	type TypeLookup = PersonWithDefaultHeight;
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct PersonWithDefaultZip {
	name: String,
	age: i32,
	// "zip" sorts after every other field, so its absence is only detected
	// once the incoming map is exhausted
	#[serde(default)]
	zip: String,
}

impl WireSchema for PersonWithDefaultZip {
	fn append_schema(builder: &mut SchemaBuilder<'_>) -> SchemaKey {
		builder.complex(|c| {
			c.field::<String>("name");
			c.field::<i32>("age");
			c.field_with_default::<String>("zip");
		})
	}
	fn wire_name() -> std::borrow::Cow<'static, str> {
		"PersonWithDefaultZip".into()
	}
	type TypeLookup = PersonWithDefaultZip;
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct PersonWithRequiredHeight {
	name: String,
	age: i32,
	height: f64,
}

impl WireSchema for PersonWithRequiredHeight {
	fn append_schema(builder: &mut SchemaBuilder<'_>) -> SchemaKey {
		builder.complex(|c| {
			c.field::<String>("name");
			c.field::<i32>("age");
			c.field::<f64>("height");
		})
	}
	fn wire_name() -> std::borrow::Cow<'static, str> {
		"PersonWithRequiredHeight".into()
	}
	type TypeLookup = PersonWithRequiredHeight;
}

fn bob() -> Person {
	Person {
		name: "Bob".to_owned(),
		age: 36,
	}
}

fn bob_with_score_bytes() -> Vec<u8> {
	schemapack::to_vec(&PersonWithScore {
		name: "Bob".to_owned(),
		age: 36,
		score: 100.0,
	})
	.unwrap()
}

#[test]
fn matching_fields_read_back_exactly() {
	let bytes = schemapack::to_vec(&bob()).unwrap();
	let person: Person = schemapack::from_slice(&bytes).unwrap();
	assert_eq!(person, bob());
}

#[test]
fn extra_writer_field_is_skipped_under_ignore() {
	let reader = Deserializer::<Person>::new(UnexpectedFieldPolicy::Ignore);
	let person = reader.deserialize_slice(&bob_with_score_bytes()).unwrap();
	assert_eq!(person, bob());
}

#[test]
fn extra_writer_field_faults_under_throw() {
	let reader = Deserializer::<Person>::new(UnexpectedFieldPolicy::Throw);
	let err = reader.deserialize_slice(&bob_with_score_bytes()).unwrap_err();
	assert!(err.to_string().contains("Unexpected field \"score\""));
}

#[test]
fn throw_is_the_default_policy() {
	let err = schemapack::from_slice::<Person>(&bob_with_score_bytes()).unwrap_err();
	assert!(err.to_string().contains("Unexpected field"));
}

#[test]
fn missing_defaulted_field_in_the_middle_takes_the_default() {
	// "height" sorts between "age" and "name"; the walk must notice its
	// absence while both neighbours are present
	let bytes = schemapack::to_vec(&bob()).unwrap();
	let person: PersonWithDefaultHeight = schemapack::from_slice(&bytes).unwrap();
	assert_eq!(person.name, "Bob");
	assert_eq!(person.age, 36);
	assert!(person.height.is_nan());
}

#[test]
fn missing_defaulted_trailing_field_takes_the_default() {
	let bytes = schemapack::to_vec(&bob()).unwrap();
	let person: PersonWithDefaultZip = schemapack::from_slice(&bytes).unwrap();
	assert_eq!(
		person,
		PersonWithDefaultZip {
			name: "Bob".to_owned(),
			age: 36,
			zip: String::new(),
		}
	);
}

#[test]
fn missing_required_field_faults() {
	let bytes = schemapack::to_vec(&bob()).unwrap();
	let err = schemapack::from_slice::<PersonWithRequiredHeight>(&bytes).unwrap_err();
	assert!(err.to_string().contains("Missing required field \"height\""));
}

#[test]
fn defaulted_field_still_reads_the_wire_value_when_present() {
	let bytes = schemapack::to_vec(&PersonWithRequiredHeight {
		name: "Bob".to_owned(),
		age: 36,
		height: 1.87,
	})
	.unwrap();
	let person: PersonWithDefaultHeight = schemapack::from_slice(&bytes).unwrap();
	assert_eq!(person.height, 1.87);
}

#[test]
fn widened_integers_read_back() {
	#[derive(Serialize, Deserialize, Debug, PartialEq)]
	struct Narrow {
		n: i8,
	}
	impl WireSchema for Narrow {
		fn append_schema(builder: &mut SchemaBuilder<'_>) -> SchemaKey {
			builder.complex(|c| c.field::<i8>("n"))
		}
		fn wire_name() -> std::borrow::Cow<'static, str> {
			"Narrow".into()
		}
		type TypeLookup = Narrow;
	}
	#[derive(Serialize, Deserialize, Debug, PartialEq)]
	struct Wide {
		n: i64,
	}
	impl WireSchema for Wide {
		fn append_schema(builder: &mut SchemaBuilder<'_>) -> SchemaKey {
			builder.complex(|c| c.field::<i64>("n"))
		}
		fn wire_name() -> std::borrow::Cow<'static, str> {
			"Wide".into()
		}
		type TypeLookup = Wide;
	}

	let bytes = schemapack::to_vec(&Narrow { n: -5 }).unwrap();
	let wide: Wide = schemapack::from_slice(&bytes).unwrap();
	assert_eq!(wide, Wide { n: -5 });
}

#[test]
fn enum_value_reads_into_a_wider_enum() {
	#[derive(Serialize, Deserialize, Debug, PartialEq)]
	enum Abc {
		A,
		B,
		C,
	}
	impl WireSchema for Abc {
		fn append_schema(builder: &mut SchemaBuilder<'_>) -> SchemaKey {
			builder.enumeration(&["A", "B", "C"])
		}
		fn wire_name() -> std::borrow::Cow<'static, str> {
			"Abc".into()
		}
		type TypeLookup = Abc;
	}
	#[derive(Serialize, Deserialize, Debug, PartialEq)]
	enum Abcd {
		A,
		B,
		C,
		D,
	}
	impl WireSchema for Abcd {
		fn append_schema(builder: &mut SchemaBuilder<'_>) -> SchemaKey {
			builder.enumeration(&["A", "B", "C", "D"])
		}
		fn wire_name() -> std::borrow::Cow<'static, str> {
			"Abcd".into()
		}
		type TypeLookup = Abcd;
	}

	let bytes = schemapack::to_vec(&Abc::A).unwrap();
	let value: Abcd = schemapack::from_slice(&bytes).unwrap();
	assert_eq!(value, Abcd::A);
}

#[test]
fn union_value_reads_into_a_wider_union() {
	#[derive(Serialize, Deserialize, Debug, PartialEq)]
	enum Small {
		I(i32),
		S(String),
	}
	impl WireSchema for Small {
		fn append_schema(builder: &mut SchemaBuilder<'_>) -> SchemaKey {
			builder.union(|u| {
				u.member::<i32>("I");
				u.member::<String>("S");
			})
		}
		fn wire_name() -> std::borrow::Cow<'static, str> {
			"Small".into()
		}
		type TypeLookup = Small;
	}
	#[derive(Serialize, Deserialize, Debug, PartialEq)]
	enum Big {
		I(i32),
		S(String),
		F(f64),
	}
	impl WireSchema for Big {
		fn append_schema(builder: &mut SchemaBuilder<'_>) -> SchemaKey {
			builder.union(|u| {
				u.member::<i32>("I");
				u.member::<String>("S");
				u.member::<f64>("F");
			})
		}
		fn wire_name() -> std::borrow::Cow<'static, str> {
			"Big".into()
		}
		type TypeLookup = Big;
	}

	let bytes = schemapack::to_vec(&Small::I(1)).unwrap();
	let value: Big = schemapack::from_slice(&bytes).unwrap();
	assert_eq!(value, Big::I(1));
}
