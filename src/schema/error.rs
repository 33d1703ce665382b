/// Any error that may happen while loading a schema graph or checking its
/// invariants
///
/// Structural *incompatibility* is never an error: compatibility checks
/// report it through their boolean result.
#[derive(thiserror::Error, Debug)]
pub enum SchemaError {
	#[error("invalid schema XML: {0}")]
	Xml(#[from] roxmltree::Error),
	#[error("unknown schema element <{0}>")]
	UnknownElement(String),
	#[error("element <{element}> is missing the {attribute} attribute")]
	MissingAttribute {
		element: &'static str,
		attribute: &'static str,
	},
	#[error("unknown primitive kind {0:?}")]
	UnknownPrimitive(String),
	#[error("element <{element}> expects {expected} child schema(s), found {found}")]
	WrongChildCount {
		element: &'static str,
		expected: usize,
		found: usize,
	},
	#[error("the schema contains an unresolved reference: #{0}")]
	UnresolvedReference(String),
	#[error("duplicate schema id: {0:?}")]
	DuplicateId(String),
	#[error("reference #{id} resolves to a <{actual}> element, expected <{expected}>")]
	ReferenceKindMismatch {
		id: String,
		expected: String,
		actual: &'static str,
	},
	#[error("duplicate field name (case-insensitive): {0:?}")]
	DuplicateField(String),
	#[error("duplicate member name (case-insensitive): {0:?}")]
	DuplicateMember(String),
}
