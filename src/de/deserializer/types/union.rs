use super::*;

use crate::schema::{UnionMember, UnionSchema};

use serde::de::{EnumAccess, Error as _, VariantAccess};

/// Consumes the `[memberName, payload]` framing up to the payload and
/// resolves the member, case-insensitively
pub(in crate::de) fn read_union_member<'s, 'de, R: ReadSlice<'de>>(
	state: &mut DeserializerState<'_, R>,
	union: &'s UnionSchema,
) -> Result<&'s UnionMember, DeError> {
	let arity = read_array_len(state)?;
	if arity != 2 {
		return Err(DeError::custom(format_args!(
			"Union framing must be a 2-element array, found {arity} elements"
		)));
	}
	let name = read_owned_str(state)?;
	union.member_ci(&name).ok_or_else(|| {
		DeError::custom(format_args!(
			"Unknown union member {name:?}, declared members are {:?}",
			union
				.members
				.iter()
				.map(|m| m.name.as_str())
				.collect::<Vec<_>>()
		))
	})
}

pub(in crate::de) struct UnionEnumAccess<'r, 's, R> {
	pub(in crate::de) state: &'r mut DeserializerState<'s, R>,
	pub(in crate::de) union: &'s UnionSchema,
}

impl<'de, 'r, 's, R: ReadSlice<'de>> EnumAccess<'de> for UnionEnumAccess<'r, 's, R> {
	type Error = DeError;
	type Variant = UnionVariantAccess<'r, 's, R>;

	fn variant_seed<V>(self, seed: V) -> Result<(V::Value, Self::Variant), Self::Error>
	where
		V: DeserializeSeed<'de>,
	{
		let member = read_union_member(self.state, self.union)?;
		// serde dispatches on the Rust variant identifier; the wire name is
		// only the member's canonical name
		let variant = member.variant.as_deref().unwrap_or(&member.name);
		let value =
			seed.deserialize(serde::de::value::StrDeserializer::<DeError>::new(variant))?;
		Ok((
			value,
			UnionVariantAccess {
				state: self.state,
				schema: member.schema,
			},
		))
	}
}

pub(in crate::de) struct UnionVariantAccess<'r, 's, R> {
	state: &'r mut DeserializerState<'s, R>,
	schema: SchemaKey,
}

impl<'de, R: ReadSlice<'de>> VariantAccess<'de> for UnionVariantAccess<'_, '_, R> {
	type Error = DeError;

	fn unit_variant(self) -> Result<(), Self::Error> {
		// The 2-element framing always carries a payload; discard it
		skip_value(self.state)
	}

	fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value, Self::Error>
	where
		T: DeserializeSeed<'de>,
	{
		let node = self.state.node(self.schema);
		seed.deserialize(DatumDeserializer {
			state: self.state,
			node,
		})
	}

	fn tuple_variant<V>(self, _len: usize, _visitor: V) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		Err(DeError::new(
			"Union members are dispatched through newtype variants, not tuple variants",
		))
	}

	fn struct_variant<V>(
		self,
		_fields: &'static [&'static str],
		_visitor: V,
	) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		Err(DeError::new(
			"Union members are dispatched through newtype variants, not struct variants",
		))
	}
}
