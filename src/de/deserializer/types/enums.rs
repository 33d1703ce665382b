use super::*;

use crate::schema::EnumSchema;

use serde::de::{EnumAccess, Error as _, VariantAccess};

/// Reads an enum value (a member-name string), resolving case-insensitively
/// to the declared spelling
pub(in crate::de) fn read_enum_member<'s, 'de, R: ReadSlice<'de>>(
	state: &mut DeserializerState<'_, R>,
	enum_: &'s EnumSchema,
) -> Result<&'s str, DeError> {
	let name = read_owned_str(state)?;
	enum_.member_ci(&name).ok_or_else(|| {
		DeError::custom(format_args!(
			"Unknown enum member {name:?}, declared members are {:?}",
			enum_.members
		))
	})
}

pub(in crate::de) struct EnumMemberAccess<'r, 's, R> {
	pub(in crate::de) state: &'r mut DeserializerState<'s, R>,
	pub(in crate::de) enum_: &'s EnumSchema,
}

impl<'de, R: ReadSlice<'de>> EnumAccess<'de> for EnumMemberAccess<'_, '_, R> {
	type Error = DeError;
	type Variant = UnitOnlyVariantAccess;

	fn variant_seed<V>(self, seed: V) -> Result<(V::Value, Self::Variant), Self::Error>
	where
		V: DeserializeSeed<'de>,
	{
		let member = read_enum_member(self.state, self.enum_)?;
		let value =
			seed.deserialize(serde::de::value::StrDeserializer::<DeError>::new(member))?;
		Ok((value, UnitOnlyVariantAccess))
	}
}

pub(in crate::de) struct UnitOnlyVariantAccess;

impl<'de> VariantAccess<'de> for UnitOnlyVariantAccess {
	type Error = DeError;

	fn unit_variant(self) -> Result<(), Self::Error> {
		Ok(())
	}

	fn newtype_variant_seed<T>(self, _seed: T) -> Result<T::Value, Self::Error>
	where
		T: DeserializeSeed<'de>,
	{
		Err(DeError::new("Enum members carry no payload"))
	}

	fn tuple_variant<V>(self, _len: usize, _visitor: V) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		Err(DeError::new("Enum members carry no payload"))
	}

	fn struct_variant<V>(
		self,
		_fields: &'static [&'static str],
		_visitor: V,
	) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		Err(DeError::new("Enum members carry no payload"))
	}
}
