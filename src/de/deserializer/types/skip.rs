use super::*;

use serde::de::Error as _;

/// Skips one value of any shape; MessagePack is self-describing, so no
/// schema is needed
///
/// Used for unknown fields under the `Ignore` policy and for the contents of
/// maps read as the empty message.
pub(in crate::de) fn skip_value<'de, R: ReadSlice<'de>>(
	state: &mut DeserializerState<'_, R>,
) -> Result<(), DeError> {
	let m = state.read_byte()?;
	match m {
		marker::NIL | marker::TRUE | marker::FALSE => Ok(()),
		m if marker::is_positive_fixint(m) || marker::is_negative_fixint(m) => Ok(()),
		marker::U8 | marker::I8 => state.read_const_size_buf::<1>().map(drop),
		marker::U16 | marker::I16 => state.read_const_size_buf::<2>().map(drop),
		marker::U32 | marker::I32 | marker::F32 => state.read_const_size_buf::<4>().map(drop),
		marker::U64 | marker::I64 | marker::F64 => state.read_const_size_buf::<8>().map(drop),
		m if marker::is_fixstr(m) => skip_bytes(state, (m & 0x1f) as usize),
		marker::STR8 | marker::BIN8 => {
			let n = state.read_const_size_buf::<1>()?[0] as usize;
			skip_bytes(state, n)
		}
		marker::STR16 | marker::BIN16 => {
			let n = u16::from_be_bytes(state.read_const_size_buf()?) as usize;
			skip_bytes(state, n)
		}
		marker::STR32 | marker::BIN32 => {
			let n = u32::from_be_bytes(state.read_const_size_buf()?) as usize;
			skip_bytes(state, n)
		}
		m if marker::is_fixarray(m) => skip_values(state, (m & 0x0f) as usize),
		marker::ARRAY16 => {
			let n = u16::from_be_bytes(state.read_const_size_buf()?) as usize;
			skip_values(state, n)
		}
		marker::ARRAY32 => {
			let n = u32::from_be_bytes(state.read_const_size_buf()?) as usize;
			skip_values(state, n)
		}
		m if marker::is_fixmap(m) => skip_values(state, 2 * (m & 0x0f) as usize),
		marker::MAP16 => {
			let n = u16::from_be_bytes(state.read_const_size_buf()?) as usize;
			skip_values(state, 2 * n)
		}
		marker::MAP32 => {
			let n = u32::from_be_bytes(state.read_const_size_buf()?) as usize;
			skip_values(state, 2 * n)
		}
		other => Err(DeError::custom(format_args!(
			"Cannot skip value with unknown marker 0x{other:02x}"
		))),
	}
}

fn skip_bytes<'de, R: ReadSlice<'de>>(
	state: &mut DeserializerState<'_, R>,
	n: usize,
) -> Result<(), DeError> {
	state.read_slice(n, Discard)
}

fn skip_values<'de, R: ReadSlice<'de>>(
	state: &mut DeserializerState<'_, R>,
	n: usize,
) -> Result<(), DeError> {
	for _ in 0..n {
		skip_value(state)?;
	}
	Ok(())
}
