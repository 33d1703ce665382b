//! Writes the MessagePack primitive formats
//!
//! Integers always take the smallest representation that holds the value;
//! multi-byte payloads are big-endian per the MessagePack specification.

use super::SerError;

use crate::marker;

use std::io::Write;

pub(crate) fn write_nil<W: Write>(writer: &mut W) -> Result<(), SerError> {
	writer.write_all(&[marker::NIL]).map_err(SerError::io)
}

pub(crate) fn write_bool<W: Write>(writer: &mut W, value: bool) -> Result<(), SerError> {
	let marker = if value { marker::TRUE } else { marker::FALSE };
	writer.write_all(&[marker]).map_err(SerError::io)
}

pub(crate) fn write_int<W: Write>(writer: &mut W, value: i128) -> Result<(), SerError> {
	if value >= 0 {
		let value = u64::try_from(value)
			.map_err(|_| SerError::new("Integer does not fit the MessagePack integer formats"))?;
		match value {
			0..=0x7f => writer.write_all(&[value as u8]),
			0x80..=0xff => writer.write_all(&[marker::U8, value as u8]),
			0x100..=0xffff => {
				let [a, b] = (value as u16).to_be_bytes();
				writer.write_all(&[marker::U16, a, b])
			}
			0x1_0000..=0xffff_ffff => {
				let bytes = (value as u32).to_be_bytes();
				writer
					.write_all(&[marker::U32])
					.and_then(|()| writer.write_all(&bytes))
			}
			_ => {
				let bytes = value.to_be_bytes();
				writer
					.write_all(&[marker::U64])
					.and_then(|()| writer.write_all(&bytes))
			}
		}
		.map_err(SerError::io)
	} else {
		let value = i64::try_from(value)
			.map_err(|_| SerError::new("Integer does not fit the MessagePack integer formats"))?;
		match value {
			-32..=-1 => writer.write_all(&[value as i8 as u8]),
			-0x80..=-33 => writer.write_all(&[marker::I8, value as i8 as u8]),
			-0x8000..=-0x81 => {
				let [a, b] = (value as i16).to_be_bytes();
				writer.write_all(&[marker::I16, a, b])
			}
			-0x8000_0000..=-0x8001 => {
				let bytes = (value as i32).to_be_bytes();
				writer
					.write_all(&[marker::I32])
					.and_then(|()| writer.write_all(&bytes))
			}
			_ => {
				let bytes = value.to_be_bytes();
				writer
					.write_all(&[marker::I64])
					.and_then(|()| writer.write_all(&bytes))
			}
		}
		.map_err(SerError::io)
	}
}

pub(crate) fn write_f32<W: Write>(writer: &mut W, value: f32) -> Result<(), SerError> {
	let bytes = value.to_be_bytes();
	writer
		.write_all(&[marker::F32])
		.and_then(|()| writer.write_all(&bytes))
		.map_err(SerError::io)
}

pub(crate) fn write_f64<W: Write>(writer: &mut W, value: f64) -> Result<(), SerError> {
	let bytes = value.to_be_bytes();
	writer
		.write_all(&[marker::F64])
		.and_then(|()| writer.write_all(&bytes))
		.map_err(SerError::io)
}

pub(crate) fn write_str<W: Write>(writer: &mut W, value: &str) -> Result<(), SerError> {
	let bytes = value.as_bytes();
	match bytes.len() {
		len if len <= marker::FIXSTR_MAX_LEN => writer.write_all(&[marker::FIXSTR | len as u8]),
		len if len <= 0xff => writer.write_all(&[marker::STR8, len as u8]),
		len if len <= 0xffff => {
			let [a, b] = (len as u16).to_be_bytes();
			writer.write_all(&[marker::STR16, a, b])
		}
		len if len <= u32::MAX as usize => {
			let size = (len as u32).to_be_bytes();
			writer
				.write_all(&[marker::STR32])
				.and_then(|()| writer.write_all(&size))
		}
		_ => return Err(SerError::new("String is too long for the MessagePack str formats")),
	}
	.map_err(SerError::io)?;
	writer.write_all(bytes).map_err(SerError::io)
}

pub(crate) fn write_bin<W: Write>(writer: &mut W, value: &[u8]) -> Result<(), SerError> {
	match value.len() {
		len if len <= 0xff => writer.write_all(&[marker::BIN8, len as u8]),
		len if len <= 0xffff => {
			let [a, b] = (len as u16).to_be_bytes();
			writer.write_all(&[marker::BIN16, a, b])
		}
		len if len <= u32::MAX as usize => {
			let size = (len as u32).to_be_bytes();
			writer
				.write_all(&[marker::BIN32])
				.and_then(|()| writer.write_all(&size))
		}
		_ => return Err(SerError::new("Byte string is too long for the MessagePack bin formats")),
	}
	.map_err(SerError::io)?;
	writer.write_all(value).map_err(SerError::io)
}

pub(crate) fn write_array_len<W: Write>(writer: &mut W, len: usize) -> Result<(), SerError> {
	match len {
		len if len <= marker::FIXCOLLECTION_MAX_LEN => {
			writer.write_all(&[marker::FIXARRAY | len as u8])
		}
		len if len <= 0xffff => {
			let [a, b] = (len as u16).to_be_bytes();
			writer.write_all(&[marker::ARRAY16, a, b])
		}
		len if len <= u32::MAX as usize => {
			let size = (len as u32).to_be_bytes();
			writer
				.write_all(&[marker::ARRAY32])
				.and_then(|()| writer.write_all(&size))
		}
		_ => return Err(SerError::new("Array is too long for the MessagePack array formats")),
	}
	.map_err(SerError::io)
}

pub(crate) fn write_map_len<W: Write>(writer: &mut W, len: usize) -> Result<(), SerError> {
	match len {
		len if len <= marker::FIXCOLLECTION_MAX_LEN => {
			writer.write_all(&[marker::FIXMAP | len as u8])
		}
		len if len <= 0xffff => {
			let [a, b] = (len as u16).to_be_bytes();
			writer.write_all(&[marker::MAP16, a, b])
		}
		len if len <= u32::MAX as usize => {
			let size = (len as u32).to_be_bytes();
			writer
				.write_all(&[marker::MAP32])
				.and_then(|()| writer.write_all(&size))
		}
		_ => return Err(SerError::new("Map is too long for the MessagePack map formats")),
	}
	.map_err(SerError::io)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn int_bytes(value: i128) -> Vec<u8> {
		let mut out = Vec::new();
		write_int(&mut out, value).unwrap();
		out
	}

	#[test]
	fn integers_take_the_smallest_format() {
		assert_eq!(int_bytes(0), [0x00]);
		assert_eq!(int_bytes(127), [0x7f]);
		assert_eq!(int_bytes(128), [0xcc, 0x80]);
		assert_eq!(int_bytes(256), [0xcd, 0x01, 0x00]);
		assert_eq!(int_bytes(65536), [0xce, 0x00, 0x01, 0x00, 0x00]);
		assert_eq!(int_bytes(-1), [0xff]);
		assert_eq!(int_bytes(-32), [0xe0]);
		assert_eq!(int_bytes(-33), [0xd0, 0xdf]);
		assert_eq!(int_bytes(-129), [0xd1, 0xff, 0x7f]);
	}

	#[test]
	fn collection_headers() {
		let mut out = Vec::new();
		write_map_len(&mut out, 0).unwrap();
		write_array_len(&mut out, 16).unwrap();
		write_str(&mut out, "ab").unwrap();
		assert_eq!(out, [0x80, 0xdc, 0x00, 0x10, 0xa2, b'a', b'b']);
	}
}
