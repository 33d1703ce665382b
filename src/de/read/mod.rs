//! Input sources for the MessagePack unpacker
//!
//! Two concrete sources exist: an in-memory slice, where string and binary
//! payloads can be handed out as borrows into the input, and an arbitrary
//! `impl BufRead`, where they are staged through an internal scratch buffer.
//! Everything above this module is written against the [`Read`]/[`ReadSlice`]
//! traits so the two sources share one deserializer.

use super::DeError;

use serde::de::Error as _;

/// Byte-level access shared by every input source
///
/// Covers what marker decoding needs: single bytes for format markers, one
/// byte of lookahead, and the fixed-width big-endian payloads that follow
/// sized markers. Sealed, since the unpacking code assumes exactly these two
/// sources.
pub trait Read: std::io::Read + Sized + private::Sealed {
	fn read_byte(&mut self) -> Result<u8, DeError> {
		let [byte] = self.read_const_size_buf::<1>()?;
		Ok(byte)
	}

	/// One byte of lookahead, used for nil detection on nullable schemas
	fn peek_byte(&mut self) -> Result<u8, DeError>;

	fn read_const_size_buf<const N: usize>(&mut self) -> Result<[u8; N], DeError> {
		let mut buf = [0u8; N];
		self.read_exact(&mut buf).map_err(|io_error| {
			if io_error.kind() == std::io::ErrorKind::UnexpectedEof {
				DeError::unexpected_eof()
			} else {
				DeError::io(io_error)
			}
		})?;
		Ok(buf)
	}
}

/// [`Read`] plus length-delimited payloads (str and bin bodies)
///
/// The `'de` lifetime is how zero-copy deserialization happens: a slice
/// source passes the payload to the visitor as a borrow of the original
/// input, while a reader source can only offer a transient view of its
/// scratch buffer.
pub trait ReadSlice<'de>: Read {
	fn read_slice<V>(&mut self, n: usize, read_visitor: V) -> Result<V::Value, DeError>
	where
		V: ReadVisitor<'de>;
}

mod private {
	pub trait Sealed {}
}

/// Receives the raw bytes of a length-delimited payload, borrowed from the
/// input when the input supports it
pub trait ReadVisitor<'de>: Sized {
	type Value;
	fn visit(self, bytes: &[u8]) -> Result<Self::Value, DeError>;
	fn visit_borrowed(self, bytes: &'de [u8]) -> Result<Self::Value, DeError> {
		self.visit(bytes)
	}
}

/// Input source over a byte slice; payloads borrow from the input
pub struct SliceRead<'de> {
	slice: &'de [u8],
}

impl<'de> SliceRead<'de> {
	pub fn new(slice: &'de [u8]) -> Self {
		Self { slice }
	}
}

impl private::Sealed for SliceRead<'_> {}

impl<'de> Read for SliceRead<'de> {
	fn peek_byte(&mut self) -> Result<u8, DeError> {
		self.slice.first().copied().ok_or_else(DeError::unexpected_eof)
	}
}

impl<'de> ReadSlice<'de> for SliceRead<'de> {
	fn read_slice<V>(&mut self, n: usize, visitor: V) -> Result<V::Value, DeError>
	where
		V: ReadVisitor<'de>,
	{
		if n > self.slice.len() {
			Err(DeError::unexpected_eof())
		} else {
			let (just_read, rest) = self.slice.split_at(n);
			self.slice = rest;
			visitor.visit_borrowed(just_read)
		}
	}
}

impl std::io::Read for SliceRead<'_> {
	fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
		std::io::Read::read(&mut self.slice, buf)
	}
	fn read_vectored(&mut self, bufs: &mut [std::io::IoSliceMut<'_>]) -> std::io::Result<usize> {
		std::io::Read::read_vectored(&mut self.slice, bufs)
	}
}

impl std::io::BufRead for SliceRead<'_> {
	fn fill_buf(&mut self) -> std::io::Result<&[u8]> {
		Ok(self.slice)
	}

	fn consume(&mut self, amt: usize) {
		self.slice = &self.slice[amt..];
	}
}

/// Input source over an `impl BufRead`; payloads go through a reused scratch
/// buffer, so nothing can be borrowed from the input
pub struct ReaderRead<R> {
	reader: R,
	scratch: Vec<u8>,
	/// Cap on any single scratch allocation, so a corrupt length header
	/// cannot demand terabytes
	pub max_alloc_size: usize,
}

impl<R: std::io::BufRead> private::Sealed for ReaderRead<R> {}

impl<R: std::io::BufRead> ReaderRead<R> {
	/// Wrap a buffered reader as an input source
	///
	/// Buffering is required because nil detection on nullable schemas peeks
	/// one marker byte without consuming it; put a
	/// [`BufReader`](std::io::BufReader) around plain `io::Read` values.
	pub fn new(reader: R) -> Self {
		Self {
			reader,
			scratch: Vec::new(),
			max_alloc_size: 32 * 1024 * 1024,
		}
	}

	pub fn into_inner(self) -> R {
		self.reader
	}
}

impl<R: std::io::BufRead> Read for ReaderRead<R> {
	fn peek_byte(&mut self) -> Result<u8, DeError> {
		let buf = self.reader.fill_buf().map_err(DeError::io)?;
		buf.first().copied().ok_or_else(DeError::unexpected_eof)
	}
}

impl<'de, R: std::io::BufRead> ReadSlice<'de> for ReaderRead<R> {
	fn read_slice<V>(&mut self, n: usize, visitor: V) -> Result<V::Value, DeError>
	where
		V: ReadVisitor<'de>,
	{
		if n > self.max_alloc_size {
			return Err(DeError::custom(format_args!(
				"Refusing to allocate {n} bytes for a length-delimited payload \
					(configure max_alloc_size on ReaderRead if this is legitimate)"
			)));
		}
		self.scratch.clear();
		self.scratch.resize(n, 0);
		self.reader
			.read_exact(&mut self.scratch)
			.map_err(|io_error| {
				if io_error.kind() == std::io::ErrorKind::UnexpectedEof {
					DeError::unexpected_eof()
				} else {
					DeError::io(io_error)
				}
			})?;
		visitor.visit(&self.scratch)
	}
}

impl<R: std::io::BufRead> std::io::Read for ReaderRead<R> {
	fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
		self.reader.read(buf)
	}
}
