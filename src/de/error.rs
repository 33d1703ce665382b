use std::borrow::Cow;

/// A deserialization fault: bad framing, an out-of-range or unparseable
/// scalar, an unknown member, a missing required field, an unexpected field
/// under the `Throw` policy, or a failing input source
///
/// Carries the name of the target type when the failure surfaced through a
/// typed driver, and the underlying [`std::io::Error`] when one caused it.
#[derive(thiserror::Error)]
#[error("{}", inner)]
pub struct DeError {
	inner: Box<ErrorInner>,
}

impl std::fmt::Debug for DeError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self.inner.io_error.as_ref() {
			Some(io_error) => write!(f, "{}: {}", self.inner, io_error),
			None => std::fmt::Debug::fmt(&*self.inner.value, f),
		}
	}
}

struct ErrorInner {
	value: Cow<'static, str>,
	io_error: Option<std::io::Error>,
	target: Option<&'static str>,
}

impl std::fmt::Display for ErrorInner {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self.target {
			Some(target) => write!(f, "{} (while deserializing {})", self.value, target),
			None => f.write_str(&self.value),
		}
	}
}

impl DeError {
	/// Static messages only; formatted ones go through
	/// `DeError::custom(format_args!(...))`
	pub(crate) fn new(s: &'static str) -> Self {
		Self {
			inner: Box::new(ErrorInner {
				value: Cow::Borrowed(s),
				io_error: None,
				target: None,
			}),
		}
	}

	pub(crate) fn unexpected_eof() -> Self {
		Self::new("Unexpected end of input while deserializing")
	}

	pub(crate) fn io(io_error: std::io::Error) -> Self {
		Self::custom_io("Input source failed while deserializing", io_error)
	}

	pub(crate) fn custom_io(msg: &'static str, io_error: std::io::Error) -> Self {
		Self {
			inner: Box::new(ErrorInner {
				value: Cow::Borrowed(msg),
				io_error: Some(io_error),
				target: None,
			}),
		}
	}

	pub(crate) fn missing_required_field(name: &str) -> Self {
		<Self as serde::de::Error>::custom(format_args!(
			"Missing required field {name:?} on the wire"
		))
	}

	pub(crate) fn unexpected_field(name: &str) -> Self {
		<Self as serde::de::Error>::custom(format_args!(
			"Unexpected field {name:?} on the wire"
		))
	}

	/// Attach the name of the type being deserialized, for error context
	pub(crate) fn with_target(mut self, target: &'static str) -> Self {
		self.inner.target.get_or_insert(target);
		self
	}

	/// The underlying [`std::io::Error`], when reading the input is what
	/// failed
	pub fn io_error(&self) -> Option<&std::io::Error> {
		self.inner.io_error.as_ref()
	}

	/// The type that was being deserialized when this error surfaced, if a
	/// typed driver produced it
	pub fn target_type(&self) -> Option<&'static str> {
		self.inner.target
	}
}

impl serde::de::Error for DeError {
	fn custom<T>(msg: T) -> Self
	where
		T: std::fmt::Display,
	{
		Self {
			inner: Box::new(ErrorInner {
				value: Cow::Owned(msg.to_string()),
				io_error: None,
				target: None,
			}),
		}
	}
}
