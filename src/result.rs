// This file is part of novuspack.
//
// novuspack is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// novuspack is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with novuspack.  If not, see <https://www.gnu.org/licenses/>.

/// What went wrong, coarsely.
///
/// `Corruption` means the input ended before the structure did, `IO` means the
/// underlying reader or writer failed for reasons unrelated to the data, and
/// `Validation` means the bytes were all there but disagree with each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    IO,
    Corruption,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Validation => f.write_str("Validation"),
            ErrorKind::IO         => f.write_str("IO"),
            ErrorKind::Corruption => f.write_str("Corruption"),
        }
    }
}

/// The field/value/expected triple attached to every failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    pub field:    &'static str,
    pub value:    String,
    pub expected: String,
}

impl ErrorContext {
    #[inline]
    pub fn new(field: &'static str, value: impl ToString, expected: impl Into<String>) -> Self {
        ErrorContext {
            field,
            value:    value.to_string(),
            expected: expected.into(),
        }
    }
}

impl std::fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "field={}, value={}, expected={}", self.field, self.value, self.expected)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("[{kind}] {message}")]
pub struct Error {
    pub(crate) kind:     ErrorKind,
    pub(crate) message:  String,
    pub(crate) context:  Option<ErrorContext>,
    pub(crate) consumed: Option<u64>,
    #[source]
    pub(crate) cause:    Option<std::io::Error>,
}

impl Error {
    #[inline]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Error {
            kind,
            message:  message.into(),
            context:  None,
            consumed: None,
            cause:    None,
        }
    }

    #[inline]
    pub fn validation(message: impl Into<String>, context: ErrorContext) -> Self {
        Error::new(ErrorKind::Validation, message).with_context(context)
    }

    /// Short read. `consumed` is how many bytes of the structure were read
    /// before the input ran out.
    #[inline]
    pub fn corruption(message: impl Into<String>, context: ErrorContext, consumed: u64) -> Self {
        Error {
            consumed: Some(consumed),
            ..Error::new(ErrorKind::Corruption, message).with_context(context)
        }
    }

    #[inline]
    pub fn io(message: impl Into<String>, cause: std::io::Error, context: ErrorContext) -> Self {
        Error {
            cause: Some(cause),
            ..Error::new(ErrorKind::IO, message).with_context(context)
        }
    }

    #[inline]
    pub fn with_context(self, context: ErrorContext) -> Self {
        Error {
            context: Some(context),
            ..self
        }
    }

    #[inline]
    pub fn with_consumed(self, consumed: u64) -> Self {
        Error {
            consumed: Some(consumed),
            ..self
        }
    }

    /// Replaces the message, keeping kind, context and cause. Used when an
    /// outer structure wants to say which of its parts failed.
    #[inline]
    pub fn with_message(self, message: impl Into<String>) -> Self {
        Error {
            message: message.into(),
            ..self
        }
    }

    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[inline]
    pub fn context(&self) -> Option<&ErrorContext> {
        self.context.as_ref()
    }

    #[inline]
    pub fn field(&self) -> Option<&'static str> {
        self.context.as_ref().map(|context| context.field)
    }

    #[inline]
    pub fn bytes_consumed(&self) -> Option<u64> {
        self.consumed
    }

    #[inline]
    pub fn cause(&self) -> Option<&std::io::Error> {
        self.cause.as_ref()
    }

    #[inline]
    pub fn is_validation(&self) -> bool {
        self.kind == ErrorKind::Validation
    }

    #[inline]
    pub fn is_corruption(&self) -> bool {
        self.kind == ErrorKind::Corruption
    }

    #[inline]
    pub fn is_io(&self) -> bool {
        self.kind == ErrorKind::IO
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        let kind = if error.kind() == std::io::ErrorKind::UnexpectedEof {
            ErrorKind::Corruption
        } else {
            ErrorKind::IO
        };
        Error {
            message: error.to_string(),
            cause:   Some(error),
            ..Error::new(kind, "")
        }
    }
}

pub type Result<T> = core::result::Result<T, Error>;
