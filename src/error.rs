use core::fmt;

use crate::parse::ParseError;

/// An error that can occur when building a [`Regex`](crate::Regex).
///
/// The only way construction can fail today is a malformed pattern, in
/// which case the underlying [`ParseError`] is available through
/// [`Error::kind`] or via [`std::error::Error::source`].
#[derive(Clone, Debug)]
pub struct Error {
    kind: ErrorKind,
}

/// The kind of an error that occurred while building a regex.
#[derive(Clone, Debug)]
pub enum ErrorKind {
    /// The pattern failed to parse.
    Parse(ParseError),
}

impl Error {
    pub(crate) fn parse(err: ParseError) -> Error {
        Error { kind: ErrorKind::Parse(err) }
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.kind {
            ErrorKind::Parse(ref err) => {
                write!(f, "failed to parse pattern: {}", err)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self.kind {
            ErrorKind::Parse(ref err) => Some(err),
        }
    }
}
