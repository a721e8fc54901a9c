use std::fmt;

/// Failures surfaced by the crate's interface.
///
/// Every variant carries a diagnostic message; callers never receive a
/// partially populated structure alongside one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The file could not be opened for the requested mode.
    UnableToOpen(String),
    /// An OS-level read, write, map or copy failed.
    IoFailure(String),
    /// A size precondition was violated (zero-length write, short buffer).
    InvalidSize(String),
    /// The input format (or a format variant) is not supported.
    FormatUnsupported(String),
    /// A `PIGO`-tagged binary with an unrecognized format magic.
    VersionMismatch(String),
    /// Binary width prefixes disagree with the instantiated scalar types.
    TemplateSizeMismatch(String),
    /// The parsed contents contradict the file's own header.
    HeaderContradiction(String),
    /// A positional move past the end of the mapped region.
    SeekOutOfRange(String),
    /// A conversion path that is recognized but not implemented.
    NotYetImplemented(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnableToOpen(m) => write!(f, "unable to open: {m}"),
            Error::IoFailure(m) => write!(f, "io failure: {m}"),
            Error::InvalidSize(m) => write!(f, "invalid size: {m}"),
            Error::FormatUnsupported(m) => write!(f, "format unsupported: {m}"),
            Error::VersionMismatch(m) => write!(f, "version mismatch: {m}"),
            Error::TemplateSizeMismatch(m) => write!(f, "template size mismatch: {m}"),
            Error::HeaderContradiction(m) => write!(f, "header contradiction: {m}"),
            Error::SeekOutOfRange(m) => write!(f, "seek out of range: {m}"),
            Error::NotYetImplemented(m) => write!(f, "not yet implemented: {m}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::IoFailure(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
