//! Error types and handling for the jump list decoder.

use std::fmt;

/// Custom error type for jump list decoding
#[derive(Debug)]
pub enum Error {
    /// I/O related errors
    Io(std::io::Error),
    /// JSON serialization errors
    Json(serde_json::Error),
    /// CSV writing errors
    Csv(csv::Error),
    /// Buffer too small to even hold the magic value being checked
    ShortSignature(String),
    /// Magic value present but wrong for the expected format
    BadSignature(String),
    /// A length or offset field points past the end of the data
    TruncatedRecord(String),
    /// The compound-file container itself is unreadable
    MalformedContainer(String),
    /// DestList header version with no known record layout
    UnsupportedVersion(u32),
    /// The same entry number appears twice in one DestList
    DuplicateEntry(u32),
    /// Invalid input (bad arguments, unknown file type)
    InvalidInput(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "I/O error: {}", err),
            Error::Json(err) => write!(f, "JSON error: {}", err),
            Error::Csv(err) => write!(f, "CSV error: {}", err),
            Error::ShortSignature(msg) => write!(f, "Short signature: {}", msg),
            Error::BadSignature(msg) => write!(f, "Bad signature: {}", msg),
            Error::TruncatedRecord(msg) => write!(f, "Truncated record: {}", msg),
            Error::MalformedContainer(msg) => write!(f, "Malformed container: {}", msg),
            Error::UnsupportedVersion(version) => {
                write!(f, "Unsupported DestList version: {}", version)
            }
            Error::DuplicateEntry(number) => {
                write!(f, "Duplicate DestList entry number: 0x{:x}", number)
            }
            Error::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Json(err) => Some(err),
            Error::Csv(err) => Some(err),
            _ => None,
        }
    }
}

impl Error {
    /// True for errors raised by the binary decoders, as opposed to I/O or output errors
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            Error::ShortSignature(_)
                | Error::BadSignature(_)
                | Error::TruncatedRecord(_)
                | Error::MalformedContainer(_)
                | Error::UnsupportedVersion(_)
                | Error::DuplicateEntry(_)
        )
    }
}

// Convenient conversion traits
impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Error::Csv(err)
    }
}

/// Convenient Result type alias
pub type Result<T> = std::result::Result<T, Error>;
