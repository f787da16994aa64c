//! Error types that can be emitted from this library

use std::fmt;
use std::io;
use std::num::TryFromIntError;

use displaydoc::Display;
use thiserror::Error;

/// Generic result type with [`Error`] as its error variant
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for riscos-zip
#[derive(Debug, Display, Error)]
#[non_exhaustive]
pub enum Error {
    /// i/o error: {0}
    Io(#[from] io::Error),

    /// underlying zip archive error: {0}
    Archive(#[from] zip::result::ZipError),

    /// '{0}' is not a recognised filetype name or hex literal
    BadFiletypeName(Box<str>),

    /// extra field chunk for '{0}' is corrupt: {1}
    CorruptExtra(Box<str>, Box<str>),

    /// path is neither a file nor a directory: {0}
    InvalidInput(Box<str>),
}

impl From<Error> for io::Error {
    fn from(err: Error) -> io::Error {
        let kind = match &err {
            Error::Io(err) => err.kind(),
            Error::Archive(_) => io::ErrorKind::InvalidData,
            Error::BadFiletypeName(_) => io::ErrorKind::InvalidInput,
            Error::CorruptExtra(..) => io::ErrorKind::InvalidData,
            Error::InvalidInput(_) => io::ErrorKind::InvalidInput,
        };

        io::Error::new(kind, err)
    }
}

/// Error type for calendar/quin range checks
#[derive(Debug)]
pub struct DateTimeRangeError;

impl From<TryFromIntError> for DateTimeRangeError {
    fn from(_value: TryFromIntError) -> Self {
        DateTimeRangeError
    }
}

impl fmt::Display for DateTimeRangeError {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            fmt,
            "a date could not be represented within the bounds of an MS-DOS date (1980-2107)"
        )
    }
}

impl std::error::Error for DateTimeRangeError {}
