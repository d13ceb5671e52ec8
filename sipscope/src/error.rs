use std::fmt;
use std::str::{self, Utf8Error};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Error on parsing a SIP message.
#[derive(Debug, PartialEq, Eq, Error)]
pub struct SipParserError {
    /// Message in error
    pub message: String,
}

impl fmt::Display for SipParserError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

#[allow(missing_docs)]
impl SipParserError {
    pub fn new<T>(s: T) -> Self
    where
        T: AsRef<str>,
    {
        Self {
            message: s.as_ref().to_string(),
        }
    }
}

impl std::convert::From<&str> for SipParserError {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl std::convert::From<String> for SipParserError {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl std::convert::From<Utf8Error> for SipParserError {
    fn from(value: Utf8Error) -> Self {
        SipParserError {
            message: format!("{:#?}", value),
        }
    }
}

impl std::convert::From<util::ScanError> for SipParserError {
    fn from(err: util::ScanError) -> Self {
        SipParserError {
            message: format!("failed to parse at line:{} column:{} kind:{:?}", err.line, err.col, err.kind),
        }
    }
}

impl std::convert::From<util::ScanError> for Error {
    fn from(err: util::ScanError) -> Self {
        Error::ParseError(err.into())
    }
}

impl std::convert::From<Utf8Error> for Error {
    fn from(value: Utf8Error) -> Self {
        Error::ParseError(value.into())
    }
}

impl From<std::fmt::Error> for Error {
    fn from(value: std::fmt::Error) -> Self {
        Self::FmtError(value)
    }
}

/// The error type for the whole workspace.
///
/// Per the error-handling design, this enum only carries the
/// "user-facing" class of failure (§7): bad input that should abort
/// initialization or a pipeline-level operation the caller asked for.
/// Transient per-packet problems (malformed header, unknown protocol,
/// SDP without a port) are not represented here at all — dissectors
/// log and drop instead of returning `Err`, matching the teacher's own
/// split between `Result`-propagating parse errors and best-effort
/// dissection.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    ParseError(#[from] SipParserError),

    #[error("missing required '{0}' header")]
    MissingRequiredHeader(&'static str),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("fmt error")]
    FmtError(std::fmt::Error),

    #[error("unsupported HEP version {0}")]
    UnsupportedHepVersion(u8),

    #[error("malformed HEP packet: {0}")]
    MalformedHep(&'static str),

    #[error("invalid address '{0}'")]
    InvalidAddress(String),

    #[error("unreadable capture source: {0}")]
    Source(String),

    #[error("packet source channel closed")]
    ChannelClosed,
}
