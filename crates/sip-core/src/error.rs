use std::io;
use thiserror::Error;

/// A type alias for handling `Result`s with `Error`
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while parsing or serializing a SIP message.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// The start line is neither a valid request line nor a valid status line.
    #[error("Invalid start line: {0}")]
    InvalidStartLine(String),

    /// Unrecognized SIP method token on the request line.
    #[error("Invalid SIP method: {0}")]
    InvalidMethod(String),

    /// A header line could not be split into name and value.
    #[error("Invalid SIP header: {0}")]
    InvalidHeader(String),

    /// A SIP/SIPS URI failed to parse.
    #[error("Invalid SIP URI: {0}")]
    InvalidUri(String),

    /// The version token was not `SIP/2.0`.
    #[error("Invalid SIP version: {0}")]
    InvalidVersion(String),

    /// The status code was not a 3-digit number in [100, 699].
    #[error("Invalid status code: {0}")]
    InvalidStatusCode(String),

    /// One of `Via`, `From`, `To`, `Call-ID`, `CSeq`, `Max-Forwards` was absent.
    #[error("Missing required header: {0}")]
    MissingHeader(&'static str),

    /// `Content-Length` claimed more bytes than the datagram carried.
    #[error("Content-Length mismatch: expected {expected}, got {actual}")]
    ContentLengthMismatch { expected: usize, actual: usize },

    /// A `Via` header was present but had no `branch` parameter.
    #[error("Via header is missing the branch parameter")]
    MissingBranch,

    /// The `CSeq` header value did not parse as `<uint32> SP <method>`.
    #[error("Invalid CSeq header: {0}")]
    InvalidCSeq(String),

    /// Error surfaced while building a SDP body.
    #[error("SDP error: {0}")]
    Sdp(String),

    /// The datagram was not valid UTF-8 where UTF-8 was required.
    #[error("Invalid UTF-8 in message: {0}")]
    Utf8(String),

    /// Catch-all for conditions not worth a dedicated variant.
    #[error("{0}")]
    Other(String),
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Other(err.to_string())
    }
}

impl From<std::str::Utf8Error> for Error {
    fn from(err: std::str::Utf8Error) -> Self {
        Error::Utf8(err.to_string())
    }
}

impl From<std::num::ParseIntError> for Error {
    fn from(err: std::num::ParseIntError) -> Self {
        Error::Other(format!("failed to parse integer: {}", err))
    }
}
