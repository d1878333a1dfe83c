use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A SIP status code, 100-699.
///
/// Kept as a plain newtype rather than an enum of every RFC 3261 code: the
/// handlers here only ever emit a handful of these (100, 200, 401, 403,
/// 405, 408, 481, 500) and unknown codes still need to parse and round-trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StatusCode(pub u16);

impl StatusCode {
    pub const TRYING: StatusCode = StatusCode(100);
    pub const OK: StatusCode = StatusCode(200);
    pub const UNAUTHORIZED: StatusCode = StatusCode(401);
    pub const FORBIDDEN: StatusCode = StatusCode(403);
    pub const METHOD_NOT_ALLOWED: StatusCode = StatusCode(405);
    pub const REQUEST_TIMEOUT: StatusCode = StatusCode(408);
    pub const CALL_TRANSACTION_DOES_NOT_EXIST: StatusCode = StatusCode(481);
    pub const SERVER_INTERNAL_ERROR: StatusCode = StatusCode(500);

    pub fn is_provisional(&self) -> bool {
        (100..200).contains(&self.0)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.0)
    }

    pub fn is_final(&self) -> bool {
        self.0 >= 200
    }

    pub fn parse(s: &str) -> Result<Self> {
        let code: u16 = s
            .trim()
            .parse()
            .map_err(|_| Error::InvalidStatusCode(s.to_string()))?;
        if !(100..=699).contains(&code) {
            return Err(Error::InvalidStatusCode(s.to_string()));
        }
        Ok(StatusCode(code))
    }

    /// The canned reason phrase for codes this server itself generates.
    pub fn default_reason(&self) -> &'static str {
        match self.0 {
            100 => "Trying",
            180 => "Ringing",
            200 => "OK",
            401 => "Unauthorized",
            403 => "Forbidden",
            404 => "Not Found",
            405 => "Method Not Allowed",
            408 => "Request Timeout",
            481 => "Call/Transaction Does Not Exist",
            500 => "Server Internal Error",
            _ => "Unknown",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
