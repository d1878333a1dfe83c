use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::header::{Header, HeaderName};
use crate::types::method::Method;
use crate::types::status::StatusCode;
use crate::types::uri::Uri;
use crate::types::via::ViaHop;

/// `<uint32> SP <method>`, the value of the `CSeq` header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CSeq {
    pub seq: u32,
    pub method: Method,
}

impl fmt::Display for CSeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.seq, self.method)
    }
}

impl FromStr for CSeq {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (seq, method) = s
            .trim()
            .split_once(char::is_whitespace)
            .ok_or_else(|| Error::InvalidCSeq(s.to_string()))?;
        Ok(CSeq {
            seq: seq.trim().parse().map_err(|_| Error::InvalidCSeq(s.to_string()))?,
            method: method.trim().parse()?,
        })
    }
}

/// A parsed SIP request: start line, ordered headers, and body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub method: Method,
    pub uri: Uri,
    pub headers: Vec<Header>,
    pub body: Vec<u8>,
    pub source: Option<SocketAddr>,
    pub destination: Option<SocketAddr>,
}

/// A parsed SIP response: status line, ordered headers, and body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub status: StatusCode,
    pub reason: String,
    pub headers: Vec<Header>,
    pub body: Vec<u8>,
    pub source: Option<SocketAddr>,
    pub destination: Option<SocketAddr>,
}

/// A parsed SIP message, either a request or a response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Message {
    Request(Request),
    Response(Response),
}

macro_rules! header_accessors {
    () => {
        /// All values carried by headers with this name, in arrival order.
        pub fn header_values(&self, name: &str) -> Vec<&str> {
            self.headers
                .iter()
                .filter(|h| h.name.as_str().eq_ignore_ascii_case(name))
                .map(|h| h.value.as_str())
                .collect()
        }

        /// The first header with this name, if any.
        pub fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|h| h.name.as_str().eq_ignore_ascii_case(name))
                .map(|h| h.value.as_str())
        }

        pub fn call_id(&self) -> Option<&str> {
            self.header("Call-ID")
        }

        pub fn cseq(&self) -> Option<CSeq> {
            self.header("CSeq").and_then(|v| v.parse().ok())
        }

        /// The topmost `Via` hop, the one transaction matching keys off of.
        pub fn top_via(&self) -> Option<ViaHop> {
            self.header("Via").and_then(|v| v.parse().ok())
        }

        pub fn from_uri(&self) -> Option<Uri> {
            self.header("From").and_then(|v| parse_name_addr_uri(v))
        }

        pub fn to_uri(&self) -> Option<Uri> {
            self.header("To").and_then(|v| parse_name_addr_uri(v))
        }

        pub fn from_tag(&self) -> Option<&str> {
            self.header("From").and_then(|v| extract_tag(v))
        }

        pub fn to_tag(&self) -> Option<&str> {
            self.header("To").and_then(|v| extract_tag(v))
        }

        pub fn content_length(&self) -> Option<usize> {
            self.header("Content-Length").and_then(|v| v.trim().parse().ok())
        }

        pub fn content_type(&self) -> Option<&str> {
            self.header("Content-Type")
        }

        pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
            self.headers.push(Header::new(name, value));
        }
    };
}

impl Request {
    pub fn new(method: Method, uri: Uri) -> Self {
        Request {
            method,
            uri,
            headers: Vec::new(),
            body: Vec::new(),
            source: None,
            destination: None,
        }
    }

    header_accessors!();

    pub fn max_forwards(&self) -> Option<u32> {
        self.header("Max-Forwards").and_then(|v| v.trim().parse().ok())
    }

    /// Validates the mandatory-header set this server enforces on every
    /// inbound request (`Via`, `From`, `To`, `Call-ID`, `CSeq`, `Max-Forwards`).
    pub fn validate_mandatory_headers(&self) -> Result<()> {
        if self.top_via().is_none() {
            return Err(Error::MissingHeader("Via"));
        }
        if self.header("From").is_none() {
            return Err(Error::MissingHeader("From"));
        }
        if self.header("To").is_none() {
            return Err(Error::MissingHeader("To"));
        }
        if self.call_id().is_none() {
            return Err(Error::MissingHeader("Call-ID"));
        }
        if self.cseq().is_none() {
            return Err(Error::MissingHeader("CSeq"));
        }
        if self.max_forwards().is_none() {
            return Err(Error::MissingHeader("Max-Forwards"));
        }
        Ok(())
    }
}

impl Response {
    pub fn new(status: StatusCode, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Response {
            status,
            reason,
            headers: Vec::new(),
            body: Vec::new(),
            source: None,
            destination: None,
        }
    }

    header_accessors!();

    /// Builds a response that shares the dialog-identifying headers of
    /// `req` (Via, From, To, Call-ID, CSeq) the way a server transaction
    /// must, per RFC 3261 §8.2.6.
    pub fn for_request(req: &Request, status: StatusCode, reason: impl Into<String>) -> Self {
        let mut resp = Response::new(status, reason);
        for via in req.header_values("Via") {
            resp.set_header("Via", via.to_string());
        }
        if let Some(v) = req.header("From") {
            resp.set_header("From", v.to_string());
        }
        if let Some(v) = req.header("To") {
            resp.set_header("To", v.to_string());
        }
        if let Some(v) = req.header("Call-ID") {
            resp.set_header("Call-ID", v.to_string());
        }
        if let Some(v) = req.header("CSeq") {
            resp.set_header("CSeq", v.to_string());
        }
        resp
    }
}

impl Message {
    pub fn source(&self) -> Option<SocketAddr> {
        match self {
            Message::Request(r) => r.source,
            Message::Response(r) => r.source,
        }
    }

    pub fn call_id(&self) -> Option<&str> {
        match self {
            Message::Request(r) => r.call_id(),
            Message::Response(r) => r.call_id(),
        }
    }

    pub fn top_via(&self) -> Option<ViaHop> {
        match self {
            Message::Request(r) => r.top_via(),
            Message::Response(r) => r.top_via(),
        }
    }

    pub fn cseq(&self) -> Option<CSeq> {
        match self {
            Message::Request(r) => r.cseq(),
            Message::Response(r) => r.cseq(),
        }
    }
}

/// Pulls the URI out of a `From`/`To` value, tolerating the `"Display Name"
/// <sip:...>` and bare `sip:...` forms GB28181 devices send.
fn parse_name_addr_uri(value: &str) -> Option<Uri> {
    let value = value.trim();
    let uri_part = if let Some(start) = value.find('<') {
        let end = value[start..].find('>').map(|e| start + e)?;
        &value[start + 1..end]
    } else {
        value.split(';').next().unwrap_or(value).trim()
    };
    uri_part.parse().ok()
}

fn extract_tag(value: &str) -> Option<&str> {
    value
        .split(';')
        .find_map(|seg| seg.trim().strip_prefix("tag="))
        .map(|v| v.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cseq_round_trips() {
        let cseq: CSeq = "1 REGISTER".parse().unwrap();
        assert_eq!(cseq.seq, 1);
        assert_eq!(cseq.method, Method::Register);
        assert_eq!(cseq.to_string(), "1 REGISTER");
    }

    #[test]
    fn extracts_tag_from_from_header() {
        let value = "<sip:34020000002000000001@3402000000>;tag=998223";
        assert_eq!(extract_tag(value), Some("998223"));
    }

    #[test]
    fn parses_uri_from_name_addr() {
        let uri = parse_name_addr_uri("<sip:34020000002000000001@3402000000>;tag=1").unwrap();
        assert_eq!(uri.user.as_deref(), Some("34020000002000000001"));
    }
}
