//! Stateless single-datagram SIP parsing and serialization.
//!
//! GB28181 runs exclusively over UDP, so every request/response arrives as
//! one complete datagram; there's no reassembly and no notion of a partial
//! parse to carry across calls, unlike a TCP-framed parser. This keeps the
//! codec to a single `parse`/`serialize` pair instead of an incremental
//! state machine.

use std::net::SocketAddr;

use crate::error::{Error, Result};
use crate::types::header::Header;
use crate::types::message::{Message, Request, Response};
use crate::types::method::Method;
use crate::types::status::StatusCode;
use crate::types::uri::Uri;

const MAX_DATAGRAM_SIZE: usize = 65507;

/// Parses a single UDP datagram into a [`Message`].
///
/// Framing: CRLF-delimited lines, an empty line ends the header block, and
/// `Content-Length` (when present) bounds the body; in its absence every
/// remaining byte is body.
pub fn parse(bytes: &[u8], source: SocketAddr) -> Result<Message> {
    if bytes.len() > MAX_DATAGRAM_SIZE {
        return Err(Error::Other(format!("datagram exceeds {} bytes", MAX_DATAGRAM_SIZE)));
    }

    let text = std::str::from_utf8(bytes)?;
    let mut lines = text.split("\r\n");

    let start_line = lines.next().ok_or_else(|| Error::InvalidStartLine(String::new()))?;

    let mut headers = Vec::new();
    let mut header_bytes = start_line.len() + 2;
    for line in lines.by_ref() {
        header_bytes += line.len() + 2;
        if line.is_empty() {
            break;
        }
        headers.push(parse_header_line(line)?);
    }

    let body_offset = header_bytes.min(bytes.len());
    let body_bytes = &bytes[body_offset..];

    let content_length = headers
        .iter()
        .find(|h| h.name.as_str() == "Content-Length")
        .and_then(|h| h.value.trim().parse::<usize>().ok());

    let body = match content_length {
        Some(len) if len > body_bytes.len() => {
            return Err(Error::ContentLengthMismatch {
                expected: len,
                actual: body_bytes.len(),
            });
        }
        Some(len) => body_bytes[..len].to_vec(),
        None => body_bytes.to_vec(),
    };

    if let Some(method_token) = start_line.split_whitespace().next() {
        if method_token.starts_with("SIP/") {
            return parse_response(start_line, headers, body, source);
        }
    }
    parse_request(start_line, headers, body, source)
}

fn parse_header_line(line: &str) -> Result<Header> {
    let (name, value) = line
        .split_once(':')
        .ok_or_else(|| Error::InvalidHeader(line.to_string()))?;
    Ok(Header::new(name.trim(), value.trim()))
}

fn parse_request(start_line: &str, headers: Vec<Header>, body: Vec<u8>, source: SocketAddr) -> Result<Message> {
    let mut parts = start_line.split_whitespace();
    let method_token = parts.next().ok_or_else(|| Error::InvalidStartLine(start_line.to_string()))?;
    let uri_str = parts.next().ok_or_else(|| Error::InvalidStartLine(start_line.to_string()))?;
    let version = parts.next().ok_or_else(|| Error::InvalidStartLine(start_line.to_string()))?;
    if version != "SIP/2.0" {
        return Err(Error::InvalidVersion(version.to_string()));
    }

    let method: Method = method_token.parse()?;
    let uri: Uri = uri_str.parse()?;

    let req = Request {
        method,
        uri,
        headers,
        body,
        source: Some(source),
        destination: None,
    };
    req.validate_mandatory_headers()?;
    if req.content_length().is_none() {
        return Err(Error::MissingHeader("Content-Length"));
    }
    Ok(Message::Request(req))
}

fn parse_response(start_line: &str, headers: Vec<Header>, body: Vec<u8>, source: SocketAddr) -> Result<Message> {
    let mut parts = start_line.splitn(3, char::is_whitespace);
    let version = parts.next().ok_or_else(|| Error::InvalidStartLine(start_line.to_string()))?;
    if version != "SIP/2.0" {
        return Err(Error::InvalidVersion(version.to_string()));
    }
    let status_str = parts.next().ok_or_else(|| Error::InvalidStartLine(start_line.to_string()))?;
    let reason = parts.next().unwrap_or("").to_string();
    let status = StatusCode::parse(status_str)?;

    Ok(Message::Response(Response {
        status,
        reason,
        headers,
        body,
        source: Some(source),
        destination: None,
    }))
}

/// Renders a [`Message`] to the bytes that go on the wire. Header names are
/// always written in their expanded long form: compact forms are
/// normalized on parse and never reintroduced on output.
pub fn serialize(message: &Message) -> Vec<u8> {
    let mut out = String::new();
    match message {
        Message::Request(req) => {
            out.push_str(&format!("{} {} SIP/2.0\r\n", req.method, req.uri));
            for h in &req.headers {
                out.push_str(&format!("{}\r\n", h));
            }
            out.push_str("\r\n");
            let mut bytes = out.into_bytes();
            bytes.extend_from_slice(&req.body);
            return bytes;
        }
        Message::Response(resp) => {
            out.push_str(&format!("SIP/2.0 {} {}\r\n", resp.status, resp.reason));
            for h in &resp.headers {
                out.push_str(&format!("{}\r\n", h));
            }
            out.push_str("\r\n");
            let mut bytes = out.into_bytes();
            bytes.extend_from_slice(&resp.body);
            return bytes;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr() -> SocketAddr {
        "192.168.1.2:5060".parse().unwrap()
    }

    #[test]
    fn parses_a_register_request() {
        let raw = "REGISTER sip:3402000000@3402000000 SIP/2.0\r\n\
                   Via: SIP/2.0/UDP 192.168.1.2:5060;branch=z9hG4bK776asdhds\r\n\
                   From: <sip:34020000002000000001@3402000000>;tag=1\r\n\
                   To: <sip:34020000002000000001@3402000000>\r\n\
                   Call-ID: abc123\r\n\
                   CSeq: 1 REGISTER\r\n\
                   Max-Forwards: 70\r\n\
                   Content-Length: 0\r\n\r\n";
        let msg = parse(raw.as_bytes(), addr()).unwrap();
        match msg {
            Message::Request(req) => {
                assert_eq!(req.method, Method::Register);
                assert_eq!(req.call_id(), Some("abc123"));
                assert_eq!(req.top_via().unwrap().branch(), Some("z9hG4bK776asdhds"));
            }
            _ => panic!("expected request"),
        }
    }

    #[test]
    fn missing_branch_is_rejected() {
        let raw = "REGISTER sip:3402000000@3402000000 SIP/2.0\r\n\
                   Via: SIP/2.0/UDP 192.168.1.2:5060\r\n\
                   From: <sip:a@b>;tag=1\r\n\
                   To: <sip:a@b>\r\n\
                   Call-ID: abc123\r\n\
                   CSeq: 1 REGISTER\r\n\
                   Max-Forwards: 70\r\n\
                   Content-Length: 0\r\n\r\n";
        let err = parse(raw.as_bytes(), addr()).unwrap_err();
        assert!(matches!(err, Error::MissingHeader("Via")));
    }

    #[test]
    fn truncated_body_is_a_parse_error() {
        let raw = "MESSAGE sip:3402000000@3402000000 SIP/2.0\r\n\
                   Via: SIP/2.0/UDP 192.168.1.2:5060;branch=z9hG4bK1\r\n\
                   From: <sip:a@b>;tag=1\r\n\
                   To: <sip:a@b>\r\n\
                   Call-ID: abc123\r\n\
                   CSeq: 1 MESSAGE\r\n\
                   Max-Forwards: 70\r\n\
                   Content-Length: 50\r\n\r\nshort body";
        let err = parse(raw.as_bytes(), addr()).unwrap_err();
        assert!(matches!(err, Error::ContentLengthMismatch { .. }));
    }

    #[test]
    fn trailing_bytes_beyond_content_length_are_discarded() {
        let raw = "MESSAGE sip:3402000000@3402000000 SIP/2.0\r\n\
                   Via: SIP/2.0/UDP 192.168.1.2:5060;branch=z9hG4bK1\r\n\
                   From: <sip:a@b>;tag=1\r\n\
                   To: <sip:a@b>\r\n\
                   Call-ID: abc123\r\n\
                   CSeq: 1 MESSAGE\r\n\
                   Max-Forwards: 70\r\n\
                   Content-Length: 5\r\n\r\nhellojunk";
        let msg = parse(raw.as_bytes(), addr()).unwrap();
        match msg {
            Message::Request(req) => assert_eq!(req.body, b"hello"),
            _ => panic!("expected request"),
        }
    }

    #[test]
    fn serialize_parse_round_trip_preserves_headers() {
        let raw = "REGISTER sip:3402000000@3402000000 SIP/2.0\r\n\
                   Via: SIP/2.0/UDP 192.168.1.2:5060;branch=z9hG4bK776asdhds\r\n\
                   From: <sip:34020000002000000001@3402000000>;tag=1\r\n\
                   To: <sip:34020000002000000001@3402000000>\r\n\
                   Call-ID: abc123\r\n\
                   CSeq: 1 REGISTER\r\n\
                   Max-Forwards: 70\r\n\
                   Content-Length: 0\r\n\r\n";
        let msg = parse(raw.as_bytes(), addr()).unwrap();
        let reserialized = serialize(&msg);
        let reparsed = parse(&reserialized, addr()).unwrap();
        assert_eq!(msg.call_id(), reparsed.call_id());
        assert_eq!(msg.top_via(), reparsed.top_via());
    }

    #[test]
    fn expands_compact_header_forms_on_parse() {
        let raw = "MESSAGE sip:3402000000@3402000000 SIP/2.0\r\n\
                   v: SIP/2.0/UDP 192.168.1.2:5060;branch=z9hG4bK1\r\n\
                   f: <sip:a@b>;tag=1\r\n\
                   t: <sip:a@b>\r\n\
                   i: abc123\r\n\
                   CSeq: 1 MESSAGE\r\n\
                   Max-Forwards: 70\r\n\
                   l: 0\r\n\r\n";
        let msg = parse(raw.as_bytes(), addr()).unwrap();
        let bytes = serialize(&msg);
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("Via: SIP/2.0/UDP"));
        assert!(text.contains("From: <sip:a@b>"));
        assert!(text.contains("Call-ID: abc123"));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn addr() -> SocketAddr {
        "192.168.1.2:5060".parse().unwrap()
    }

    fn token() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9]{1,16}"
    }

    fn build_request(method: &str, branch: &str, call_id: &str, cseq: u32, body: &[u8]) -> Vec<u8> {
        let mut raw = format!(
            "{method} sip:3402000000@3402000000 SIP/2.0\r\n\
             Via: SIP/2.0/UDP 192.168.1.2:5060;branch=z9hG4bK{branch}\r\n\
             From: <sip:a@b>;tag=1\r\n\
             To: <sip:a@b>\r\n\
             Call-ID: {call_id}\r\n\
             CSeq: {cseq} {method}\r\n\
             Max-Forwards: 70\r\n\
             Content-Length: {len}\r\n\r\n",
            len = body.len(),
        )
        .into_bytes();
        raw.extend_from_slice(body);
        raw
    }

    proptest! {
        /// `serialize(parse(bytes))` round-trips the fields a transaction
        /// correlates on (Call-ID, top Via branch, method, body) for any
        /// well-formed request, not just the hand-picked cases above.
        #[test]
        fn round_trip_preserves_transaction_identity(
            method in prop::sample::select(vec!["REGISTER", "MESSAGE", "BYE"]),
            branch in token(),
            call_id in token(),
            cseq in 1u32..1_000_000,
            body in prop::collection::vec(32u8..127u8, 0..64),
        ) {
            let raw = build_request(method, &branch, &call_id, cseq, &body);
            let msg = parse(&raw, addr()).unwrap();
            let reserialized = serialize(&msg);
            let reparsed = parse(&reserialized, addr()).unwrap();

            prop_assert_eq!(msg.call_id(), reparsed.call_id());
            prop_assert_eq!(
                msg.top_via().and_then(|v| v.branch().map(str::to_string)),
                reparsed.top_via().and_then(|v| v.branch().map(str::to_string))
            );
            match (msg, reparsed) {
                (Message::Request(r1), Message::Request(r2)) => {
                    prop_assert_eq!(r1.method, r2.method);
                    prop_assert_eq!(r1.body, r2.body);
                }
                _ => prop_assert!(false, "expected both sides to parse as requests"),
            }
        }
    }
}
