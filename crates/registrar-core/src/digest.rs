//! RFC 2617-style digest authentication for REGISTER, and the nonce
//! bookkeeping GB28181 devices are challenged with: nonces are valid for
//! 60s and tracked single-use.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use md5::{Digest, Md5};
use rand::Rng;

use crate::error::{Error, Result};

const NONCE_TTL: Duration = Duration::from_secs(60);

fn hex_md5(input: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// `HA1 = MD5(user:realm:secret)`.
pub fn ha1(user: &str, realm: &str, secret: &str) -> String {
    hex_md5(&format!("{}:{}:{}", user, realm, secret))
}

/// `HA2 = MD5(method:uri)`.
pub fn ha2(method: &str, uri: &str) -> String {
    hex_md5(&format!("{}:{}", method, uri))
}

/// `response = MD5(HA1:nonce:HA2)`.
pub fn response(ha1: &str, nonce: &str, ha2: &str) -> String {
    hex_md5(&format!("{}:{}:{}", ha1, nonce, ha2))
}

/// Verifies a client's digest response against the expected credentials.
pub fn verify(user: &str, realm: &str, secret: &str, method: &str, uri: &str, nonce: &str, claimed_response: &str) -> bool {
    let expected = response(&ha1(user, realm, secret), nonce, &ha2(method, uri));
    expected.eq_ignore_ascii_case(claimed_response)
}

/// Generates a fresh 16-hex-character nonce and registers it as valid for
/// the next 60 seconds. Callers must [`NonceTracker::consume`] it exactly
/// once before it is honored.
pub struct NonceTracker {
    issued: DashMap<String, Instant>,
}

impl NonceTracker {
    pub fn new() -> Self {
        NonceTracker { issued: DashMap::new() }
    }

    pub fn issue(&self) -> String {
        const CHARSET: &[u8] = b"0123456789abcdef";
        let mut rng = rand::thread_rng();
        let nonce: String = (0..16).map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char).collect();
        self.issued.insert(nonce.clone(), Instant::now());
        nonce
    }

    /// Consumes a nonce: valid exactly once, within `NONCE_TTL` of issue.
    /// A stale or already-used nonce maps to `InvalidNonce` so the caller
    /// can fall back to issuing a fresh challenge.
    pub fn consume(&self, nonce: &str) -> Result<()> {
        match self.issued.remove(nonce) {
            Some((_, issued_at)) if issued_at.elapsed() <= NONCE_TTL => Ok(()),
            _ => Err(Error::InvalidNonce),
        }
    }

    /// Drops nonces older than the TTL that were never consumed. Call
    /// periodically to keep the map bounded.
    pub fn sweep_expired(&self) {
        self.issued.retain(|_, issued_at| issued_at.elapsed() <= NONCE_TTL);
    }
}

impl Default for NonceTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Parses the `Authorization: Digest ...` header value into its named
/// parameters (`username`, `realm`, `nonce`, `uri`, `response`, ...).
pub fn parse_digest_params(header_value: &str) -> std::collections::HashMap<String, String> {
    let body = header_value.trim().strip_prefix("Digest").unwrap_or(header_value).trim();
    let mut params = std::collections::HashMap::new();
    for part in split_respecting_quotes(body) {
        if let Some((name, value)) = part.split_once('=') {
            let value = value.trim().trim_matches('"');
            params.insert(name.trim().to_string(), value.to_string());
        }
    }
    params
}

fn split_respecting_quotes(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                parts.push(s[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(s[start..].trim());
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifies_a_correctly_computed_response() {
        let h1 = ha1("34020000001320000001", "3402000000", "secretpass");
        let h2 = ha2("REGISTER", "sip:34020000002000000001@3402000000");
        let resp = response(&h1, "abc123", &h2);
        assert!(verify(
            "34020000001320000001",
            "3402000000",
            "secretpass",
            "REGISTER",
            "sip:34020000002000000001@3402000000",
            "abc123",
            &resp
        ));
    }

    #[test]
    fn rejects_a_tampered_response() {
        assert!(!verify("u", "r", "s", "REGISTER", "sip:x", "n", "deadbeef"));
    }

    #[test]
    fn nonce_is_single_use() {
        let tracker = NonceTracker::new();
        let nonce = tracker.issue();
        assert!(tracker.consume(&nonce).is_ok());
        assert!(matches!(tracker.consume(&nonce), Err(Error::InvalidNonce)));
    }

    #[test]
    fn parses_quoted_digest_params() {
        let params = parse_digest_params(
            r#"Digest username="34020000001320000001", realm="3402000000", nonce="abc123", uri="sip:x", response="def456""#,
        );
        assert_eq!(params.get("username").map(String::as_str), Some("34020000001320000001"));
        assert_eq!(params.get("nonce").map(String::as_str), Some("abc123"));
    }
}
