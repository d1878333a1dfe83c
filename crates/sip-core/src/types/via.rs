//! # SIP Via header
//!
//! The Via header records the path a request took so a response can be
//! routed back along it, and its `branch` parameter is the primary key of
//! the transaction layer (§20.42 of RFC 3261). GB28181 traffic never uses
//! more than one Via hop per message (no proxying), so unlike a general
//! proxy stack this type models a single hop rather than a Via header with
//! a comma-separated list of hops.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::param::{Param, Params};

/// The RFC 3261 magic cookie that marks a branch as following the
/// transaction-matching rules this server assumes everywhere.
pub const MAGIC_COOKIE: &str = "z9hG4bK";

/// A single Via hop: `SIP/2.0/<protocol> <host>[:<port>]<params>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViaHop {
    pub protocol: String,
    pub host: String,
    pub port: Option<u16>,
    pub params: Params,
}

impl ViaHop {
    pub fn new(protocol: impl Into<String>, host: impl Into<String>, port: Option<u16>) -> Self {
        ViaHop {
            protocol: protocol.into(),
            host: host.into(),
            port,
            params: Params::new(),
        }
    }

    pub fn branch(&self) -> Option<&str> {
        self.params.get("branch")
    }

    pub fn set_branch(&mut self, branch: impl Into<String>) {
        self.params.set("branch", Some(branch.into()));
    }

    pub fn is_rfc3261_branch(&self) -> bool {
        self.branch().map(|b| b.starts_with(MAGIC_COOKIE)).unwrap_or(false)
    }

    pub fn received(&self) -> Option<&str> {
        self.params.get("received")
    }

    pub fn set_received(&mut self, addr: impl Into<String>) {
        self.params.set("received", Some(addr.into()));
    }

    pub fn has_rport_flag(&self) -> bool {
        self.params.has("rport")
    }

    pub fn set_rport(&mut self, port: u16) {
        self.params.set("rport", Some(port.to_string()));
    }
}

impl fmt::Display for ViaHop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SIP/2.0/{} {}", self.protocol, self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{}", port)?;
        }
        write!(f, "{}", self.params)
    }
}

impl FromStr for ViaHop {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let rest = s
            .strip_prefix("SIP/2.0/")
            .ok_or_else(|| Error::InvalidHeader(format!("Via: {}", s)))?;
        let (protocol, rest) = rest
            .split_once(char::is_whitespace)
            .ok_or_else(|| Error::InvalidHeader(format!("Via: {}", s)))?;
        let rest = rest.trim_start();
        let (hostport, params) = match rest.split_once(';') {
            Some((a, b)) => (a, Params::parse(b)),
            None => (rest, Params::new()),
        };
        let (host, port) = match hostport.rsplit_once(':') {
            Some((h, p)) if p.chars().all(|c| c.is_ascii_digit()) && !p.is_empty() => {
                (h.to_string(), Some(p.parse::<u16>()?))
            }
            _ => (hostport.to_string(), None),
        };
        if host.is_empty() {
            return Err(Error::InvalidHeader(format!("Via: {}", s)));
        }
        let hop = ViaHop {
            protocol: protocol.to_string(),
            host,
            port,
            params,
        };
        if hop.branch().is_none() {
            return Err(Error::MissingBranch);
        }
        Ok(hop)
    }
}

/// Generates a fresh RFC 3261-compliant branch token for a request this
/// server originates.
pub fn generate_branch() -> String {
    use rand::Rng;
    const CHARSET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..16)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect();
    format!("{}{}", MAGIC_COOKIE, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_via_with_branch() {
        let hop: ViaHop = "SIP/2.0/UDP 192.168.1.2:5060;branch=z9hG4bK776asdhds;rport".parse().unwrap();
        assert_eq!(hop.protocol, "UDP");
        assert_eq!(hop.host, "192.168.1.2");
        assert_eq!(hop.port, Some(5060));
        assert!(hop.is_rfc3261_branch());
        assert!(hop.has_rport_flag());
    }

    #[test]
    fn missing_branch_is_a_parse_error() {
        let result: Result<ViaHop> = "SIP/2.0/UDP 192.168.1.2:5060".parse();
        assert!(matches!(result, Err(Error::MissingBranch)));
    }

    #[test]
    fn generated_branch_has_magic_cookie() {
        assert!(generate_branch().starts_with(MAGIC_COOKIE));
    }
}
