use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::param::Params;

/// A `sip:` or `sips:` URI, as embedded in `To`, `From`, `Contact`, and the
/// request line.
///
/// ```text
/// sip:34020000002000000001@3402000000:5060;transport=udp
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Uri {
    pub scheme: String,
    pub user: Option<String>,
    pub host: String,
    pub port: Option<u16>,
    pub params: Params,
}

impl Uri {
    pub fn new(scheme: impl Into<String>, user: Option<String>, host: impl Into<String>, port: Option<u16>) -> Self {
        Uri {
            scheme: scheme.into(),
            user,
            host: host.into(),
            port,
            params: Params::new(),
        }
    }

    pub fn sip(user: impl Into<String>, host: impl Into<String>, port: Option<u16>) -> Self {
        Uri::new("sip", Some(user.into()), host, port)
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.scheme)?;
        if let Some(user) = &self.user {
            write!(f, "{}@", user)?;
        }
        write!(f, "{}", self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{}", port)?;
        }
        write!(f, "{}", self.params)
    }
}

impl FromStr for Uri {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (scheme, rest) = s.split_once(':').ok_or_else(|| Error::InvalidUri(s.to_string()))?;
        let (userhost, params) = match rest.split_once(';') {
            Some((a, b)) => (a, Params::parse(b)),
            None => (rest, Params::new()),
        };
        let (user, hostport) = match userhost.split_once('@') {
            Some((u, h)) => (Some(u.to_string()), h),
            None => (None, userhost),
        };
        let (host, port) = match hostport.rsplit_once(':') {
            // Guard against swallowing the colon in a bare IPv6 literal.
            Some((h, p)) if !h.is_empty() && p.chars().all(|c| c.is_ascii_digit()) && !p.is_empty() => {
                let port: u16 = p.parse().map_err(|_| Error::InvalidUri(s.to_string()))?;
                (h.to_string(), Some(port))
            }
            _ => (hostport.to_string(), None),
        };
        if host.is_empty() {
            return Err(Error::InvalidUri(s.to_string()));
        }
        Ok(Uri {
            scheme: scheme.to_string(),
            user,
            host,
            port,
            params,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_device_register_uri() {
        let uri: Uri = "sip:34020000002000000001@3402000000".parse().unwrap();
        assert_eq!(uri.scheme, "sip");
        assert_eq!(uri.user.as_deref(), Some("34020000002000000001"));
        assert_eq!(uri.host, "3402000000");
        assert_eq!(uri.port, None);
    }

    #[test]
    fn parses_uri_with_port_and_params() {
        let uri: Uri = "sip:34020000001320000001@192.168.1.2:5060;transport=udp".parse().unwrap();
        assert_eq!(uri.host, "192.168.1.2");
        assert_eq!(uri.port, Some(5060));
        assert_eq!(uri.params.get("transport"), Some("udp"));
    }

    #[test]
    fn round_trips_display() {
        let raw = "sip:34020000001320000001@192.168.1.2:5060";
        let uri: Uri = raw.parse().unwrap();
        assert_eq!(uri.to_string(), raw);
    }
}
