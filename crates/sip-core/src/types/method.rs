use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The SIP request methods the GB28181 dispatcher knows how to route.
///
/// RFC 3261 defines more (OPTIONS, CANCEL, NOTIFY, SUBSCRIBE, ...); GB28181
/// devices only ever send the five below, so the dispatcher's method table
/// is closed over this enum rather than an open string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    Register,
    Message,
    Invite,
    Ack,
    Bye,
    /// Any other token, preserved verbatim so the dispatcher can still
    /// respond 405 with an accurate `Allow` header instead of dropping it.
    Extension(String),
}

impl Method {
    pub fn as_str(&self) -> &str {
        match self {
            Method::Register => "REGISTER",
            Method::Message => "MESSAGE",
            Method::Invite => "INVITE",
            Method::Ack => "ACK",
            Method::Bye => "BYE",
            Method::Extension(s) => s.as_str(),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "REGISTER" => Method::Register,
            "MESSAGE" => Method::Message,
            "INVITE" => Method::Invite,
            "ACK" => Method::Ack,
            "BYE" => Method::Bye,
            other if !other.is_empty() => Method::Extension(other.to_string()),
            _ => return Err(Error::InvalidMethod(s.to_string())),
        })
    }
}
